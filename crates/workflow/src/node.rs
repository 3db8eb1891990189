//! Graph building blocks: node handlers, edge predicates, and edges.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::state::ExecutionState;

/// Failure reported by a node handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct NodeError(pub String);

impl NodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// One unit of computation over the shared state.
///
/// Nodes hold no per-run data; everything a run produces lives in the
/// `ExecutionState` they receive and return.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: ExecutionState) -> Result<ExecutionState, NodeError>;
}

/// Adapter for synchronous, infallible state transforms.
pub struct FnNode<F>(pub F);

#[async_trait]
impl<F> Node for FnNode<F>
where
    F: Fn(ExecutionState) -> ExecutionState + Send + Sync,
{
    async fn run(&self, state: ExecutionState) -> Result<ExecutionState, NodeError> {
        Ok((self.0)(state))
    }
}

type PredicateFn = dyn Fn(&ExecutionState) -> bool + Send + Sync;

/// A named edge condition.
///
/// The name is what inspection and logs show. `reads` lists the state
/// fields the predicate depends on, so a schema can vet it at build time.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    reads: Vec<String>,
    test: Arc<PredicateFn>,
}

impl Predicate {
    /// A custom predicate. Declare the fields it reads with `reading`.
    pub fn new<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&ExecutionState) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            reads: Vec::new(),
            test: Arc::new(test),
        }
    }

    /// Record the state fields this predicate reads.
    pub fn reading<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Accepts every state.
    pub fn always() -> Self {
        Self::new("always", |_| true)
    }

    /// Accepts states whose `field` equals `value`.
    pub fn field_equals(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let field = field.into();
        let value = value.into();
        let name = format!("{field} == {value}");
        let key = field.clone();
        Self::new(name, move |state| state.get(&key) == Some(&value)).reading([field])
    }

    /// Accepts states that carry `field`.
    pub fn field_present(field: impl Into<String>) -> Self {
        let field = field.into();
        let key = field.clone();
        Self::new(format!("has {field}"), move |state| state.contains(&key)).reading([field])
    }

    /// Logical negation.
    pub fn not(self) -> Self {
        let inner = Arc::clone(&self.test);
        Self {
            name: format!("not ({})", self.name),
            reads: self.reads,
            test: Arc::new(move |state| !inner(state)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    pub fn evaluate(&self, state: &ExecutionState) -> bool {
        (self.test)(state)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .finish()
    }
}

/// One possible transition. No predicate means unconditional.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub predicate: Option<Predicate>,
}

impl Edge {
    pub fn accepts(&self, state: &ExecutionState) -> bool {
        self.predicate.as_ref().is_none_or(|p| p.evaluate(state))
    }

    pub fn describe(&self) -> EdgeDescription {
        EdgeDescription {
            from: self.from.clone(),
            to: self.to.clone(),
            predicate: self.predicate.as_ref().map(|p| p.name().to_string()),
        }
    }
}

/// Serializable view of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeDescription {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}
