//! Graph definition, validation, and the run loop.
//!
//! A graph is assembled with [`GraphBuilder`] and frozen into a
//! [`CompiledGraph`] by [`GraphBuilder::build`], which rejects structurally
//! broken definitions up front. Running a compiled graph threads one
//! [`ExecutionState`] from the entry node through handlers and edges until a
//! terminal node has run.
//!
//! Edges out of a node are tried in registration order; the first one that
//! accepts the current state wins. Every handler invocation counts as one
//! step, and the step limit is checked before each invocation.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::GraphError;
use crate::node::{Edge, EdgeDescription, FnNode, Node, Predicate};
use crate::state::{ExecutionState, StateSchema};

/// Step limit used when the builder is not given one.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Mutable graph definition.
pub struct GraphBuilder {
    name: String,
    nodes: Vec<(String, Arc<dyn Node>)>,
    duplicates: Vec<String>,
    terminals: BTreeSet<String>,
    edges: Vec<Edge>,
    entry: Option<String>,
    schema: Option<StateSchema>,
    max_steps: usize,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            duplicates: Vec::new(),
            terminals: BTreeSet::new(),
            edges: Vec::new(),
            entry: None,
            schema: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Declare the fields the graph's state may carry.
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn add_node(mut self, id: impl Into<String>, node: impl Node + 'static) -> Self {
        let id = id.into();
        if self.nodes.iter().any(|(existing, _)| *existing == id) {
            self.duplicates.push(id);
        } else {
            self.nodes.push((id, Arc::new(node)));
        }
        self
    }

    /// Register a synchronous state transform as a node.
    pub fn add_fn_node<F>(self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(ExecutionState) -> ExecutionState + Send + Sync + 'static,
    {
        self.add_node(id, FnNode(f))
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            predicate: None,
        });
        self
    }

    pub fn add_conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        predicate: Predicate,
    ) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            predicate: Some(predicate),
        });
        self
    }

    /// Branch on the value of one state field.
    ///
    /// Each `(value, target)` pair becomes a `field == value` edge, added in
    /// the order given.
    pub fn add_conditional_edges<I, V, T>(mut self, from: impl Into<String>, field: &str, mapping: I) -> Self
    where
        I: IntoIterator<Item = (V, T)>,
        V: Into<serde_json::Value>,
        T: Into<String>,
    {
        let from = from.into();
        for (value, target) in mapping {
            self = self.add_conditional_edge(
                from.clone(),
                target,
                Predicate::field_equals(field, value),
            );
        }
        self
    }

    pub fn set_entry(mut self, id: impl Into<String>) -> Self {
        self.entry = Some(id.into());
        self
    }

    /// Mark a node as terminal. A graph may have several.
    pub fn set_terminal(mut self, id: impl Into<String>) -> Self {
        self.terminals.insert(id.into());
        self
    }

    /// Validate the definition and freeze it.
    pub fn build(self) -> Result<CompiledGraph, GraphError> {
        if let Some(dup) = self.duplicates.into_iter().next() {
            return Err(GraphError::DuplicateNode(dup));
        }
        if self.max_steps == 0 {
            return Err(GraphError::InvalidStepLimit);
        }

        let known: HashSet<&str> = self.nodes.iter().map(|(id, _)| id.as_str()).collect();

        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !known.contains(entry.as_str()) {
            return Err(GraphError::UnknownNode(entry));
        }
        if self.terminals.is_empty() {
            return Err(GraphError::NoTerminal);
        }
        if let Some(t) = self.terminals.iter().find(|t| !known.contains(t.as_str())) {
            return Err(GraphError::UnknownNode(t.clone()));
        }

        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if !known.contains(end.as_str()) {
                    return Err(GraphError::UnknownNode(end.clone()));
                }
            }
            if let (Some(schema), Some(predicate)) = (&self.schema, &edge.predicate)
                && let Some(field) = predicate.reads().iter().find(|f| !schema.declares(f))
            {
                return Err(GraphError::UndeclaredField {
                    location: format!("edge {} -> {}", edge.from, edge.to),
                    field: field.clone(),
                });
            }
        }

        let mut outgoing: HashMap<String, Vec<Edge>> = HashMap::new();
        for edge in self.edges {
            outgoing.entry(edge.from.clone()).or_default().push(edge);
        }

        for (id, _) in &self.nodes {
            if !self.terminals.contains(id) && !outgoing.contains_key(id) {
                return Err(GraphError::DeadEnd(id.clone()));
            }
        }

        debug!(
            graph = %self.name,
            nodes = self.nodes.len(),
            terminals = self.terminals.len(),
            "Graph compiled"
        );

        Ok(CompiledGraph {
            name: self.name,
            nodes: self.nodes,
            terminals: self.terminals,
            outgoing,
            entry,
            schema: self.schema,
            max_steps: self.max_steps,
        })
    }
}

/// A validated, immutable graph. Safe to share across concurrent runs.
pub struct CompiledGraph {
    name: String,
    nodes: Vec<(String, Arc<dyn Node>)>,
    terminals: BTreeSet<String>,
    outgoing: HashMap<String, Vec<Edge>>,
    entry: String,
    schema: Option<StateSchema>,
    max_steps: usize,
}

/// The outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRun {
    pub state: ExecutionState,
    /// Node ids in the order their handlers ran.
    pub path: Vec<String>,
    pub steps: usize,
}

impl GraphRun {
    /// The terminal node the run stopped at.
    pub fn terminal(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }
}

impl CompiledGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn is_terminal(&self, id: &str) -> bool {
        self.terminals.contains(id)
    }

    fn node(&self, id: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.iter().find(|(n, _)| n == id).map(|(_, node)| node)
    }

    fn check_schema(&self, state: &ExecutionState, location: &str) -> Result<(), GraphError> {
        if let Some(schema) = &self.schema
            && let Some(field) = schema.first_undeclared(state)
        {
            return Err(GraphError::UndeclaredField {
                location: location.to_string(),
                field: field.to_string(),
            });
        }
        Ok(())
    }

    /// Run the graph from its entry node.
    pub async fn run(&self, initial: ExecutionState) -> Result<GraphRun, GraphError> {
        self.check_schema(&initial, "initial state")?;

        let mut state = initial;
        let mut current = self.entry.clone();
        let mut path: Vec<String> = Vec::new();

        loop {
            if path.len() >= self.max_steps {
                warn!(graph = %self.name, max_steps = self.max_steps, node = %current, "Step limit reached");
                return Err(GraphError::GraphStepLimitExceeded {
                    max_steps: self.max_steps,
                    last_node: path.last().cloned().unwrap_or_else(|| current.clone()),
                });
            }

            let node = self
                .node(&current)
                .ok_or_else(|| GraphError::UnknownNode(current.clone()))?;

            debug!(graph = %self.name, step = path.len() + 1, node = %current, "Running node");
            state = node.run(state).await.map_err(|e| GraphError::NodeFailed {
                node: current.clone(),
                reason: e.to_string(),
            })?;
            path.push(current.clone());

            self.check_schema(&state, &format!("node '{current}'"))?;

            if self.is_terminal(&current) {
                info!(graph = %self.name, terminal = %current, steps = path.len(), "Graph run complete");
                let steps = path.len();
                return Ok(GraphRun { state, path, steps });
            }

            let next = self
                .outgoing
                .get(&current)
                .and_then(|edges| edges.iter().find(|e| e.accepts(&state)))
                .map(|e| e.to.clone())
                .ok_or_else(|| GraphError::NoMatchingEdge {
                    node: current.clone(),
                })?;

            debug!(graph = %self.name, from = %current, to = %next, "Edge taken");
            current = next;
        }
    }

    /// A serializable picture of the graph.
    pub fn describe(&self) -> GraphDescription {
        let mut edges = Vec::new();
        for (id, _) in &self.nodes {
            if let Some(out) = self.outgoing.get(id) {
                edges.extend(out.iter().map(Edge::describe));
            }
        }
        GraphDescription {
            name: self.name.clone(),
            entry: self.entry.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|(id, _)| NodeDescription {
                    id: id.clone(),
                    terminal: self.is_terminal(id),
                })
                .collect(),
            edges,
            schema: self
                .schema
                .as_ref()
                .map(|s| s.fields().map(str::to_string).collect()),
            max_steps: self.max_steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescription {
    pub id: String,
    pub terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphDescription {
    pub name: String,
    pub entry: String,
    pub nodes: Vec<NodeDescription>,
    pub edges: Vec<EdgeDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<String>>,
    pub max_steps: usize,
}
