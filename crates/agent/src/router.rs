//! Decision router — picks how a turn gets answered.
//!
//! The router is an ordered chain of [`Matcher`]s evaluated top to bottom;
//! the first one that claims the input decides the [`Action`]. When none
//! does, the answer is [`Action::Fallback`]. The standard chain puts tool
//! triggers ahead of knowledge retrieval.

use async_trait::async_trait;
use ctxeng_core::knowledge::KnowledgeBackend;
use ctxeng_core::message::Turn;
use ctxeng_core::tool::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// The strategy chosen for one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Run a registered tool with the arguments its trigger extracted
    InvokeTool {
        name: String,
        arguments: serde_json::Value,
    },
    /// Answer with a stored fact
    Retrieve { value: String },
    /// Delegate to external generation over the recent turns
    Fallback,
}

impl Action {
    /// Short label for logs and events.
    pub fn label(&self) -> String {
        match self {
            Action::InvokeTool { name, .. } => format!("invoke_tool:{name}"),
            Action::Retrieve { .. } => "retrieve".into(),
            Action::Fallback => "fallback".into(),
        }
    }
}

/// One link of the routing chain.
#[async_trait]
pub trait Matcher: Send + Sync {
    fn name(&self) -> &str;

    /// Claim the input by returning an action, or pass with `Ok(None)`.
    async fn matches(&self, input: &str, context: &[Turn]) -> ctxeng_core::Result<Option<Action>>;
}

/// Claims inputs that some registered tool's trigger recognises.
pub struct ToolTriggerMatcher {
    tools: Arc<ToolRegistry>,
}

impl ToolTriggerMatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Matcher for ToolTriggerMatcher {
    fn name(&self) -> &str {
        "tool_trigger"
    }

    async fn matches(&self, input: &str, _context: &[Turn]) -> ctxeng_core::Result<Option<Action>> {
        Ok(self
            .tools
            .match_trigger(input)
            .map(|(name, arguments)| Action::InvokeTool {
                name: name.to_string(),
                arguments,
            }))
    }
}

/// Claims inputs the knowledge store has a fact for.
pub struct KnowledgeMatcher {
    knowledge: Arc<dyn KnowledgeBackend>,
}

impl KnowledgeMatcher {
    pub fn new(knowledge: Arc<dyn KnowledgeBackend>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Matcher for KnowledgeMatcher {
    fn name(&self) -> &str {
        "knowledge"
    }

    async fn matches(&self, input: &str, _context: &[Turn]) -> ctxeng_core::Result<Option<Action>> {
        let hit = self.knowledge.search(input).await?;
        Ok(hit
            .filter(|value| !value.is_empty())
            .map(|value| Action::Retrieve { value }))
    }
}

/// Ordered matcher chain.
pub struct DecisionRouter {
    matchers: Vec<Box<dyn Matcher>>,
}

impl DecisionRouter {
    /// An empty chain; every input falls back.
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Tool triggers first, then knowledge retrieval.
    pub fn standard(tools: Arc<ToolRegistry>, knowledge: Arc<dyn KnowledgeBackend>) -> Self {
        Self::new()
            .with_matcher(ToolTriggerMatcher::new(tools))
            .with_matcher(KnowledgeMatcher::new(knowledge))
    }

    /// Append a matcher to the end of the chain.
    pub fn with_matcher(mut self, matcher: impl Matcher + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Insert a matcher at `index`, shifting later ones down.
    pub fn insert_matcher(&mut self, index: usize, matcher: impl Matcher + 'static) {
        let index = index.min(self.matchers.len());
        self.matchers.insert(index, Box::new(matcher));
    }

    pub fn matcher_names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Pick the action for `input`.
    ///
    /// A matcher that errors is skipped as if it had passed.
    pub async fn decide(&self, input: &str, context: &[Turn]) -> Action {
        for matcher in &self.matchers {
            match matcher.matches(input, context).await {
                Ok(Some(action)) => {
                    debug!(matcher = %matcher.name(), action = %action.label(), "Matcher claimed input");
                    return action;
                }
                Ok(None) => {}
                Err(e) => warn!(matcher = %matcher.name(), error = %e, "Matcher failed, skipping"),
            }
        }
        Action::Fallback
    }
}

impl Default for DecisionRouter {
    fn default() -> Self {
        Self::new()
    }
}
