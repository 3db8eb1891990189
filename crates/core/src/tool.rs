//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what let the agent act. The registry sits between tool code
//! and the orchestrator: whatever a tool does, the caller only ever sees a
//! `ToolResult`.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{RegistryError, ToolError};

/// Default per-invocation timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// The successful output of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text shown to the user
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolOutput {
    /// Plain text output with no structured payload.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            data: None,
        }
    }
}

/// Outcome of one invocation: output or a captured failure.
pub type ToolResult = std::result::Result<ToolOutput, ToolError>;

/// The read-only description of a registered tool, as listed to adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,

    /// What the tool does
    pub description: String,

    /// JSON Schema describing the tool's arguments
    pub input_schema: serde_json::Value,
}

/// The core Tool trait.
///
/// `trigger` implements the literal pattern style of matching: a tool that
/// recognises its own input shape (arithmetic, "dobro de N") returns the
/// arguments it would be invoked with. Tools that should only be called by
/// name keep the default, which never matches.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Arguments extracted from free text when the input matches this tool.
    fn trigger(&self, _input: &str) -> Option<serde_json::Value> {
        None
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> ToolResult;

    /// The descriptor advertised for this tool.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Populated once at startup, then shared read-only (usually behind an
/// `Arc`). Registration order is preserved and decides which tool wins when
/// several triggers match the same input.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Set the default per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        debug!(tool = %name, "Registering tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(Arc::from(tool));
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The first tool (in registration order) whose trigger matches `input`,
    /// with the arguments it extracted.
    pub fn match_trigger(&self, input: &str) -> Option<(&str, serde_json::Value)> {
        self.tools
            .iter()
            .find_map(|t| t.trigger(input).map(|args| (t.name(), args)))
    }

    /// Invoke a tool by name with the registry's default timeout.
    pub async fn invoke(&self, name: &str, arguments: serde_json::Value) -> ToolResult {
        self.invoke_with_timeout(name, arguments, self.timeout).await
    }

    /// Invoke a tool by name, bounding it by `timeout`.
    ///
    /// Errors, timeouts and panics inside the tool are all returned as
    /// `ToolError` values.
    pub async fn invoke_with_timeout(
        &self,
        name: &str,
        arguments: serde_json::Value,
        timeout: Duration,
    ) -> ToolResult {
        let tool = self
            .index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let started = Instant::now();
        let guarded = AssertUnwindSafe(tool.execute(arguments)).catch_unwind();

        let result = match tokio::time::timeout(timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(ToolError::Panicked {
                tool_name: name.to_string(),
                reason: panic_message(payload.as_ref()),
            }),
            Err(_) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(tool = %name, elapsed_ms, "Tool succeeded"),
            Err(e) => warn!(tool = %name, elapsed_ms, error = %e, "Tool failed"),
        }
        result
    }

    /// Invoke the first tool whose trigger matches `input`, if any.
    pub async fn invoke_if_pattern_matches(&self, input: &str) -> Option<ToolResult> {
        let (name, arguments) = self.match_trigger(input)?;
        let name = name.to_string();
        Some(self.invoke(&name, arguments).await)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
