//! Error types for the ctxeng domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` aggregates them.

use thiserror::Error;

/// The top-level error type for orchestration operations.
///
/// Only failures that must not be masked end up here: registry defects,
/// structurally invalid graphs, and configuration problems. Tool faults and
/// generation failures are recovered as data before they reach this type.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge store errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Graph execution errors (fatal, rendered by the workflow crate) ---
    #[error("Graph error: {0}")]
    Graph(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Generation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Cannot derive a key from an empty fact")]
    EmptyFact,

    #[error("Knowledge keys must not be empty")]
    EmptyKey,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A per-invocation tool failure.
///
/// Always returned as data from the registry; never a reason to abort a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Tool panicked: {tool_name} — {reason}")]
    Panicked { tool_name: String, reason: String },
}

impl ToolError {
    /// The name of the tool this failure belongs to.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::NotFound(name) => name,
            ToolError::ExecutionFailed { tool_name, .. }
            | ToolError::InvalidArguments { tool_name, .. }
            | ToolError::Timeout { tool_name, .. }
            | ToolError::Panicked { tool_name, .. } => tool_name,
        }
    }

    /// Human-readable failure message without the tool name prefix.
    pub fn message(&self) -> String {
        match self {
            ToolError::NotFound(_) => "no tool registered under this name".into(),
            ToolError::ExecutionFailed { reason, .. }
            | ToolError::InvalidArguments { reason, .. }
            | ToolError::Panicked { reason, .. } => reason.clone(),
            ToolError::Timeout { timeout_ms, .. } => format!("timed out after {timeout_ms}ms"),
        }
    }
}

/// Registration-time failures. Fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_exposes_name_and_message() {
        let err = ToolError::ExecutionFailed {
            tool_name: "calculator".into(),
            reason: "Division by zero".into(),
        };
        assert_eq!(err.tool_name(), "calculator");
        assert_eq!(err.message(), "Division by zero");

        let timeout = ToolError::Timeout {
            tool_name: "slow".into(),
            timeout_ms: 50,
        };
        assert_eq!(timeout.tool_name(), "slow");
        assert!(timeout.message().contains("50ms"));
    }

    #[test]
    fn duplicate_tool_converts_to_top_level() {
        let err: Error = RegistryError::DuplicateTool("echo".into()).into();
        assert!(matches!(err, Error::Registry(RegistryError::DuplicateTool(_))));
        assert!(err.to_string().contains("echo"));
    }
}
