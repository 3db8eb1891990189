//! Graph build and run errors.
//!
//! Everything except `NodeFailed` points at a broken graph definition and is
//! fatal. `NodeFailed` wraps a handler's own failure (usually an unavailable
//! collaborator) and is the caller's to recover.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    // --- Build time ---
    #[error("Node registered twice: {0}")]
    DuplicateNode(String),

    #[error("Unknown node referenced: {0}")]
    UnknownNode(String),

    #[error("Graph has no entry node")]
    MissingEntry,

    #[error("Graph has no terminal node")]
    NoTerminal,

    #[error("Non-terminal node has no outgoing edge: {0}")]
    DeadEnd(String),

    #[error("Step limit must be greater than zero")]
    InvalidStepLimit,

    // --- Build or run time ---
    #[error("Field '{field}' is not declared in the state schema (at {location})")]
    UndeclaredField { location: String, field: String },

    // --- Run time ---
    #[error("Graph exceeded {max_steps} steps (last node: {last_node})")]
    GraphStepLimitExceeded { max_steps: usize, last_node: String },

    #[error("No outgoing edge of '{node}' accepts the current state")]
    NoMatchingEdge { node: String },

    #[error("Node '{node}' failed: {reason}")]
    NodeFailed { node: String, reason: String },
}

impl From<GraphError> for ctxeng_core::Error {
    fn from(err: GraphError) -> Self {
        ctxeng_core::Error::Graph(err.to_string())
    }
}
