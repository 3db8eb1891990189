//! Execution graph engine.
//!
//! Static directed graphs of state-transforming nodes joined by optionally
//! conditional edges. Definitions are built and validated once, then run
//! any number of times, each run owning its own [`ExecutionState`].
//!
//! ```ignore
//! let graph = GraphBuilder::new("classify")
//!     .add_fn_node("classify", classify)
//!     .add_fn_node("greet", greet)
//!     .add_fn_node("answer", answer)
//!     .add_conditional_edges("classify", "tipo", [("greeting", "greet"), ("question", "answer")])
//!     .set_entry("classify")
//!     .set_terminal("greet")
//!     .set_terminal("answer")
//!     .build()?;
//! let run = graph.run(ExecutionState::new().with("mensagem", "Oi!")).await?;
//! ```

pub mod error;
pub mod graph;
pub mod node;
pub mod state;

pub use error::GraphError;
pub use graph::{CompiledGraph, DEFAULT_MAX_STEPS, GraphBuilder, GraphDescription, GraphRun};
pub use node::{Edge, FnNode, Node, NodeError, Predicate};
pub use state::{ExecutionState, StateSchema};
