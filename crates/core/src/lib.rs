//! # ctxeng Core
//!
//! Domain types, traits, and error definitions for the ctxeng agent
//! orchestration core. This crate has **no runtime wiring**. It defines the
//! domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the orchestrator talks to is defined as a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping the knowledge backend or model provider via configuration
//! - Easy testing with scripted/mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use knowledge::{KnowledgeBackend, MemoryEntry, derive_key};
pub use message::{Role, Turn};
pub use provider::{GenerationRequest, Provider};
pub use session::{SessionId, ShortTermMemory};
pub use tool::{Tool, ToolDescriptor, ToolOutput, ToolRegistry, ToolResult};
