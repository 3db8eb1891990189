//! The orchestration layer of ctxeng.
//!
//! Each user turn goes through the [`Orchestrator`]:
//!
//! 1. **Record** the input in the session's short-term memory
//! 2. **Route** it with the [`DecisionRouter`]: a matching tool trigger wins,
//!    then a stored fact, then external generation
//! 3. **Resolve** the chosen [`Action`] into a response
//! 4. **Record** the response, and store a fact if the input asked for it
//!
//! In graph mode step 2 and 3 are replaced by a run of a prebuilt execution
//! graph (see [`graphs`]).

pub mod generation;
pub mod graphs;
pub mod orchestrator;
pub mod router;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use generation::GenerationSettings;
pub use orchestrator::{Orchestrator, OrchestratorConfig, TurnOutcome, parse_remember_directive};
pub use router::{Action, DecisionRouter, KnowledgeMatcher, Matcher, ToolTriggerMatcher};
