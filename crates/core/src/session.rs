//! Short-term memory — the ordered turn log of one session.
//!
//! All turns are retained for the session's lifetime; `window` is the only
//! way callers see a bounded view. Teardown is the caller's business: drop the
//! value when the session ends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Role, Turn};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The session-scoped turn log.
///
/// Sequence numbers are assigned on append, so ordering is enforced by
/// construction rather than trusted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermMemory {
    /// Session this log belongs to
    pub id: SessionId,

    turns: Vec<Turn>,
}

impl ShortTermMemory {
    /// Create an empty log for a fresh session.
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            turns: Vec::new(),
        }
    }

    /// Append a turn and return a reference to it.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> &Turn {
        let sequence = self.turns.len() as u64;
        self.turns.push(Turn::new(sequence, role, text));
        &self.turns[self.turns.len() - 1]
    }

    /// The most recent `n` turns, oldest first.
    ///
    /// Returns fewer than `n` when the history is shorter; `n == 0` yields
    /// an empty slice. Never mutates.
    pub fn window(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Render the last `n` turns as a prompt context block, one line per turn.
    pub fn render(&self, n: usize) -> String {
        self.window(n)
            .iter()
            .map(|t| format!("{}: {}", t.role, t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every turn in append order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new()
    }
}
