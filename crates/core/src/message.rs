//! Turn domain types.
//!
//! A `Turn` is one utterance in a session: the user's input or the agent's
//! response. Once appended to a session's short-term memory a turn is
//! never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The orchestrating agent
    Agent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// One utterance in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Position within the session, strictly increasing from 0
    pub sequence: u64,

    /// Who said it
    pub role: Role,

    /// The text content
    pub text: String,

    /// When the turn was appended
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub(crate) fn new(sequence: u64, role: Role, text: impl Into<String>) -> Self {
        Self {
            sequence,
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether this turn came from the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
