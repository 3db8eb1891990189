//! Knowledge trait — the long-term fact base behind retrieval.
//!
//! Retrieval is lexical: an entry matches when its key occurs inside the
//! query, case-insensitively. This stands in for vector similarity; callers
//! only depend on "return the most relevant fact or nothing".
//!
//! Keys come from `derive_key` when the caller does not supply one: the first
//! whitespace-separated token of the fact, lower-cased. Two unrelated facts
//! that start with the same word therefore overwrite each other. That
//! collision is part of the contract and visible to callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// One durable fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Lower-cased lookup key
    pub key: String,

    /// The fact text returned on retrieval
    pub value: String,

    /// When the key was first registered (kept across overwrites)
    pub inserted_at: DateTime<Utc>,

    /// When the value was last written
    pub updated_at: DateTime<Utc>,
}

/// Derive a lookup key from a fact: its first token, lower-cased.
pub fn derive_key(fact: &str) -> Result<String, KnowledgeError> {
    fact.split_whitespace()
        .next()
        .map(str::to_lowercase)
        .ok_or(KnowledgeError::EmptyFact)
}

/// Normalise an explicit key the same way derived keys are stored.
pub fn normalize_key(key: &str) -> Result<String, KnowledgeError> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(KnowledgeError::EmptyKey);
    }
    Ok(key)
}

/// The core KnowledgeBackend trait.
///
/// Implementations must be safe for concurrent readers; `add` and `remove`
/// are rare, serialized mutations.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Upsert a fact. Returns the key it was stored under.
    ///
    /// With `key == None` the key is derived from the fact. An existing entry
    /// under the same key is overwritten in place, so two unrelated facts
    /// sharing a first word replace each other; pass an explicit key to keep
    /// both.
    async fn add(&self, fact: &str, key: Option<&str>) -> Result<String, KnowledgeError>;

    /// Value of the first-registered entry whose key occurs in `query`.
    async fn search(&self, query: &str) -> Result<Option<String>, KnowledgeError>;

    /// Exact lookup by key.
    async fn get(&self, key: &str) -> Result<Option<MemoryEntry>, KnowledgeError>;

    /// Delete an entry by key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, KnowledgeError>;

    /// All entries in registration order.
    async fn entries(&self) -> Result<Vec<MemoryEntry>, KnowledgeError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.entries().await?.len())
    }
}
