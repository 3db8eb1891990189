//! In-memory knowledge backend — the default long-term store.
//!
//! Entries live in a `Vec` so registration order is the iteration order;
//! the first registered key that matches a query wins. Overwrites replace
//! the value in place and keep the entry's position.

use async_trait::async_trait;
use chrono::Utc;
use ctxeng_core::error::KnowledgeError;
use ctxeng_core::knowledge::{KnowledgeBackend, MemoryEntry, derive_key, normalize_key};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A knowledge store held entirely in process memory.
///
/// Cloning is cheap and shares the underlying entries.
#[derive(Clone)]
pub struct InMemoryKnowledge {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemoryKnowledge {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build a store seeded with facts, each keyed by its first token.
    pub fn with_facts<I, S>(facts: I) -> Result<Self, KnowledgeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        for fact in facts {
            let fact = fact.as_ref();
            let key = derive_key(fact)?;
            upsert(&mut entries, key, fact);
        }
        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
        })
    }
}

impl Default for InMemoryKnowledge {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert(entries: &mut Vec<MemoryEntry>, key: String, fact: &str) {
    let now = Utc::now();
    if let Some(existing) = entries.iter_mut().find(|e| e.key == key) {
        existing.value = fact.to_string();
        existing.updated_at = now;
    } else {
        entries.push(MemoryEntry {
            key,
            value: fact.to_string(),
            inserted_at: now,
            updated_at: now,
        });
    }
}

#[async_trait]
impl KnowledgeBackend for InMemoryKnowledge {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn add(&self, fact: &str, key: Option<&str>) -> Result<String, KnowledgeError> {
        let key = match key {
            Some(k) => normalize_key(k)?,
            None => derive_key(fact)?,
        };
        debug!(key = %key, "Upserting fact");
        upsert(&mut *self.entries.write().await, key.clone(), fact);
        Ok(key)
    }

    async fn search(&self, query: &str) -> Result<Option<String>, KnowledgeError> {
        let query = query.to_lowercase();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| query.contains(e.key.as_str()))
            .map(|e| e.value.clone()))
    }

    async fn get(&self, key: &str) -> Result<Option<MemoryEntry>, KnowledgeError> {
        let key = normalize_key(key)?;
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.key == key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, KnowledgeError> {
        let key = normalize_key(key)?;
        let mut entries = self.entries.write().await;
        let len_before = entries.len();
        entries.retain(|e| e.key != key);
        Ok(entries.len() < len_before)
    }

    async fn entries(&self) -> Result<Vec<MemoryEntry>, KnowledgeError> {
        Ok(self.entries.read().await.clone())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.entries.read().await.len())
    }
}
