//! Execution state and its schema.
//!
//! State is a mapping of named fields to JSON values. A graph may declare
//! the fields it uses; the engine then rejects predicates that read
//! undeclared fields at build time and nodes that write them at run time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The shared record threaded through one graph run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    fields: BTreeMap<String, serde_json::Value>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    /// The field as a string, if present and a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<serde_json::Value> {
        self.fields.remove(field)
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, serde_json::Value> {
        self.fields
    }
}

/// The documented field set of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    fields: BTreeSet<String>,
}

impl StateSchema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn declares(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// The first field of `state` this schema does not declare.
    pub fn first_undeclared<'a>(&self, state: &'a ExecutionState) -> Option<&'a str> {
        state.field_names().find(|f| !self.declares(f))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}
