//! Provider trait — the abstraction over the external text generator.
//!
//! The orchestrator only falls back to generation when neither a tool nor a
//! stored fact answers the input. A Provider turns a prompt plus the recent
//! turn window into text; how it does that (HTTP, local model, script) is
//! its own business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Turn;

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "gpt-3.5-turbo")
    pub model: String,

    /// Optional system instructions placed before the context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// The prompt for this turn
    pub prompt: String,

    /// Session turns preceding the prompt, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Turn>,

    /// Temperature (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// A bare request with no context and default sampling.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            prompt: prompt.into(),
            context: Vec::new(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Attach the recent turn window.
    pub fn with_context(mut self, context: &[Turn]) -> Self {
        self.context = context.to_vec();
        self
    }
}

/// The core Provider trait.
///
/// Failures surface as `ProviderError`; the orchestrator substitutes a
/// fallback response instead of propagating them.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Generate text for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;

    /// Whether the provider is reachable.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
