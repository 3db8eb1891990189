//! Bounded calls to the external text generator.

use ctxeng_config::AppConfig;
use ctxeng_core::error::ProviderError;
use ctxeng_core::message::Turn;
use ctxeng_core::provider::{GenerationRequest, Provider};
use std::time::Duration;
use tracing::debug;

/// Sampling and timeout settings shared by every generation call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: 0.0,
            max_tokens: None,
            system_prompt: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl GenerationSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: Some(config.provider.max_tokens),
            system_prompt: config.agent.system_prompt.clone(),
            timeout: Duration::from_millis(config.agent.generation_timeout_ms),
        }
    }

    pub fn request(&self, prompt: impl Into<String>, context: &[Turn]) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.model.clone(), prompt).with_context(context);
        request.system_prompt = self.system_prompt.clone();
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

/// Run one generation, turning an overrun into `ProviderError::Timeout`.
///
/// Blank replies count as failures so callers never show an empty answer.
pub async fn generate(
    provider: &dyn Provider,
    settings: &GenerationSettings,
    prompt: &str,
    context: &[Turn],
) -> Result<String, ProviderError> {
    let request = settings.request(prompt, context);
    debug!(provider = %provider.name(), context_turns = context.len(), "Generating");

    let text = tokio::time::timeout(settings.timeout, provider.generate(request))
        .await
        .map_err(|_| ProviderError::Timeout {
            timeout_ms: settings.timeout.as_millis() as u64,
        })??;

    if text.trim().is_empty() {
        return Err(ProviderError::ApiError {
            status_code: 200,
            message: "Provider returned an empty reply".into(),
        });
    }
    Ok(text)
}
