//! Provider construction from configuration.

use ctxeng_config::{AppConfig, ProviderKind};
use ctxeng_core::error::ProviderError;
use ctxeng_core::provider::Provider;
use std::sync::Arc;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// Returns `Ok(None)` when generation is disabled (`kind = "none"`).
/// Hosted providers without an API key are a configuration error.
pub fn build_from_config(config: &AppConfig) -> Result<Option<Arc<dyn Provider>>, ProviderError> {
    let provider_config = &config.provider;
    let kind = provider_config.kind;

    if kind == ProviderKind::Disabled {
        info!("Generation disabled; fallback turns use the configured reply");
        return Ok(None);
    }

    let base_url = provider_config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(kind).to_string());

    let api_key = match (kind, &provider_config.api_key) {
        (_, Some(key)) => key.clone(),
        (ProviderKind::Ollama, None) => "ollama".to_string(),
        (_, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{kind}' (set CTXENG_API_KEY)"
            )));
        }
    };

    info!(provider = %kind, base_url = %base_url, model = %provider_config.model, "Provider configured");

    Ok(Some(Arc::new(OpenAiCompatProvider::new(
        kind.to_string(),
        base_url,
        api_key,
    ))))
}

/// Get the default base URL for well-known providers.
fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "https://api.openai.com/v1",
        ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        ProviderKind::Ollama | ProviderKind::Disabled => "http://localhost:11434/v1",
    }
}
