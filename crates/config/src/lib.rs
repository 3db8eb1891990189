//! Configuration loading, validation, and management for ctxeng.
//!
//! Loads configuration from `~/.ctxeng/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ctxeng/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External model collaborator
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Orchestrator behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// Execution graph limits
    #[serde(default)]
    pub graph: GraphConfig,

    /// Long-term knowledge store
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// Which generation backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    OpenRouter,
    Ollama,
    /// No external model; fallback turns get the configured apology.
    #[serde(rename = "none")]
    Disabled,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Disabled => "none",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "ollama" => Ok(ProviderKind::Ollama),
            "none" => Ok(ProviderKind::Disabled),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider kind '{other}' (expected openai, openrouter, ollama or none)"
            ))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// API key; usually supplied through the environment instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override for OpenAI-compatible endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_tokens() -> u32 {
    512
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Turns handed to the model on fallback
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,

    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Reply used when generation is unavailable or fails
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Control phrases that store the rest of the input as a fact
    #[serde(default = "default_remember_directives")]
    pub remember_directives: Vec<String>,

    /// Inputs that end an interactive session
    #[serde(default = "default_exit_sentinels")]
    pub exit_sentinels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_context_window() -> usize {
    5
}
fn default_tool_timeout_ms() -> u64 {
    10_000
}
fn default_generation_timeout_ms() -> u64 {
    30_000
}
fn default_fallback_message() -> String {
    "Desculpe, não sei a resposta para isso.".into()
}
fn default_remember_directives() -> Vec<String> {
    vec!["adicionar memória:".into(), "remember:".into()]
}
fn default_exit_sentinels() -> Vec<String> {
    vec!["sair".into(), "exit".into(), "quit".into()]
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            tool_timeout_ms: default_tool_timeout_ms(),
            generation_timeout_ms: default_generation_timeout_ms(),
            fallback_message: default_fallback_message(),
            remember_directives: default_remember_directives(),
            exit_sentinels: default_exit_sentinels(),
            system_prompt: None,
        }
    }
}

impl AgentConfig {
    /// Whether `input` is one of the exit sentinels (case-insensitive).
    pub fn is_exit(&self, input: &str) -> bool {
        let input = input.trim();
        self.exit_sentinels
            .iter()
            .any(|s| s.eq_ignore_ascii_case(input))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    25
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Facts loaded at startup. Absent means the built-in seed; an empty
    /// list starts with an empty store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ctxeng/config.toml).
    ///
    /// Environment overrides:
    /// - `CTXENG_API_KEY` (highest priority), then `OPENAI_API_KEY`,
    ///   then `OPENROUTER_API_KEY`
    /// - `CTXENG_PROVIDER`
    /// - `CTXENG_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider.api_key.is_none() {
            self.provider.api_key = lookup("CTXENG_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }

        if let Some(kind) = lookup("CTXENG_PROVIDER") {
            self.provider.kind = kind.parse()?;
        }

        if let Some(model) = lookup("CTXENG_MODEL") {
            self.provider.model = model;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ctxeng")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.context_window == 0 {
            return Err(ConfigError::ValidationError(
                "agent.context_window must be > 0".into(),
            ));
        }
        if self.agent.tool_timeout_ms == 0 || self.agent.generation_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "agent timeouts must be > 0".into(),
            ));
        }
        if self.agent.remember_directives.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "agent.remember_directives must contain a non-empty phrase".into(),
            ));
        }
        if self.agent.exit_sentinels.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "agent.exit_sentinels must contain a non-empty sentinel".into(),
            ));
        }
        if self.graph.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "graph.max_steps must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for ctxeng_core::Error {
    fn from(err: ConfigError) -> Self {
        ctxeng_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.kind, ProviderKind::OpenAi);
        assert_eq!(config.agent.context_window, 5);
        assert_eq!(config.graph.max_steps, 25);
        assert!(config.knowledge.seed.is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.agent.exit_sentinels, config.agent.exit_sentinels);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.context_window = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.graph.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.exit_sentinels = vec!["  ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.model, "gpt-3.5-turbo");
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[provider]
kind = "none"

[agent]
context_window = 3
fallback_message = "Não sei."

[knowledge]
seed = ["rust é uma linguagem"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Disabled);
        assert_eq!(config.agent.context_window, 3);
        assert_eq!(config.agent.fallback_message, "Não sei.");
        assert_eq!(config.agent.tool_timeout_ms, 10_000);
        assert_eq!(config.knowledge.seed.as_deref().map(<[String]>::len), Some(1));
    }

    #[test]
    fn invalid_file_reports_parse_or_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[agent\ncontext_window = 3").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));

        std::fs::write(&path, "[graph]\nmax_steps = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn env_overrides_follow_priority() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "sk-router"),
            ("CTXENG_PROVIDER", "OpenRouter"),
            ("CTXENG_MODEL", "gpt-4o-mini"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.provider.kind, ProviderKind::OpenRouter);
        assert_eq!(config.provider.model, "gpt-4o-mini");

        let mut config = AppConfig::default();
        config
            .apply_env(|k| (k == "CTXENG_PROVIDER").then(|| "bogus".to_string()))
            .unwrap_err();
    }

    #[test]
    fn file_api_key_beats_environment() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("from-file".into());
        config
            .apply_env(|k| (k == "CTXENG_API_KEY").then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret-123".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret-123"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn exit_sentinels_are_case_insensitive() {
        let agent = AgentConfig::default();
        assert!(agent.is_exit("Sair"));
        assert!(agent.is_exit("  quit "));
        assert!(!agent.is_exit("sair agora"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-3.5-turbo"));
        assert!(toml_str.contains("max_steps = 25"));
        assert!(toml_str.contains("kind = \"openai\""));
    }
}
