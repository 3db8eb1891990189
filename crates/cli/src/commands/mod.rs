pub mod chat;
pub mod config_cmd;
pub mod graph;
pub mod knowledge;
pub mod onboard;
pub mod tools;

use clap::ValueEnum;
use ctxeng_agent::graphs;
use ctxeng_agent::{GenerationSettings, Orchestrator, OrchestratorConfig};
use ctxeng_config::AppConfig;
use ctxeng_core::provider::Provider;
use ctxeng_core::tool::ToolRegistry;
use ctxeng_memory::{DEFAULT_SEED, InMemoryKnowledge};
use ctxeng_workflow::CompiledGraph;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Prebuilt graphs selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphChoice {
    /// Greet greetings, send questions to the model
    Classify,
    /// Generate, weigh, and choose ideas
    Ideas,
}

impl GraphChoice {
    pub fn build(
        self,
        provider: Option<Arc<dyn Provider>>,
        settings: GenerationSettings,
        max_steps: usize,
    ) -> Result<CompiledGraph, ctxeng_workflow::GraphError> {
        match self {
            GraphChoice::Classify => graphs::classify_and_respond(provider, settings, max_steps),
            GraphChoice::Ideas => graphs::idea_tree(provider, settings, max_steps),
        }
    }
}

/// Build the tool registry from config, with an optional lookup document.
pub fn build_tools(
    config: &AppConfig,
    document: Option<PathBuf>,
) -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let registry = match document {
        Some(path) => ctxeng_tools::registry_with_document(path)?,
        None => ctxeng_tools::default_registry()?,
    };
    Ok(registry.with_timeout(Duration::from_millis(config.agent.tool_timeout_ms)))
}

/// Seed the knowledge store from config, or the built-in facts.
pub fn build_knowledge(config: &AppConfig) -> Result<InMemoryKnowledge, Box<dyn std::error::Error>> {
    let store = match &config.knowledge.seed {
        Some(facts) => InMemoryKnowledge::with_facts(facts)?,
        None => InMemoryKnowledge::with_facts(DEFAULT_SEED)?,
    };
    Ok(store)
}

/// Build the provider, or run without one when it cannot be configured.
pub fn build_provider(config: &AppConfig) -> Option<Arc<dyn Provider>> {
    match ctxeng_providers::build_from_config(config) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(
                provider = %config.provider.kind,
                error = %e,
                "Text generator unavailable; fallback turns will use the configured reply"
            );
            None
        }
    }
}

/// Wire an orchestrator from config.
pub fn build_orchestrator(
    config: &AppConfig,
    graph: Option<GraphChoice>,
    document: Option<PathBuf>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let tools = Arc::new(build_tools(config, document)?);
    let knowledge = Arc::new(build_knowledge(config)?);
    let provider = build_provider(config);
    let orchestrator_config = OrchestratorConfig::from_app_config(config);

    let mut orchestrator = Orchestrator::new(tools, knowledge, orchestrator_config.clone());

    if let Some(choice) = graph {
        let compiled = choice.build(
            provider.clone(),
            orchestrator_config.generation,
            config.graph.max_steps,
        )?;
        tracing::info!(graph = %compiled.name(), "Graph mode enabled");
        orchestrator = orchestrator.with_graph(Arc::new(compiled));
    }

    if let Some(provider) = provider {
        orchestrator = orchestrator.with_provider(provider);
    }

    Ok(orchestrator)
}
