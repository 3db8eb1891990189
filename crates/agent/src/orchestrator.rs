//! The per-turn coordinator.
//!
//! One call to [`Orchestrator::handle_turn`] is one complete exchange:
//!
//! 1. Append the input to the session's short-term memory
//! 2. Route it (or run the execution graph, in graph mode)
//! 3. Resolve the chosen action into a response
//! 4. Append the response
//! 5. Store a fact if the input carried a remember directive
//!
//! The orchestrator owns no session state. Memory is passed in per call, so
//! one orchestrator can serve many independent sessions.
//!
//! Failures of tools or the text generator degrade the response and the turn
//! continues. A structurally broken graph is returned as an error.

use chrono::Utc;
use ctxeng_config::AppConfig;
use ctxeng_core::event::{DomainEvent, EventBus};
use ctxeng_core::knowledge::KnowledgeBackend;
use ctxeng_core::message::{Role, Turn};
use ctxeng_core::provider::Provider;
use ctxeng_core::session::ShortTermMemory;
use ctxeng_core::tool::ToolRegistry;
use ctxeng_workflow::{CompiledGraph, ExecutionState, GraphError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::generation::{GenerationSettings, generate};
use crate::graphs::{CONTEXT, INPUT, RESPONSE};
use crate::router::{Action, DecisionRouter};

/// Orchestrator tuning, usually derived from `AppConfig`.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub generation: GenerationSettings,
    /// Turns handed to the generator on fallback
    pub context_window: usize,
    pub tool_timeout: Duration,
    /// Reply used when generation is unavailable or fails
    pub fallback_message: String,
    /// Control phrases; text after one is stored as a fact
    pub remember_directives: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generation: GenerationSettings::default(),
            context_window: 5,
            tool_timeout: Duration::from_secs(10),
            fallback_message: "Desculpe, não sei a resposta para isso.".into(),
            remember_directives: vec!["adicionar memória:".into(), "remember:".into()],
        }
    }
}

impl OrchestratorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            generation: GenerationSettings::from_app_config(config),
            context_window: config.agent.context_window,
            tool_timeout: Duration::from_millis(config.agent.tool_timeout_ms),
            fallback_message: config.agent.fallback_message.clone(),
            remember_directives: config.agent.remember_directives.clone(),
        }
    }
}

/// What one turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub response: String,
    /// The routed action; `None` for graph-mode turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Nodes visited, for graph-mode turns
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub graph_path: Vec<String>,
    /// Key of the fact stored by a remember directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remembered: Option<String>,
    /// Whether the response is a substitute for a failed tool or generator
    pub degraded: bool,
}

/// Composes memory, routing, tools, knowledge, and generation per turn.
pub struct Orchestrator {
    tools: Arc<ToolRegistry>,
    knowledge: Arc<dyn KnowledgeBackend>,
    router: DecisionRouter,
    provider: Option<Arc<dyn Provider>>,
    graph: Option<Arc<CompiledGraph>>,
    events: Arc<EventBus>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with the standard router over `tools` and
    /// `knowledge`. Without a provider, fallback turns get the configured
    /// fallback message.
    pub fn new(
        tools: Arc<ToolRegistry>,
        knowledge: Arc<dyn KnowledgeBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        let router = DecisionRouter::standard(Arc::clone(&tools), Arc::clone(&knowledge));
        Self {
            tools,
            knowledge,
            router,
            provider: None,
            graph: None,
            events: Arc::new(EventBus::default()),
            config,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the routing chain.
    pub fn with_router(mut self, router: DecisionRouter) -> Self {
        self.router = router;
        self
    }

    /// Answer turns by running `graph` instead of routing.
    pub fn with_graph(mut self, graph: Arc<CompiledGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn knowledge(&self) -> &Arc<dyn KnowledgeBackend> {
        &self.knowledge
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process one user input within `memory`'s session.
    ///
    /// The user turn is recorded before anything else runs. A fatal graph
    /// error returns with that turn unanswered; no agent turn is appended.
    pub async fn handle_turn(
        &self,
        memory: &mut ShortTermMemory,
        input: &str,
    ) -> ctxeng_core::Result<TurnOutcome> {
        let session_id = memory.id.to_string();
        let sequence = memory.append(Role::User, input).sequence;
        info!(session = %session_id, sequence, "Turn received");
        self.events.publish(DomainEvent::TurnReceived {
            session_id: session_id.clone(),
            sequence,
            content_preview: preview(input),
            timestamp: Utc::now(),
        });

        let context = preceding(memory, self.config.context_window).to_vec();

        let (response, action, graph_path, degraded) = match &self.graph {
            Some(graph) => {
                let (response, path, degraded) = self.run_graph(graph, input, &context).await?;
                (response, None, path, degraded)
            }
            None => {
                let action = self.router.decide(input, &context).await;
                info!(session = %session_id, action = %action.label(), "Action chosen");
                self.events.publish(DomainEvent::ActionChosen {
                    session_id: session_id.clone(),
                    action: action.label(),
                    timestamp: Utc::now(),
                });
                let (response, degraded) = self.resolve(&action, input, &context).await;
                (response, Some(action), Vec::new(), degraded)
            }
        };

        memory.append(Role::Agent, response.clone());
        let remembered = self.remember(input).await;

        Ok(TurnOutcome {
            response,
            action,
            graph_path,
            remembered,
            degraded,
        })
    }

    /// Turn an action into response text. The flag marks degraded replies.
    async fn resolve(&self, action: &Action, input: &str, context: &[Turn]) -> (String, bool) {
        match action {
            Action::InvokeTool { name, arguments } => {
                let started = Instant::now();
                let result = self
                    .tools
                    .invoke_with_timeout(name, arguments.clone(), self.config.tool_timeout)
                    .await;
                self.events.publish(DomainEvent::ToolExecuted {
                    tool_name: name.clone(),
                    success: result.is_ok(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });
                match result {
                    Ok(output) => (output.output, false),
                    Err(e) => {
                        self.report_error("tool", &e.to_string());
                        (
                            format!("A ferramenta '{}' falhou: {}", e.tool_name(), e.message()),
                            true,
                        )
                    }
                }
            }
            Action::Retrieve { value } => (value.clone(), false),
            Action::Fallback => self.fallback(input, context).await,
        }
    }

    async fn fallback(&self, input: &str, context: &[Turn]) -> (String, bool) {
        let Some(provider) = &self.provider else {
            debug!("No provider configured, using fallback message");
            return (self.config.fallback_message.clone(), true);
        };

        match generate(provider.as_ref(), &self.config.generation, input, context).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "Generation failed, using fallback message");
                self.report_error("generation", &e.to_string());
                (self.config.fallback_message.clone(), true)
            }
        }
    }

    async fn run_graph(
        &self,
        graph: &CompiledGraph,
        input: &str,
        context: &[Turn],
    ) -> ctxeng_core::Result<(String, Vec<String>, bool)> {
        let state = ExecutionState::new()
            .with(INPUT, input)
            .with(CONTEXT, serde_json::to_value(context)?);

        match graph.run(state).await {
            Ok(run) => {
                self.events.publish(DomainEvent::GraphCompleted {
                    terminal: run.terminal().to_string(),
                    steps: run.steps,
                    timestamp: Utc::now(),
                });
                match run.state.get_str(RESPONSE) {
                    Some(text) => Ok((text.to_string(), run.path, false)),
                    None => {
                        warn!(graph = %graph.name(), terminal = %run.terminal(), "Graph finished without a response");
                        Ok((self.config.fallback_message.clone(), run.path, true))
                    }
                }
            }
            Err(GraphError::NodeFailed { node, reason }) => {
                warn!(graph = %graph.name(), node = %node, reason = %reason, "Graph node failed, using fallback message");
                self.report_error("graph node", &reason);
                Ok((self.config.fallback_message.clone(), Vec::new(), true))
            }
            Err(e) => {
                self.report_error("graph", &e.to_string());
                Err(e.into())
            }
        }
    }

    /// Store the fact following a remember directive, if any.
    ///
    /// Runs after the response so the fact cannot answer its own turn.
    async fn remember(&self, input: &str) -> Option<String> {
        let fact = parse_remember_directive(input, &self.config.remember_directives)?;
        match self.knowledge.add(fact, None).await {
            Ok(key) => {
                info!(key = %key, "Fact stored");
                self.events.publish(DomainEvent::KnowledgeUpdated {
                    key: key.clone(),
                    timestamp: Utc::now(),
                });
                Some(key)
            }
            Err(e) => {
                warn!(error = %e, "Could not store fact");
                self.report_error("knowledge", &e.to_string());
                None
            }
        }
    }

    fn report_error(&self, context: &str, message: &str) {
        self.events.publish(DomainEvent::ErrorOccurred {
            context: context.to_string(),
            error_message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// The text after the first remember directive found in `input`.
///
/// Directives match case-insensitively anywhere in the input.
pub fn parse_remember_directive<'a>(input: &'a str, directives: &[String]) -> Option<&'a str> {
    directives
        .iter()
        .map(|d| d.trim().to_lowercase().chars().collect::<Vec<_>>())
        .filter(|d| !d.is_empty())
        .find_map(|d| {
            input.char_indices().find_map(|(at, _)| {
                let len = caseless_prefix_len(&input[at..], &d)?;
                Some(input[at + len..].trim())
            })
        })
}

/// Byte length of the prefix of `text` that lower-cases to `needle`.
fn caseless_prefix_len(text: &str, needle: &[char]) -> Option<usize> {
    let mut pending = needle.iter();
    for (at, c) in text.char_indices() {
        for lower in c.to_lowercase() {
            if pending.next() != Some(&lower) {
                return None;
            }
        }
        if pending.as_slice().is_empty() {
            return Some(at + c.len_utf8());
        }
    }
    None
}

/// The last `n` turns before the newest one.
fn preceding(memory: &ShortTermMemory, n: usize) -> &[Turn] {
    let window = memory.window(n.saturating_add(1));
    &window[..window.len().saturating_sub(1)]
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    }
}
