//! End-to-end integration tests for the ctxeng orchestration core.
//!
//! These tests exercise the full pipeline from user input to agent output:
//! short-term memory, routing, tool execution, knowledge retrieval,
//! generation fallback, and graph-mode turns.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ctxeng_agent::graphs::{self, GREETING_REPLY};
use ctxeng_agent::{Action, GenerationSettings, Orchestrator, OrchestratorConfig};
use ctxeng_config::AppConfig;
use ctxeng_core::error::ProviderError;
use ctxeng_core::event::DomainEvent;
use ctxeng_core::knowledge::KnowledgeBackend;
use ctxeng_core::message::Role;
use ctxeng_core::provider::{GenerationRequest, Provider};
use ctxeng_core::session::ShortTermMemory;
use ctxeng_memory::{DEFAULT_SEED, InMemoryKnowledge};
use ctxeng_tools::default_registry;
use ctxeng_workflow::{ExecutionState, GraphBuilder, Predicate};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<String>>,
    requests: std::sync::Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        if requests.len() >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                requests.len(),
                responses.len()
            );
        }
        let text = responses[requests.len()].clone();
        requests.push(request);
        Ok(text)
    }
}

struct DownProvider;

#[async_trait::async_trait]
impl Provider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, ProviderError> {
        Err(ProviderError::RateLimited {
            retry_after_secs: 30,
        })
    }
}

fn orchestrator_with(facts: &[&str]) -> (Orchestrator, Arc<InMemoryKnowledge>) {
    let tools = Arc::new(default_registry().unwrap());
    let knowledge = Arc::new(InMemoryKnowledge::with_facts(facts.iter().copied()).unwrap());
    let orchestrator = Orchestrator::new(tools, knowledge.clone(), OrchestratorConfig::default());
    (orchestrator, knowledge)
}

// ── E2E: Routing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_doubling_question_uses_tool() {
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let (orchestrator, _) = orchestrator_with(DEFAULT_SEED);
    let orchestrator = orchestrator.with_provider(provider.clone());
    let mut memory = ShortTermMemory::new();

    let outcome = orchestrator
        .handle_turn(&mut memory, "Qual é o dobro de 8?")
        .await
        .unwrap();

    assert!(
        matches!(outcome.action, Some(Action::InvokeTool { ref name, .. }) if name == "double_number")
    );
    assert!(outcome.response.contains("16"));
    assert!(!outcome.degraded);
    assert_eq!(provider.calls(), 0);

    let turns = memory.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "Qual é o dobro de 8?");
    assert_eq!(turns[1].role, Role::Agent);
    assert_eq!(turns[1].text, outcome.response);
    assert!(turns[0].sequence < turns[1].sequence);
}

#[tokio::test]
async fn e2e_tool_outranks_matching_fact() {
    let (orchestrator, _) = orchestrator_with(&["2 é o único primo par."]);
    let mut memory = ShortTermMemory::new();

    let outcome = orchestrator.handle_turn(&mut memory, "2 + 2").await.unwrap();

    assert!(
        matches!(outcome.action, Some(Action::InvokeTool { ref name, .. }) if name == "calculator")
    );
    assert_eq!(outcome.response, "2 + 2 = 4");
}

#[tokio::test]
async fn e2e_stored_fact_answers_without_generation() {
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let (orchestrator, _) = orchestrator_with(DEFAULT_SEED);
    let orchestrator = orchestrator.with_provider(provider.clone());
    let mut memory = ShortTermMemory::new();

    let outcome = orchestrator
        .handle_turn(&mut memory, "O que você sabe sobre Python?")
        .await
        .unwrap();

    assert_eq!(outcome.response, "Python é uma linguagem de programação popular.");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn e2e_fallback_generation_sees_recent_turns() {
    let provider = Arc::new(ScriptedProvider::new(&["Paris é a capital da França."]));
    let (orchestrator, _) = orchestrator_with(DEFAULT_SEED);
    let orchestrator = orchestrator.with_provider(provider.clone());
    let mut memory = ShortTermMemory::new();

    orchestrator.handle_turn(&mut memory, "3 * 3").await.unwrap();
    let outcome = orchestrator
        .handle_turn(&mut memory, "Qual a capital da França?")
        .await
        .unwrap();

    assert_eq!(outcome.action, Some(Action::Fallback));
    assert_eq!(outcome.response, "Paris é a capital da França.");

    let request = provider.last_request();
    assert_eq!(request.prompt, "Qual a capital da França?");
    let context: Vec<&str> = request.context.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(context, vec!["3 * 3", "3 * 3 = 9"]);
    assert_eq!(memory.len(), 4);
}

#[tokio::test]
async fn e2e_generator_failure_degrades_to_fallback_message() {
    let (orchestrator, _) = orchestrator_with(&[]);
    let orchestrator = orchestrator.with_provider(Arc::new(DownProvider));
    let mut events = orchestrator.events().subscribe();
    let mut memory = ShortTermMemory::new();

    let outcome = orchestrator
        .handle_turn(&mut memory, "Conte uma piada")
        .await
        .unwrap();

    assert!(outcome.degraded);
    assert_eq!(outcome.response, OrchestratorConfig::default().fallback_message);
    assert_eq!(memory.len(), 2);

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event.as_ref(), DomainEvent::ErrorOccurred { .. }) {
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn e2e_failing_tool_keeps_session_alive() {
    let (orchestrator, _) = orchestrator_with(&[]);
    let mut memory = ShortTermMemory::new();

    let failed = orchestrator.handle_turn(&mut memory, "1 / 0").await.unwrap();
    assert!(failed.degraded);
    assert!(failed.response.contains("calculator"));

    let next = orchestrator.handle_turn(&mut memory, "1 + 1").await.unwrap();
    assert_eq!(next.response, "1 + 1 = 2");
    assert_eq!(memory.len(), 4);
}

// ── E2E: Long-term memory ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_remembered_fact_answers_later_turn() {
    let (orchestrator, knowledge) = orchestrator_with(&[]);
    let mut memory = ShortTermMemory::new();

    let stored = orchestrator
        .handle_turn(
            &mut memory,
            "adicionar memória: LangGraph é uma biblioteca para grafos de agentes.",
        )
        .await
        .unwrap();
    assert_eq!(stored.remembered.as_deref(), Some("langgraph"));
    assert!(knowledge.get("LangGraph").await.unwrap().is_some());

    let answer = orchestrator
        .handle_turn(&mut memory, "Explique o langgraph")
        .await
        .unwrap();
    assert_eq!(
        answer.response,
        "LangGraph é uma biblioteca para grafos de agentes."
    );
}

#[tokio::test]
async fn e2e_sessions_are_independent() {
    let (orchestrator, _) = orchestrator_with(&[]);
    let mut first = ShortTermMemory::new();
    let mut second = ShortTermMemory::new();

    orchestrator.handle_turn(&mut first, "2 + 2").await.unwrap();
    orchestrator.handle_turn(&mut first, "2 * 5").await.unwrap();
    orchestrator.handle_turn(&mut second, "Qual é o dobro de 3?").await.unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 2);
    assert_ne!(first.id, second.id);
}

// ── E2E: Graph mode ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_graph_greeting_never_calls_generator() {
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let graph = graphs::classify_and_respond(
        Some(provider.clone()),
        GenerationSettings::default(),
        25,
    )
    .unwrap();
    let (orchestrator, _) = orchestrator_with(&[]);
    let orchestrator = orchestrator
        .with_provider(provider.clone())
        .with_graph(Arc::new(graph));
    let mut memory = ShortTermMemory::new();

    let outcome = orchestrator.handle_turn(&mut memory, "Oi!").await.unwrap();

    assert_eq!(outcome.response, GREETING_REPLY);
    assert_eq!(outcome.graph_path, vec!["classify", "greet"]);
    assert!(outcome.action.is_none());
    assert_eq!(provider.calls(), 0);
    assert_eq!(memory.len(), 2);
}

#[tokio::test]
async fn e2e_graph_question_branch_generates() {
    let provider = Arc::new(ScriptedProvider::new(&["Grafos modelam fluxos de agentes."]));
    let graph = graphs::classify_and_respond(
        Some(provider.clone()),
        GenerationSettings::default(),
        25,
    )
    .unwrap();
    let (orchestrator, _) = orchestrator_with(&[]);
    let orchestrator = orchestrator.with_graph(Arc::new(graph));
    let mut memory = ShortTermMemory::new();

    let outcome = orchestrator
        .handle_turn(&mut memory, "Para que servem grafos?")
        .await
        .unwrap();

    assert_eq!(outcome.response, "Grafos modelam fluxos de agentes.");
    assert_eq!(outcome.graph_path, vec!["classify", "answer"]);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_runaway_graph_is_stopped_and_surfaced() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);

    let graph = GraphBuilder::new("runaway")
        .with_max_steps(5)
        .add_fn_node("spin", move |state| {
            counter.fetch_add(1, Ordering::SeqCst);
            state
        })
        .add_fn_node("done", |state| state.with("response", "fim"))
        .add_conditional_edge("spin", "done", Predicate::field_equals("stop", true))
        .add_edge("spin", "spin")
        .set_entry("spin")
        .set_terminal("done")
        .build()
        .unwrap();

    let (orchestrator, _) = orchestrator_with(&[]);
    let orchestrator = orchestrator.with_graph(Arc::new(graph));
    let mut memory = ShortTermMemory::new();

    let err = orchestrator
        .handle_turn(&mut memory, "qualquer coisa")
        .await
        .unwrap_err();

    assert!(matches!(err, ctxeng_core::Error::Graph(_)));
    assert!(err.to_string().contains("5"));
    assert_eq!(invocations.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn e2e_graph_run_directly_reports_path() {
    let graph = graphs::classify_and_respond(None, GenerationSettings::default(), 25).unwrap();
    let run = graph
        .run(ExecutionState::new().with(graphs::INPUT, "hello"))
        .await
        .unwrap();
    assert_eq!(run.steps, 2);
    assert_eq!(run.terminal(), "greet");
}

// ── E2E: Tools surface ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_tool_descriptors_and_direct_invocation() {
    let registry = default_registry().unwrap();

    let descriptors = registry.descriptors();
    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["calculator", "double_number"]);
    assert!(descriptors.iter().all(|d| d.input_schema["type"] == "object"));

    let output = registry
        .invoke("calculator", serde_json::json!({"expression": "(2 + 3) * 4"}))
        .await
        .unwrap();
    assert_eq!(output.output, "(2 + 3) * 4 = 20");

    let missing = registry
        .invoke("does_not_exist", serde_json::json!({}))
        .await
        .unwrap_err();
    assert_eq!(missing.tool_name(), "does_not_exist");

    let slow = registry
        .invoke_with_timeout(
            "double_number",
            serde_json::json!({"number": 21}),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(slow.output.contains("42"));
}

// ── E2E: Configuration ───────────────────────────────────────────────────

#[test]
fn e2e_config_file_drives_orchestrator_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[provider]
kind = "none"

[agent]
context_window = 3
fallback_message = "Sem resposta."
remember_directives = ["lembre:"]

[graph]
max_steps = 7

[knowledge]
seed = ["Rust é uma linguagem de sistemas."]
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    config.validate().unwrap();
    let settings = OrchestratorConfig::from_app_config(&config);

    assert_eq!(settings.context_window, 3);
    assert_eq!(settings.fallback_message, "Sem resposta.");
    assert_eq!(settings.remember_directives, vec!["lembre:".to_string()]);
    assert_eq!(config.graph.max_steps, 7);
    assert_eq!(
        config.knowledge.seed.as_deref(),
        Some(&["Rust é uma linguagem de sistemas.".to_string()][..])
    );
}
