//! Prebuilt execution graphs for graph-mode turns.
//!
//! Graph-mode turns seed the state with [`INPUT`] and [`CONTEXT`] and read
//! the answer back from [`RESPONSE`]. Nodes that call the text generator
//! fail with a `NodeError` when it is missing or errors; the orchestrator
//! turns that into its fallback reply.

use async_trait::async_trait;
use ctxeng_core::message::Turn;
use ctxeng_core::provider::Provider;
use ctxeng_workflow::{
    CompiledGraph, ExecutionState, GraphBuilder, GraphError, Node, NodeError, StateSchema,
};
use std::sync::Arc;

use crate::generation::{GenerationSettings, generate};

/// The user's input text.
pub const INPUT: &str = "input";
/// The recent turns, as a JSON array of turns.
pub const CONTEXT: &str = "context";
/// The answer shown to the user.
pub const RESPONSE: &str = "response";
/// Classification written by `classify_and_respond`.
pub const KIND: &str = "kind";

pub const GREETING_REPLY: &str = "Olá! Em que posso te ajudar hoje?";

const GREETING_WORDS: &[&str] = &["oi", "olá", "ola", "hello", "hi", "hey"];

type PromptFn = dyn Fn(&ExecutionState) -> String + Send + Sync;

/// A node that asks the text generator and stores the reply in one field.
pub struct GenerateNode {
    provider: Option<Arc<dyn Provider>>,
    settings: GenerationSettings,
    prompt: Box<PromptFn>,
    output: String,
}

impl GenerateNode {
    pub fn new<F>(
        provider: Option<Arc<dyn Provider>>,
        settings: GenerationSettings,
        output: impl Into<String>,
        prompt: F,
    ) -> Self
    where
        F: Fn(&ExecutionState) -> String + Send + Sync + 'static,
    {
        Self {
            provider,
            settings,
            prompt: Box::new(prompt),
            output: output.into(),
        }
    }
}

#[async_trait]
impl Node for GenerateNode {
    async fn run(&self, mut state: ExecutionState) -> Result<ExecutionState, NodeError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| NodeError::new("no text generator configured"))?;

        let context: Vec<Turn> = state
            .get(CONTEXT)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let prompt = (self.prompt)(&state);

        let text = generate(provider.as_ref(), &self.settings, &prompt, &context)
            .await
            .map_err(|e| NodeError::new(e.to_string()))?;
        state.set(self.output.as_str(), text);
        Ok(state)
    }
}

fn input_of(state: &ExecutionState) -> &str {
    state.get_str(INPUT).unwrap_or_default()
}

/// Whether the text contains a greeting word.
pub fn is_greeting(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_WORDS.contains(&word))
}

/// Classify the input as greeting or question, then greet or ask the model.
///
/// `kind` is `"greeting"` or `"question"`. The greeting branch never calls
/// the text generator.
pub fn classify_and_respond(
    provider: Option<Arc<dyn Provider>>,
    settings: GenerationSettings,
    max_steps: usize,
) -> Result<CompiledGraph, GraphError> {
    GraphBuilder::new("classify_and_respond")
        .with_schema(StateSchema::new([INPUT, CONTEXT, KIND, RESPONSE]))
        .with_max_steps(max_steps)
        .add_fn_node("classify", |mut state| {
            let kind = if is_greeting(input_of(&state)) {
                "greeting"
            } else {
                "question"
            };
            state.set(KIND, kind);
            state
        })
        .add_fn_node("greet", |state| state.with(RESPONSE, GREETING_REPLY))
        .add_node(
            "answer",
            GenerateNode::new(provider, settings, RESPONSE, |state| {
                format!("Responda educadamente: {}", input_of(state))
            }),
        )
        .add_conditional_edges(
            "classify",
            KIND,
            [("greeting", "greet"), ("question", "answer")],
        )
        .set_entry("classify")
        .set_terminal("greet")
        .set_terminal("answer")
        .build()
}

/// Generate ideas for the input, weigh them, and pick the best one.
pub fn idea_tree(
    provider: Option<Arc<dyn Provider>>,
    settings: GenerationSettings,
    max_steps: usize,
) -> Result<CompiledGraph, GraphError> {
    GraphBuilder::new("idea_tree")
        .with_schema(StateSchema::new([INPUT, CONTEXT, "ideas", "analysis", RESPONSE]))
        .with_max_steps(max_steps)
        .add_node(
            "generate_ideas",
            GenerateNode::new(provider.clone(), settings.clone(), "ideas", |state| {
                format!(
                    "Gere três ideias diferentes para resolver este problema:\n\n{}",
                    input_of(state)
                )
            }),
        )
        .add_node(
            "analyse",
            GenerateNode::new(provider.clone(), settings.clone(), "analysis", |state| {
                format!(
                    "Analise os prós e contras das ideias abaixo:\n\n{}",
                    state.get_str("ideas").unwrap_or_default()
                )
            }),
        )
        .add_node(
            "choose",
            GenerateNode::new(provider, settings, RESPONSE, |state| {
                format!(
                    "Com base nessa análise, escolha a melhor ideia e justifique:\n\n{}",
                    state.get_str("analysis").unwrap_or_default()
                )
            }),
        )
        .add_edge("generate_ideas", "analyse")
        .add_edge("analyse", "choose")
        .set_entry("generate_ideas")
        .set_terminal("choose")
        .build()
}
