//! Knowledge store implementations for ctxeng.

pub mod in_memory;

pub use in_memory::InMemoryKnowledge;

/// Facts the store ships with when no seed is configured.
pub const DEFAULT_SEED: &[&str] = &[
    "OpenAI é uma empresa de pesquisa em IA.",
    "Python é uma linguagem de programação popular.",
    "Claude é um modelo de linguagem da Anthropic.",
];
