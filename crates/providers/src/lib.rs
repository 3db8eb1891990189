//! External model collaborators for ctxeng.
//!
//! All providers implement the `ctxeng_core::Provider` trait.
//! `build_from_config` picks one based on configuration.

pub mod factory;
pub mod openai_compat;

pub use factory::build_from_config;
pub use openai_compat::OpenAiCompatProvider;
