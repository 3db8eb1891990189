//! Built-in tool implementations for ctxeng.
//!
//! Tools give the agent something authoritative to say: arithmetic,
//! doubling, and lookups in a local text document. The first two recognise
//! their own input shape, so the router can pick them from free text.

pub mod calculator;
pub mod double_number;
pub mod text_lookup;

use ctxeng_core::error::RegistryError;
use ctxeng_core::tool::ToolRegistry;
use std::path::PathBuf;

pub use calculator::CalculatorTool;
pub use double_number::DoubleNumberTool;
pub use text_lookup::TextLookupTool;

/// Create a registry with the pattern-triggered built-in tools.
///
/// Order matters: when several triggers match, the earlier tool wins.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CalculatorTool))?;
    registry.register(Box::new(DoubleNumberTool))?;
    Ok(registry)
}

/// Like `default_registry`, plus a `text_lookup` tool over `document`.
pub fn registry_with_document(document: impl Into<PathBuf>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = default_registry()?;
    registry.register(Box::new(TextLookupTool::new(document)))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_order() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.names(), vec!["calculator", "double_number"]);
    }

    #[test]
    fn document_registry_adds_lookup() {
        let registry = registry_with_document("info.txt").unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("text_lookup").is_some());
    }

    #[tokio::test]
    async fn default_registry_dispatches_by_pattern() {
        let registry = default_registry().unwrap();
        let doubled = registry.invoke_if_pattern_matches("Qual é o dobro de 8?").await.unwrap();
        assert_eq!(doubled.unwrap().output, "O dobro de 8 é 16");

        let sum = registry.invoke_if_pattern_matches("2 + 2").await.unwrap();
        assert_eq!(sum.unwrap().output, "2 + 2 = 4");

        assert!(registry.invoke_if_pattern_matches("o que é python?").await.is_none());
    }

    #[tokio::test]
    async fn deeply_nested_expression_is_a_tool_error() {
        let registry = default_registry().unwrap();
        let input = format!("calcule {}1 + 1{}", "(".repeat(200_000), ")".repeat(200_000));

        let err = registry.invoke_if_pattern_matches(&input).await.unwrap().unwrap_err();
        assert_eq!(err.tool_name(), "calculator");
        assert_eq!(err.message(), calculator::EvalError::TooDeep.to_string());
    }
}
