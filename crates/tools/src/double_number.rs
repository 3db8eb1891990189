//! Doubling tool — doubles a number.
//!
//! Triggers on phrases like `"Qual é o dobro de 8?"` or `"double 21"`.

use async_trait::async_trait;
use ctxeng_core::error::ToolError;
use ctxeng_core::tool::{Tool, ToolOutput, ToolResult};

use crate::calculator::format_number;

/// Phrases that introduce the number to double, checked in order.
const TRIGGER_PHRASES: &[&str] = &["dobro de", "dobro do", "double of", "double"];

pub struct DoubleNumberTool;

#[async_trait]
impl Tool for DoubleNumberTool {
    fn name(&self) -> &str {
        "double_number"
    }

    fn description(&self) -> &str {
        "Double a number. Use when the user asks for the double of a value."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "number": {
                    "type": "number",
                    "description": "The number to double"
                }
            },
            "required": ["number"]
        })
    }

    fn trigger(&self, input: &str) -> Option<serde_json::Value> {
        let lower = input.to_lowercase();
        TRIGGER_PHRASES.iter().find_map(|phrase| {
            lower
                .match_indices(phrase)
                .find_map(|(at, _)| leading_number(&lower[at + phrase.len()..]))
                .map(|number| serde_json::json!({"number": number}))
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let number = arguments["number"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments {
                tool_name: "double_number".into(),
                reason: "Missing numeric 'number' argument".into(),
            })?;

        let doubled = number * 2.0;
        Ok(ToolOutput {
            output: format!("O dobro de {} é {}", format_number(number), format_number(doubled)),
            data: Some(serde_json::json!({"result": doubled})),
        })
    }
}

/// Parse the number at the start of `text`, skipping leading spaces.
///
/// Accepts a sign and either `.` or `,` as the decimal separator.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || c == ',' || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let raw = text[..end].trim_end_matches(['.', ',']).replace(',', ".");
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_portuguese_phrase() {
        let tool = DoubleNumberTool;
        let args = tool.trigger("Qual é o dobro de 8?").unwrap();
        assert_eq!(args["number"], 8.0);
    }

    #[test]
    fn trigger_english_phrase_and_decimal_comma() {
        let tool = DoubleNumberTool;
        assert_eq!(tool.trigger("double 21 please").unwrap()["number"], 21.0);
        assert_eq!(tool.trigger("o dobro de 2,5").unwrap()["number"], 2.5);
    }

    #[test]
    fn trigger_skips_phrase_without_number() {
        let tool = DoubleNumberTool;
        assert_eq!(tool.trigger("double-check: double 4").unwrap()["number"], 4.0);
        assert_eq!(tool.trigger("o dobro de nada, o dobro de 3").unwrap()["number"], 3.0);
    }

    #[test]
    fn no_trigger_without_number() {
        let tool = DoubleNumberTool;
        assert!(tool.trigger("qual é o dobro?").is_none());
        assert!(tool.trigger("2 + 2").is_none());
    }

    #[tokio::test]
    async fn execute_doubles() {
        let tool = DoubleNumberTool;
        let result = tool.execute(serde_json::json!({"number": 8})).await.unwrap();
        assert_eq!(result.output, "O dobro de 8 é 16");
        assert_eq!(result.data.unwrap()["result"], 16.0);
    }

    #[tokio::test]
    async fn execute_rejects_missing_number() {
        let tool = DoubleNumberTool;
        let err = tool.execute(serde_json::json!({"number": "oito"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
