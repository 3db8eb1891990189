//! Text lookup tool — answers from a plain-text document.
//!
//! Reads the configured file on every call and returns its whole content
//! when the query occurs in it (case-insensitive). Invoked by name only.

use async_trait::async_trait;
use ctxeng_core::error::ToolError;
use ctxeng_core::tool::{Tool, ToolOutput, ToolResult};
use std::path::PathBuf;

/// Reply when the query is absent from the document.
pub const NOT_FOUND_REPLY: &str = "Não encontrei o termo no texto.";

pub struct TextLookupTool {
    /// The document to search
    pub path: PathBuf,
}

impl TextLookupTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Tool for TextLookupTool {
    fn name(&self) -> &str {
        "text_lookup"
    }

    fn description(&self) -> &str {
        "Read a text document and answer from its content. Use when information from the document is needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The term to look for in the document"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments {
                tool_name: "text_lookup".into(),
                reason: "Missing 'query' argument".into(),
            })?;

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "text_lookup".into(),
                reason: format!("Failed to read {}: {e}", self.path.display()),
            })?;

        if content.to_lowercase().contains(&query.to_lowercase()) {
            Ok(ToolOutput::text(content))
        } else {
            Ok(ToolOutput::text(NOT_FOUND_REPLY))
        }
    }
}
