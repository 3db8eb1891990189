use ctxeng_config::AppConfig;
use std::path::PathBuf;

use super::build_tools;

pub async fn list(document: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let registry = build_tools(&config, document)?;
    println!("{}", serde_json::to_string_pretty(&registry.descriptors())?);
    Ok(())
}

/// Invoke one tool by name and print its result as JSON.
///
/// Tool failures are printed as `{"error": ...}`, not returned; only bad
/// arguments on the command line are errors.
pub async fn invoke(
    tool: &str,
    input: &str,
    document: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let registry = build_tools(&config, document)?;

    let arguments: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| format!("--input must be a JSON object: {e}"))?;

    let rendered = match registry.invoke(tool, arguments).await {
        Ok(output) => serde_json::to_value(&output)?,
        Err(e) => serde_json::json!({
            "error": {
                "tool": e.tool_name(),
                "message": e.message(),
            }
        }),
    };
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
