use ctxeng_agent::GenerationSettings;
use ctxeng_config::AppConfig;

use super::GraphChoice;

/// Print a graph's nodes, edges, entry, and terminals.
///
/// Describing needs no provider; the graph is compiled but never run.
pub async fn describe(choice: GraphChoice) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let graph = choice.build(
        None,
        GenerationSettings::from_app_config(&config),
        config.graph.max_steps,
    )?;
    println!("{}", serde_json::to_string_pretty(&graph.describe())?);
    Ok(())
}
