use ctxeng_config::AppConfig;
use ctxeng_core::knowledge::KnowledgeBackend;

use super::build_knowledge;

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = build_knowledge(&config)?;

    let entries = store.entries().await?;
    if entries.is_empty() {
        println!("Knowledge store is empty.");
        return Ok(());
    }

    println!("{} facts:", entries.len());
    for entry in entries {
        println!("  {:<12} {}", entry.key, entry.value);
    }
    Ok(())
}

pub async fn search(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = build_knowledge(&config)?;

    match store.search(query).await? {
        Some(value) => println!("{value}"),
        None => println!("No fact matches '{query}'."),
    }
    Ok(())
}
