use ctxeng_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("ctxeng — setup");
    println!();

    let config_dir = AppConfig::config_dir();
    std::fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        println!("   Edit it directly or delete it to re-run setup.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    tracing::info!(path = %config_path.display(), "Default config written");

    println!("Created config at {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set your API key: export OPENAI_API_KEY=sk-...");
    println!("     (or set provider.kind = \"none\" to run offline)");
    println!("  2. Start a session: ctxeng chat");
    Ok(())
}
