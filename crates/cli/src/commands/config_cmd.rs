use ctxeng_config::AppConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;
    let has_key = config.provider.api_key.take().is_some();

    println!("{}", toml::to_string_pretty(&config)?);
    println!(
        "# API key: {}",
        if has_key { "set (hidden)" } else { "not set" }
    );
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
    Ok(())
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    println!("Configuration is valid.");
    println!("   Provider: {}", config.provider.kind);
    println!("   Model: {}", config.provider.model);
    println!(
        "   API key: {}",
        if config.has_api_key() { "set" } else { "not set" }
    );
    Ok(())
}
