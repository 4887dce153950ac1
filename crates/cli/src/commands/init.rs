//! `routewise init`: write the default configuration file.

use routewise_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("Config already exists: {}", config_path.display());
        println!("Re-run with --force to overwrite it.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote default config: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Start Ollama and pull a model:  ollama pull llama3");
    println!("  2. Try a query:                    routewise chat -m \"What are the admission requirements?\"");
    println!("  3. Serve the HTTP API:             routewise serve");

    Ok(())
}
