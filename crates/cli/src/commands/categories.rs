//! `routewise categories`: list configured responder categories.

use routewise_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("{:<14} {:<28} {:<12} KEYWORDS", "ID", "NAME", "MODEL");
    for category in &config.categories {
        println!(
            "{:<14} {:<28} {:<12} {}",
            category.id,
            category.name,
            config.model_for(category),
            category.keywords.len()
        );
    }

    Ok(())
}
