//! `routewise classify`: show the routing decision for a query.

use routewise_agent::SelectionPolicy;
use routewise_config::AppConfig;

pub async fn run(query: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let decision = SelectionPolicy::from_config(&config).classify(query, &[]);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!("Category: {}", decision.category);
    println!("Phase:    {:?}", decision.phase);
    for (category, score) in &decision.scores {
        println!("  {category:<14} {score}");
    }

    Ok(())
}
