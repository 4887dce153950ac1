//! `routewise chat`: interactive or single-message chat mode.

use std::io::Write;

use routewise_agent::Orchestrator;
use routewise_config::AppConfig;
use routewise_core::message::SessionId;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let providers = routewise_providers::router::build_from_config(&config);
    let orchestrator = Orchestrator::from_config(&config, &providers).await?;
    let session_id = session.map(SessionId::from);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let outcome = orchestrator.route_query(&msg, session_id).await;
        eprint!("\r              \r");
        let outcome = outcome?;
        println!("[{}] {}", outcome.category, outcome.response);
        eprintln!("  session: {}", outcome.session_id);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Routewise: Interactive Mode");
    println!();
    println!("  Provider:   {}", config.default_provider);
    println!("  Model:      {}", config.default_model);
    println!(
        "  Categories: {}",
        config
            .categories
            .iter()
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let session_id = orchestrator.sessions().create_session(session_id).await;
    println!("  Session:    {session_id}");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match orchestrator.route_query(line, Some(session_id.clone())).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                for text in outcome.response.lines() {
                    println!("  {} > {text}", outcome.category);
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
