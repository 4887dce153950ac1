//! Routewise CLI: the main entry point.
//!
//! Commands:
//! - `init`      : Write a default config file
//! - `serve`     : Start the HTTP gateway
//! - `chat`      : Interactive or single-message chat
//! - `classify`  : Show which category a query routes to
//! - `categories`: List configured categories

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "routewise",
    about = "Routewise: keyword-routed, knowledge-augmented chat orchestrator",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat through the orchestrator
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show the routing decision for a query without calling a responder
    Classify {
        /// The query to classify
        query: String,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured responder categories
    Categories,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { message, session } => commands::chat::run(message, session).await?,
        Commands::Classify { query, json } => commands::classify::run(&query, json).await?,
        Commands::Categories => commands::categories::run().await?,
    }

    Ok(())
}
