//! ctxeng CLI — the main entry point.
//!
//! Commands:
//! - `onboard`   — Write a default config file
//! - `chat`      — Interactive session (one line per turn)
//! - `ask`       — Answer a single message
//! - `tools`     — List registered tools
//! - `invoke`    — Call one tool directly with JSON arguments
//! - `graph`     — Print a prebuilt graph's structure
//! - `knowledge` — Inspect the knowledge store
//! - `config`    — Show, locate, or validate configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::GraphChoice;

#[derive(Parser)]
#[command(
    name = "ctxeng",
    about = "ctxeng — tools, knowledge, and memory around a single decision loop",
    version
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
    /// Write a default config file
    Onboard,

    /// Start an interactive session
    Chat {
        /// Answer turns with a prebuilt graph instead of the router
        #[arg(short, long, value_enum)]
        graph: Option<GraphChoice>,

        /// Register a text_lookup tool over this file
        #[arg(short, long)]
        document: Option<PathBuf>,
    },

    /// Answer a single message and exit
    Ask {
        /// The message to answer
        #[arg(short, long)]
        message: String,

        #[arg(short, long, value_enum)]
        graph: Option<GraphChoice>,

        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Print the full turn outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered tools as JSON descriptors
    Tools {
        #[arg(short, long)]
        document: Option<PathBuf>,
    },

    /// Invoke a tool by name
    Invoke {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        input: String,

        #[arg(short, long)]
        document: Option<PathBuf>,
    },

    /// Print the structure of a prebuilt graph as JSON
    Graph {
        #[arg(value_enum)]
        name: GraphChoice,
    },

    /// Inspect the knowledge store
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum KnowledgeCommand {
    /// List stored facts in registration order
    List,
    /// Show the fact a query would retrieve
    Search { query: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration (API key omitted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
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
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { graph, document } => commands::chat::run(graph, document).await?,
        Commands::Ask {
            message,
            graph,
            document,
            json,
        } => commands::chat::ask(&message, graph, document, json).await?,
        Commands::Tools { document } => commands::tools::list(document).await?,
        Commands::Invoke {
            tool,
            input,
            document,
        } => commands::tools::invoke(&tool, &input, document).await?,
        Commands::Graph { name } => commands::graph::describe(name).await?,
        Commands::Knowledge { command } => match command {
            KnowledgeCommand::List => commands::knowledge::list().await?,
            KnowledgeCommand::Search { query } => commands::knowledge::search(&query).await?,
        },
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config_cmd::show().await?,
            ConfigCommand::Path => commands::config_cmd::path().await?,
            ConfigCommand::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
