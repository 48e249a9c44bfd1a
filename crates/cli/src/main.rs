//! Placement assistant CLI
//!
//! Ingests the placement corpus and answers questions over it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, MatchCommand, StatsCommand};
use placement_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Placement assistant - grounded answers over the placement corpus
#[derive(Parser, Debug)]
#[command(name = "placement")]
#[command(about = "Grounded question answering over placement policy documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PLACEMENT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PLACEMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true, env = "PLACEMENT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "PLACEMENT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, chunk and embed the corpus into the index
    Ingest(IngestCommand),

    /// Answer a question from the corpus
    Ask(AskCommand),

    /// Show persisted index statistics
    Stats(StatsCommand),

    /// Score a resume against a job description
    Match(MatchCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    let explicit_config = cli.config.clone();
    let mut config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // A --config flag names a file the environment pass never saw
    if let Some(path) = explicit_config {
        config = config.merge_yaml(&path)?;
        if let Some(provider) = cli.provider {
            config.provider = provider;
        }
        if let Some(model) = cli.model {
            config.model = model;
        }
    }

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Placement assistant starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);
    tracing::debug!(
        "Embeddings: {} ({})",
        config.embedding_provider,
        config.embedding_model
    );

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Match(_) => "match",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Match(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
