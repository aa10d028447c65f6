//! Newsdesk CLI
//!
//! Main entry point for the newsdesk command-line tool: ingest collector
//! batches, rebuild the index, and query it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, BuildCommand, IngestCommand, SearchCommand, ServeCommand, StatusCommand,
    TrendingCommand,
};
use newsdesk_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Newsdesk - semantic search, trending, and cited reports over news
#[derive(Parser, Debug)]
#[command(name = "newsdesk")]
#[command(about = "Semantic news search with cited reports", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "NEWSDESK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "NEWSDESK_CONFIG")]
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// LLM provider for reports (ollama, gemini, none)
    #[arg(short, long, global = true, env = "NEWSDESK_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "NEWSDESK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a collector batch file or directory
    Ingest(IngestCommand),

    /// Run one build cycle and promote the result
    Build(BuildCommand),

    /// Semantic search over the active index
    Search(SearchCommand),

    /// Trending articles by region and category
    Trending(TrendingCommand),

    /// Search and write a cited report
    Ask(AskCommand),

    /// Rebuild on a schedule until interrupted
    Serve(ServeCommand),

    /// Show the active version, retained versions, and bucket sizes
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.json_logs)?;

    tracing::info!("Newsdesk CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Build(_) => "build",
        Commands::Search(_) => "search",
        Commands::Trending(_) => "trending",
        Commands::Ask(_) => "ask",
        Commands::Serve(_) => "serve",
        Commands::Status(_) => "status",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Build(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Trending(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
