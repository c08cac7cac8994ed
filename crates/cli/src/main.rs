//! VCraft CLI
//!
//! Main entry point for the vcraft command-line tool.
//! Builds and queries the VC knowledge index used to ground pitch feedback.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, InitCommand, QueryCommand, StatsCommand};
use std::path::PathBuf;
use vcraft_core::{config::AppConfig, logging, AppResult};

/// VCraft - knowledge retrieval for evidence-based pitch feedback
#[derive(Parser, Debug)]
#[command(name = "vcraft")]
#[command(about = "Knowledge retrieval for evidence-based pitch feedback", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./vcraft.yaml if present)
    #[arg(short, long, global = true, env = "VCRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge base directory of *.txt documents
    #[arg(long, global = true)]
    knowledge_base: Option<PathBuf>,

    /// Directory holding the persisted vector index
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index the knowledge base and save the vector index
    Init(InitCommand),

    /// Retrieve knowledge relevant to a query
    Query(QueryCommand),

    /// Ask a question grounded in the knowledge base
    Ask(AskCommand),

    /// Show knowledge base and index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file, then environment
    let config = AppConfig::load(cli.config.as_deref())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.knowledge_base,
        cli.index,
        cli.log_level,
        cli.verbose,
        cli.json_logs,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(
        config.log_level.as_deref(),
        config.log_format(),
        config.no_color,
    )?;

    tracing::info!("VCraft CLI starting");
    tracing::debug!("Knowledge base: {:?}", config.knowledge_base_path);
    tracing::debug!("Index: {:?}", config.index_path);
    tracing::debug!(
        "Embedding: {} ({}, {} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    let command_name = match &cli.command {
        Commands::Init(_) => "init",
        Commands::Query(_) => "query",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
    };
    let span = tracing::info_span!("command", name = command_name);
    let _guard = span.enter();

    let result = match cli.command {
        Commands::Init(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_flags() {
        let cli = Cli::parse_from([
            "vcraft",
            "--knowledge-base",
            "docs",
            "query",
            "what is a SAFE",
            "-k",
            "3",
            "--json",
        ]);

        assert_eq!(cli.knowledge_base, Some(PathBuf::from("docs")));
        match cli.command {
            Commands::Query(cmd) => {
                assert_eq!(cmd.text, "what is a SAFE");
                assert_eq!(cmd.top_k, Some(3));
                assert!(cmd.json);
                assert!(cmd.prefix.is_none());
            }
            other => panic!("expected query, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vcraft", "stats", "--json-logs", "-v"]);
        assert!(cli.json_logs);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Stats(_)));
    }
}
