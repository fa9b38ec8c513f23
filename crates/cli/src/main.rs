//! uatkit CLI - Main Entry Point
//!
//! Parses markdown acceptance criteria, shows the planned checks, and runs
//! them against a live app through configurable driver programs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

use commands::{parse, plan, run};
use config::{UatConfig, DEFAULT_CONFIG_FILE};

/// uatkit - acceptance criteria to automated UI checks
#[derive(Parser)]
#[command(name = "uatkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "UATKIT_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sections, classified criteria and flows of a document
    Parse(parse::ParseArgs),

    /// Dry run: mapped checks, confidence and missing test hooks
    Plan(plan::PlanArgs),

    /// Execute criteria and flows and write the report
    Run(run::RunArgs),

    /// Print or write the effective configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = UatConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Parse(args) => parse::execute(args, cli.format).await?,
        Commands::Plan(args) => plan::execute(args, &config, cli.format).await?,
        Commands::Run(args) => {
            let failed = run::execute(args, &config, cli.format).await?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Config(args) => commands::config::execute(args, &config, &cli.config, cli.format).await?,
    }

    Ok(())
}
