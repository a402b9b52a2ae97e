//! devrig command-line interface.

pub mod commands;
pub mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use devrig_core::Config;
use std::path::{Path, PathBuf};

pub use logging::init_logging;

/// devrig - local development container tooling
#[derive(Parser)]
#[command(name = "devrig")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "DEVRIG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Manage encrypted secrets
    Secrets(commands::secrets::SecretsArgs),

    /// Run a command under supervision
    Run(commands::run::RunArgs),

    /// Split a multiplexed container output stream into stdout and stderr
    Demux(commands::demux::DemuxArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Loaded configuration and where it came from.
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
}

/// Resolve and load the configuration file; defaults when it is missing.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppContext> {
    let config_path = Config::resolve_path(explicit)?;
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    Ok(AppContext {
        config,
        config_path,
    })
}

/// Run the CLI with the given arguments. Returns the process exit status.
pub async fn run(cli: Cli, ctx: AppContext) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Secrets(args) => commands::secrets::run(args, &ctx).await.map(|()| 0),
        Commands::Run(args) => commands::run::run(args, &ctx).await,
        Commands::Demux(args) => commands::demux::run(args, &ctx).await.map(|()| 0),
        Commands::Config(args) => commands::config::run(args, &ctx).await.map(|()| 0),
        Commands::Version => {
            println!("devrig {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}
