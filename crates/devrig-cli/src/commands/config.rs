//! Configuration management commands.

use clap::Args;
use console::style;
use devrig_core::{Config, ConfigError};

use crate::AppContext;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate the configuration file
    Validate,
}

/// Walk a dot-separated key through a JSON value.
fn lookup<'a>(json: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    key.split('.')
        .try_fold(json, |current, part| current.get(part))
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", ctx.config.to_json5()?);
        }

        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(&ctx.config)?;
            match lookup(&json, &key) {
                Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }

        ConfigCommand::Init { force } => {
            let path = &ctx.config_path;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            Config::default().save(path)?;
            println!("Created config file: {}", path.display());
        }

        ConfigCommand::Path => {
            println!("{}", ctx.config_path.display());
        }

        ConfigCommand::Validate => match Config::load(&ctx.config_path) {
            Ok(config) => match config.validate() {
                Ok(()) => println!("{} Configuration is valid", style("✓").green()),
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            },
            Err(ConfigError::NotFound(path)) => {
                println!(
                    "{} No config file at {}; defaults apply",
                    style("!").yellow(),
                    path.display()
                );
            }
            Err(e) => anyhow::bail!("Failed to load config: {}", e),
        },
    }

    Ok(())
}
