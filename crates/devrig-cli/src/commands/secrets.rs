//! Secret management commands.
//!
//! Provides `devrig secrets set|get|list|delete|keygen` over the
//! file-backed keystore in `devrig-secrets`.

use anyhow::Context;
use clap::Args;
use console::style;
use devrig_core::env::{self, vars};
use devrig_core::{paths, SecretString};
use devrig_secrets::{master_key, FileSecretStore, KdfParams, KeySource, SecretError, SecretStore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::AppContext;

/// Secrets command arguments.
#[derive(Args)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(clap::Subcommand)]
pub enum SecretsCommand {
    /// Store a secret (prompts for value)
    Set {
        /// Secret name (alphanumeric, underscore, hyphen)
        name: String,

        /// Secret value (if omitted, prompts for hidden input)
        #[arg(long)]
        value: Option<String>,
    },

    /// Retrieve and print a decrypted secret
    Get {
        /// Secret name
        name: String,
    },

    /// List all stored secrets (names only)
    List,

    /// Delete a secret
    Delete {
        /// Secret name
        name: String,
    },

    /// Generate a random master key for DEVRIG_MASTER_KEY
    Keygen,
}

/// Pick the key source: `DEVRIG_MASTER_KEY`, then `DEVRIG_PASSWORD`, then
/// an interactive prompt.
fn key_source(ctx: &AppContext) -> anyhow::Result<KeySource> {
    if let Some(hex_key) = env::get_var(vars::DEVRIG_MASTER_KEY).map(Zeroizing::new) {
        debug!("using master key from environment variable");
        let key = master_key::parse_hex(&hex_key)
            .with_context(|| format!("Invalid {}", vars::DEVRIG_MASTER_KEY))?;
        return Ok(KeySource::MasterKey(key));
    }

    let params = KdfParams::from(&ctx.config.secrets.kdf);
    if let Some(password) = env::get_var(vars::DEVRIG_PASSWORD) {
        return Ok(KeySource::password(password, params));
    }

    let password = SecretString::new(
        rpassword::prompt_password("Keystore password: ").context("Failed to read password")?,
    );
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(KeySource::password(password, params))
}

fn open_store(ctx: &AppContext, key_source: KeySource) -> anyhow::Result<FileSecretStore> {
    let dir = paths::resolve_secrets_dir(ctx.config.secrets.dir.as_deref())
        .context("Failed to resolve secrets directory")?;
    Ok(FileSecretStore::new(dir, key_source))
}

fn describe(err: SecretError) -> anyhow::Error {
    if err.is_wrong_key() {
        anyhow::anyhow!("{err}\nCheck the password or DEVRIG_MASTER_KEY used to write this secret.")
    } else {
        anyhow::Error::new(err)
    }
}

/// Run the secrets command.
pub async fn run(args: SecretsArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match args.command {
        SecretsCommand::Set { name, value } => {
            let secret_value = match value {
                Some(v) => SecretString::new(v),
                None => {
                    let prompt = format!("Enter value for '{name}': ");
                    SecretString::new(
                        rpassword::prompt_password(prompt).context("Failed to read secret")?,
                    )
                }
            };

            if secret_value.is_empty() {
                anyhow::bail!("Secret value must not be empty");
            }

            let store = open_store(ctx, key_source(ctx)?)?;
            store
                .set(&name, secret_value.expose_secret())
                .await
                .map_err(describe)?;

            println!("Secret '{}' stored successfully.", name);
        }

        SecretsCommand::Get { name } => {
            let store = open_store(ctx, key_source(ctx)?)?;
            let secret = store.get(&name).await.map_err(describe)?;

            println!("{}", secret.expose());
        }

        SecretsCommand::List => {
            let store = open_store(ctx, KeySource::Locked)?;
            let refs = store.list().await?;

            if refs.is_empty() {
                println!("No secrets stored.");
            } else {
                println!(
                    "{:<32} {:<24} {}",
                    style("NAME").bold(),
                    style("UPDATED").bold(),
                    style("KEY").bold()
                );
                println!("{}", "-".repeat(72));
                for r in &refs {
                    let updated = r
                        .updated_at
                        .or(r.created_at)
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let key = r
                        .key_fingerprint
                        .as_deref()
                        .map(|fp| &fp[..fp.len().min(12)])
                        .unwrap_or("-");
                    println!("{:<32} {:<24} {}", r.name, updated, key);
                }
                println!("\n{} secret(s) total.", refs.len());
            }
        }

        SecretsCommand::Delete { name } => {
            let store = open_store(ctx, KeySource::Locked)?;
            store.delete(&name).await?;

            println!("Secret '{}' deleted.", name);
        }

        SecretsCommand::Keygen => {
            let key = master_key::generate_hex();
            println!("{}", key.as_str());
            eprintln!(
                "{} Store this key safely; secrets written with it cannot be read without it.",
                style("!").yellow()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devrig_core::Config;
    use std::path::PathBuf;

    #[test]
    fn test_key_source_reads_master_key_from_env() {
        let ctx = AppContext {
            config: Config::default(),
            config_path: PathBuf::from("devrig.json5"),
        };

        std::env::set_var(vars::DEVRIG_MASTER_KEY, "ab".repeat(32));
        let source = key_source(&ctx).unwrap();
        assert!(matches!(source, KeySource::MasterKey(_)));

        std::env::set_var(vars::DEVRIG_MASTER_KEY, "not-hex");
        let err = key_source(&ctx).unwrap_err();
        assert!(err.to_string().contains(vars::DEVRIG_MASTER_KEY), "{err}");

        std::env::remove_var(vars::DEVRIG_MASTER_KEY);
    }
}
