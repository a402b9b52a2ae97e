//! Path resolution utilities.
//!
//! Everything devrig persists lives under a single base directory,
//! `~/.devrig` unless `DEVRIG_HOME` points elsewhere.

use crate::env::{self, vars};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the devrig base directory (`$DEVRIG_HOME` or `~/.devrig`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(vars::DEVRIG_HOME) {
        return Ok(expand_tilde(&home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".devrig"))
}

/// Get the main config file path (`~/.devrig/devrig.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("devrig.json5"))
}

/// Get the keystore directory (`~/.devrig/secrets`).
pub fn secrets_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("secrets"))
}

/// Resolve the keystore directory, honoring an explicit override first.
pub fn resolve_secrets_dir(configured: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env::get_var(vars::DEVRIG_SECRETS_DIR) {
        return Ok(expand_tilde(&dir));
    }
    match configured {
        Some(dir) => Ok(expand_tilde(&dir.to_string_lossy())),
        None => secrets_dir(),
    }
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_under_base() {
        let base = base_dir().unwrap();
        let file = config_file().unwrap();
        assert!(file.starts_with(&base));
        assert!(file.ends_with("devrig.json5"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/keys");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.ends_with("keys"));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/var/lib/devrig"), PathBuf::from("/var/lib/devrig"));
        assert_eq!(expand_tilde("relative/~/dir"), PathBuf::from("relative/~/dir"));
    }

    #[test]
    fn test_resolve_secrets_dir_prefers_configured() {
        if env::get_var(vars::DEVRIG_SECRETS_DIR).is_some() {
            return;
        }
        let dir = resolve_secrets_dir(Some(Path::new("/tmp/devrig-keys"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/devrig-keys"));
    }
}
