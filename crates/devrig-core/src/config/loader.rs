//! Configuration loading and persistence.

use super::Config;
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Smallest Argon2 memory cost accepted, per lane.
const MIN_KDF_MEMORY_PER_LANE: u32 = 8;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to a JSON5-compatible string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // JSON is valid JSON5; json5 has no serializer of its own.
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let kdf = &self.secrets.kdf;
        if kdf.iterations == 0 {
            errors.push("secrets.kdf.iterations must be greater than 0".to_string());
        }
        if kdf.parallelism == 0 {
            errors.push("secrets.kdf.parallelism must be greater than 0".to_string());
        } else if kdf.memory_kib < MIN_KDF_MEMORY_PER_LANE * kdf.parallelism {
            errors.push(format!(
                "secrets.kdf.memory_kib must be at least {} for parallelism {}, got {}",
                MIN_KDF_MEMORY_PER_LANE * kdf.parallelism,
                kdf.parallelism,
                kdf.memory_kib
            ));
        }

        if self.process.max_output_bytes == 0 {
            errors.push("process.max_output_bytes must be greater than 0".to_string());
        }
        if self.process.timeout_secs == Some(0) {
            errors.push("process.timeout_secs must be greater than 0 when set".to_string());
        }

        if self.stream.max_frame_bytes == Some(0) {
            errors.push("stream.max_frame_bytes must be greater than 0 when set".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist. Environment overrides are applied either way.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve the config file location: explicit path, then `DEVRIG_CONFIG`,
    /// then `~/.devrig/devrig.json5`.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = env::get_var(vars::DEVRIG_CONFIG) {
            return Ok(paths::expand_tilde(&path));
        }
        paths::config_file()
    }

    /// Apply `DEVRIG_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = env::get_var(vars::DEVRIG_SECRETS_DIR) {
            self.secrets.dir = Some(paths::expand_tilde(&dir));
        }
        if let Some(raw) = env::get_var(vars::DEVRIG_RUN_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.process.timeout_secs = Some(secs),
                _ => warn!(value = %raw, "ignoring invalid {}", vars::DEVRIG_RUN_TIMEOUT),
            }
        }
    }
}
