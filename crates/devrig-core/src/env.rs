//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Environment variable names read by devrig.
pub mod vars {
    /// Base directory override (defaults to `~/.devrig`).
    pub const DEVRIG_HOME: &str = "DEVRIG_HOME";

    /// Config file override.
    pub const DEVRIG_CONFIG: &str = "DEVRIG_CONFIG";

    /// Log filter directive, in `EnvFilter` syntax.
    pub const DEVRIG_LOG: &str = "DEVRIG_LOG";

    /// Keystore password for non-interactive use.
    pub const DEVRIG_PASSWORD: &str = "DEVRIG_PASSWORD";

    /// Hex-encoded 32-byte master key; takes precedence over the password.
    pub const DEVRIG_MASTER_KEY: &str = "DEVRIG_MASTER_KEY";

    /// Keystore directory override.
    pub const DEVRIG_SECRETS_DIR: &str = "DEVRIG_SECRETS_DIR";

    /// Default wall-clock timeout for `devrig run`, in seconds.
    pub const DEVRIG_RUN_TIMEOUT: &str = "DEVRIG_RUN_TIMEOUT";
}
