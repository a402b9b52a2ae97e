//! # devrig-core
//!
//! Shared building blocks for the devrig crates:
//!
//! - **Configuration**: JSON5 config schema, loading, validation, and saving
//! - **Paths**: resolution of `~/.devrig` and the files beneath it
//! - **Environment**: names and lookup of `DEVRIG_*` variables
//! - **Secrets**: a zeroizing string type for passwords and plaintext values

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

pub use config::Config;
pub use error::ConfigError;
pub use secret::SecretString;
