//! Tracing subscriber setup.

use devrig_core::config::{LogFormat, LoggingConfig};
use devrig_core::env::{self, vars};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets that `-v` raises.
const CRATE_TARGETS: &[&str] = &[
    "devrig",
    "devrig_cli",
    "devrig_core",
    "devrig_process",
    "devrig_secrets",
    "devrig_stream",
];

/// Filter directives for the given verbosity and configured level.
///
/// `DEVRIG_LOG` wins over both when set.
pub fn filter_directives(verbose: u8, config: &LoggingConfig) -> String {
    let crate_level = match verbose {
        0 => return config.level.as_str().to_string(),
        1 => "debug",
        _ => "trace",
    };

    let mut directives = vec![config.level.as_str().to_string()];
    directives.extend(CRATE_TARGETS.iter().map(|t| format!("{t}={crate_level}")));
    directives.join(",")
}

/// Install the global subscriber. Logs go to stderr.
pub fn init_logging(verbose: u8, config: &LoggingConfig) {
    let filter = env::get_var(vars::DEVRIG_LOG)
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(filter_directives(verbose, config)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
