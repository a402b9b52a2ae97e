//! Launch options for a supervised process.

use devrig_core::config::ProcessConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default grace period between SIGTERM and SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Default time output keeps being read once the child's outcome is known.
pub const DEFAULT_OUTPUT_DRAIN: Duration = Duration::from_secs(1);

/// Default cap on captured output per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024; // 10 MB

/// Where the child's standard input comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stdin {
    Inherit,
    #[default]
    Null,
    /// Write these bytes, then close the pipe.
    Bytes(Vec<u8>),
}

impl Stdin {
    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
            Self::Bytes(_) => Stdio::piped(),
        }
    }
}

/// What happens to one of the child's output streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Output {
    Inherit,
    /// Collect the stream into the result, up to `max_output_bytes`.
    #[default]
    Capture,
    Null,
}

impl Output {
    pub(crate) fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Capture => Stdio::piped(),
            Self::Null => Stdio::null(),
        }
    }
}

/// Options for [`crate::run`].
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub stdin: Stdin,
    pub stdout: Output,
    pub stderr: Output,

    /// Working directory; the current one when unset.
    pub cwd: Option<PathBuf>,

    /// Variables added to (or, with `env_clear`, forming) the environment.
    pub env: HashMap<String, String>,

    /// Start from an empty environment instead of inheriting.
    pub env_clear: bool,

    /// Wall-clock limit. Expiry cancels the run with
    /// [`crate::CancelReason::Timeout`].
    pub timeout: Option<Duration>,

    /// Time between the termination request and a forced kill.
    pub kill_grace: Duration,

    /// Cap on captured bytes per output stream.
    pub max_output_bytes: usize,

    /// How long the pipes are still read after the child has exited or been
    /// killed. A descendant holding a pipe open cannot stall the run past it.
    pub output_drain: Duration,

    /// Caller-owned cancellation signal.
    pub cancel: Option<CancellationToken>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            stdin: Stdin::default(),
            stdout: Output::default(),
            stderr: Output::default(),
            cwd: None,
            env: HashMap::new(),
            env_clear: false,
            timeout: None,
            kill_grace: DEFAULT_KILL_GRACE,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            output_drain: DEFAULT_OUTPUT_DRAIN,
            cancel: None,
        }
    }
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options taking timeout, grace and output cap from configuration.
    pub fn from_config(config: &ProcessConfig) -> Self {
        Self {
            timeout: config.timeout_secs.map(Duration::from_secs),
            kill_grace: Duration::from_millis(config.kill_grace_ms),
            max_output_bytes: config.max_output_bytes,
            ..Self::default()
        }
    }

    /// Inherit all three standard streams.
    pub fn inherit_stdio(mut self) -> Self {
        self.stdin = Stdin::Inherit;
        self.stdout = Output::Inherit;
        self.stderr = Output::Inherit;
        self
    }

    pub fn with_stdin(mut self, stdin: Stdin) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_stdout(mut self, stdout: Output) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn with_stderr(mut self, stderr: Output) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Clear the inherited environment and use only the given variables.
    pub fn with_clean_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = vars;
        self.env_clear = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn with_output_drain(mut self, drain: Duration) -> Self {
        self.output_drain = drain;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_capture_output() {
        let options = ProcessOptions::default();
        assert_eq!(options.stdin, Stdin::Null);
        assert_eq!(options.stdout, Output::Capture);
        assert_eq!(options.stderr, Output::Capture);
        assert_eq!(options.kill_grace, DEFAULT_KILL_GRACE);
        assert_eq!(options.output_drain, DEFAULT_OUTPUT_DRAIN);
        assert!(options.cancel.is_none());
    }

    #[test]
    fn test_from_config() {
        let config = ProcessConfig {
            kill_grace_ms: 250,
            max_output_bytes: 4096,
            timeout_secs: Some(30),
        };
        let options = ProcessOptions::from_config(&config);
        assert_eq!(options.kill_grace, Duration::from_millis(250));
        assert_eq!(options.max_output_bytes, 4096);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_clean_env() {
        let vars = HashMap::from([("ONLY".to_string(), "1".to_string())]);
        let options = ProcessOptions::new()
            .with_env("DROPPED", "x")
            .with_clean_env(vars);
        assert!(options.env_clear);
        assert_eq!(options.env.len(), 1);
        assert!(!options.env.contains_key("DROPPED"));
    }

    #[test]
    fn test_inherit_stdio() {
        let options = ProcessOptions::new().inherit_stdio();
        assert_eq!(options.stdin, Stdin::Inherit);
        assert_eq!(options.stdout, Output::Inherit);
        assert_eq!(options.stderr, Output::Inherit);
    }
}
