//! Typed results of a supervised run.

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use crate::error::ProcessError;

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Requested,
    /// The configured wall-clock timeout elapsed.
    Timeout,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("requested"),
            Self::Timeout => f.write_str("timed out"),
        }
    }
}

/// How a process actually ended, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitState {
    Exited { code: i32 },
    Signaled { signal: String, number: i32 },
}

impl ExitState {
    pub(crate) fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited { code };
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            let number = status.signal().unwrap_or(0);
            Self::Signaled {
                signal: signal_name(number),
                number,
            }
        }

        #[cfg(not(unix))]
        {
            Self::Exited { code: -1 }
        }
    }
}

/// What happened after the supervisor asked a child to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    /// The child's real end state after the request.
    pub state: ExitState,
    /// The grace period ran out and the child was force-killed.
    pub escalated: bool,
}

/// Exactly one way a run can end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited on its own.
    Exited { code: i32 },

    /// The process was terminated by a signal not sent by the supervisor.
    Signaled { signal: String, number: i32 },

    /// The process never started.
    SpawnFailed { cause: String },

    /// The supervisor stopped the process. `termination` is `None` when
    /// cancellation arrived before the process was spawned.
    Cancelled {
        reason: CancelReason,
        termination: Option<Termination>,
    },

    /// Waiting on the process failed after it was started.
    WaitFailed { cause: String },
}

impl ProcessOutcome {
    pub(crate) fn from_status(status: ExitStatus) -> Self {
        match ExitState::from_status(status) {
            ExitState::Exited { code } => Self::Exited { code },
            ExitState::Signaled { signal, number } => Self::Signaled { signal, number },
        }
    }

    /// Exit code, if the process exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited { code } => Some(*code),
            _ => None,
        }
    }

    /// Signal name (e.g. `SIGSEGV`), if an unrequested signal ended it.
    pub fn signal(&self) -> Option<&str> {
        match self {
            Self::Signaled { signal, .. } => Some(signal),
            _ => None,
        }
    }

    /// Cancellation reason, if the supervisor stopped the process.
    pub fn cancelled(&self) -> Option<CancelReason> {
        match self {
            Self::Cancelled { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Failure reason, if the process never started or could not be
    /// waited on.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::SpawnFailed { cause } | Self::WaitFailed { cause } => Some(cause),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: 0 })
    }

    /// Status a shell would report for this outcome: the exit code,
    /// `128 + n` for signal `n`, `127` when the program could not start,
    /// `130` when cancelled.
    pub fn shell_status(&self) -> i32 {
        match self {
            Self::Exited { code } => *code,
            Self::Signaled { number, .. } => 128 + number,
            Self::SpawnFailed { .. } => 127,
            Self::Cancelled { .. } => 130,
            Self::WaitFailed { .. } => 1,
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited { code } => write!(f, "exited with code {code}"),
            Self::Signaled { signal, .. } => write!(f, "killed by {signal}"),
            Self::SpawnFailed { cause } => write!(f, "failed to start: {cause}"),
            Self::Cancelled { reason, .. } => write!(f, "cancelled ({reason})"),
            Self::WaitFailed { cause } => write!(f, "wait failed: {cause}"),
        }
    }
}

/// Result of one supervised run.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub program: String,
    pub outcome: ProcessOutcome,

    /// Captured stdout, when the stream was set to capture.
    pub stdout: Option<Vec<u8>>,
    /// Captured stderr, when the stream was set to capture.
    pub stderr: Option<Vec<u8>>,
    /// Set when the output cap was hit or the pipe was still open at the
    /// end of the drain window.
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,

    /// OS process id; `None` if the process never started.
    pub pid: Option<u32>,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Captured stdout as text, lossily decoded.
    pub fn stdout_lossy(&self) -> String {
        self.stdout
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Captured stderr as text, lossily decoded.
    pub fn stderr_lossy(&self) -> String {
        self.stderr
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// `Ok` only for exit code zero.
    pub fn into_result(self) -> Result<Self, ProcessError> {
        let program = self.program.clone();
        match &self.outcome {
            ProcessOutcome::Exited { code: 0 } => Ok(self),
            ProcessOutcome::Exited { code } => Err(ProcessError::NonZeroExit {
                program,
                code: *code,
            }),
            ProcessOutcome::Signaled { signal, .. } => Err(ProcessError::Signaled {
                program,
                signal: signal.clone(),
            }),
            ProcessOutcome::SpawnFailed { cause } => Err(ProcessError::Spawn {
                program,
                cause: cause.clone(),
            }),
            ProcessOutcome::Cancelled { reason, .. } => Err(ProcessError::Cancelled {
                program,
                reason: *reason,
            }),
            ProcessOutcome::WaitFailed { cause } => Err(ProcessError::WaitFailed {
                program,
                cause: cause.clone(),
            }),
        }
    }
}

/// Name of a signal number, e.g. `SIGTERM`.
#[cfg(unix)]
pub fn signal_name(number: i32) -> String {
    match nix::sys::signal::Signal::try_from(number) {
        Ok(signal) => signal.as_str().to_string(),
        Err(_) => format!("signal {number}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: ProcessOutcome) -> ProcessResult {
        ProcessResult {
            program: "prog".into(),
            outcome,
            stdout: None,
            stderr: None,
            stdout_truncated: false,
            stderr_truncated: false,
            pid: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_exactly_one_accessor_populated() {
        let outcomes = [
            ProcessOutcome::Exited { code: 3 },
            ProcessOutcome::Signaled {
                signal: "SIGSEGV".into(),
                number: 11,
            },
            ProcessOutcome::SpawnFailed {
                cause: "not found".into(),
            },
            ProcessOutcome::Cancelled {
                reason: CancelReason::Requested,
                termination: None,
            },
        ];
        for outcome in &outcomes {
            let populated = [
                outcome.exit_code().is_some(),
                outcome.signal().is_some(),
                outcome.cause().is_some(),
                outcome.cancelled().is_some(),
            ];
            assert_eq!(
                populated.iter().filter(|p| **p).count(),
                1,
                "{outcome:?}"
            );
        }
    }

    #[test]
    fn test_shell_status() {
        assert_eq!(ProcessOutcome::Exited { code: 7 }.shell_status(), 7);
        assert_eq!(
            ProcessOutcome::Signaled {
                signal: "SIGKILL".into(),
                number: 9
            }
            .shell_status(),
            137
        );
        assert_eq!(
            ProcessOutcome::SpawnFailed { cause: "x".into() }.shell_status(),
            127
        );
        assert_eq!(
            ProcessOutcome::Cancelled {
                reason: CancelReason::Timeout,
                termination: None
            }
            .shell_status(),
            130
        );
    }

    #[test]
    fn test_into_result() {
        assert!(result(ProcessOutcome::Exited { code: 0 }).into_result().is_ok());

        let err = result(ProcessOutcome::Exited { code: 7 })
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            ProcessError::NonZeroExit {
                program: "prog".into(),
                code: 7
            }
        );
        assert!(err.started());

        let err = result(ProcessOutcome::SpawnFailed {
            cause: "No such file or directory".into(),
        })
        .into_result()
        .unwrap_err();
        assert!(!err.started());
        assert!(err.to_string().starts_with("Failed to start prog"));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_names() {
        assert_eq!(signal_name(15), "SIGTERM");
        assert_eq!(signal_name(9), "SIGKILL");
        assert_eq!(signal_name(999), "signal 999");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            ProcessOutcome::Exited { code: 2 }.to_string(),
            "exited with code 2"
        );
        assert_eq!(
            ProcessOutcome::Cancelled {
                reason: CancelReason::Timeout,
                termination: None
            }
            .to_string(),
            "cancelled (timed out)"
        );
    }
}
