//! Process error types.

use thiserror::Error;

use crate::outcome::CancelReason;

/// A run that did not end in a clean exit, for callers that opt into
/// [`crate::ProcessResult::into_result`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("Failed to start {program}: {cause}")]
    Spawn { program: String, cause: String },

    /// The program ran and exited with a non-zero code.
    #[error("{program} exited with code {code}")]
    NonZeroExit { program: String, code: i32 },

    /// The program was terminated by a signal it did not handle.
    #[error("{program} killed by signal {signal}")]
    Signaled { program: String, signal: String },

    /// The run was cancelled before the program finished.
    #[error("{program} cancelled ({reason})")]
    Cancelled {
        program: String,
        reason: CancelReason,
    },

    /// Waiting on the program failed.
    #[error("Failed to wait for {program}: {cause}")]
    WaitFailed { program: String, cause: String },
}

impl ProcessError {
    /// Whether the program actually ran (as opposed to never starting).
    pub fn started(&self) -> bool {
        !matches!(self, Self::Spawn { .. })
    }
}
