//! Supervised execution of a single child process.
//!
//! [`run`] spawns a command, wires its standard streams, and resolves to a
//! [`ProcessResult`] whose [`ProcessOutcome`] is exactly one of: a normal
//! exit, termination by a signal, a failure to start, a caller-initiated
//! cancellation, or a failure while waiting. Termination states are values,
//! not errors; [`ProcessResult::into_result`] converts for callers that
//! want `?`.

pub mod error;
pub mod options;
pub mod outcome;
pub mod supervisor;

pub use error::ProcessError;
pub use options::{Output, ProcessOptions, Stdin};
pub use outcome::{CancelReason, ExitState, ProcessOutcome, ProcessResult, Termination};
pub use supervisor::{run, SupervisedProcess};

pub use tokio_util::sync::CancellationToken;

/// Result type for process operations.
pub type Result<T> = std::result::Result<T, ProcessError>;
