//! Stream error types.

use std::io;
use thiserror::Error;

/// Errors that can occur while demultiplexing an engine stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The byte stream violates the framing protocol. Processing of this
    /// stream stops; frames already emitted stay valid.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Input ended in the middle of a frame.
    #[error("Stream ended inside a frame ({buffered} bytes buffered)")]
    UnexpectedEof { buffered: usize },

    /// The engine reported an error on its system channel.
    #[error("Engine error: {0}")]
    Engine(String),

    /// I/O error on the underlying reader or one of the writers.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StreamError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame(reason.into())
    }

    /// Whether the error is a protocol violation rather than an I/O or
    /// truncation problem.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::MalformedFrame(_))
    }
}
