//! Demultiplexing of container engine output streams.
//!
//! When a container engine attaches to a process without a TTY, it
//! interleaves stdout and stderr on one connection, each chunk prefixed
//! with an 8-byte header:
//!
//! ```text
//! +------+-----------+----------------------+------------------+
//! | type | 0 | 0 | 0 | length (u32, BE)     | payload (length) |
//! +------+-----------+----------------------+------------------+
//! ```
//!
//! [`StreamDemultiplexer`] splits such a stream back into ordered
//! [`StreamFrame`]s, accepting input in arbitrarily sized pieces.
//! [`FrameDecoder`] is the same parser as a `tokio_util` codec, and
//! [`demux_copy`] drives it over an `AsyncRead` into two writers.

pub mod copy;
pub mod demux;
pub mod error;
pub mod frame;

pub use copy::{demux_copy, demux_stream, CopyStats, Demuxed};
pub use demux::{DemuxLimits, FrameDecoder, StreamDemultiplexer};
pub use error::StreamError;
pub use frame::{encode_frame, FrameHeader, StreamFrame, StreamType, HEADER_LEN};

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
