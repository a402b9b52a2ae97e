//! Async adapters over [`FrameDecoder`].

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::demux::{DemuxLimits, FrameDecoder};
use crate::error::StreamError;
use crate::frame::{StreamFrame, StreamType};
use crate::Result;

/// Byte counts written by [`demux_copy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub frames: u64,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
}

/// Stdout and stderr reassembled from a list of frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Demuxed {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Demuxed {
    /// Concatenate frame payloads per channel. Stdin echo frames are
    /// folded into stdout; a system frame becomes [`StreamError::Engine`].
    pub fn from_frames<'a, I>(frames: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a StreamFrame>,
    {
        let mut out = Self::default();
        for frame in frames {
            match frame.stream_type {
                StreamType::Stdin | StreamType::Stdout => {
                    out.stdout.extend_from_slice(&frame.payload)
                }
                StreamType::Stderr => out.stderr.extend_from_slice(&frame.payload),
                StreamType::System => return Err(engine_error(frame)),
            }
        }
        Ok(out)
    }
}

fn engine_error(frame: &StreamFrame) -> StreamError {
    let message = String::from_utf8_lossy(&frame.payload).trim_end().to_string();
    warn!(message = %message, "engine reported an error");
    StreamError::Engine(message)
}

/// Wrap a reader as a stream of frames.
pub fn demux_stream<R>(reader: R, limits: DemuxLimits) -> FramedRead<R, FrameDecoder>
where
    R: AsyncRead,
{
    FramedRead::new(reader, FrameDecoder::with_limits(limits))
}

/// Read a multiplexed stream to the end, writing stdout frames to `stdout`
/// and stderr frames to `stderr`.
///
/// Output written before an error stays written. A system frame ends the
/// copy with [`StreamError::Engine`].
pub async fn demux_copy<R, O, E>(
    reader: R,
    stdout: &mut O,
    stderr: &mut E,
    limits: DemuxLimits,
) -> Result<CopyStats>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut frames = demux_stream(reader, limits);
    let mut stats = CopyStats::default();

    let result = async {
        while let Some(frame) = frames.next().await {
            let frame = frame?;
            stats.frames += 1;
            match frame.stream_type {
                StreamType::Stdin | StreamType::Stdout => {
                    stdout.write_all(&frame.payload).await?;
                    stats.stdout_bytes += frame.len() as u64;
                }
                StreamType::Stderr => {
                    stderr.write_all(&frame.payload).await?;
                    stats.stderr_bytes += frame.len() as u64;
                }
                StreamType::System => return Err(engine_error(&frame)),
            }
        }
        Ok::<(), StreamError>(())
    }
    .await;

    stdout.flush().await?;
    stderr.flush().await?;
    result?;

    debug!(
        frames = stats.frames,
        stdout_bytes = stats.stdout_bytes,
        stderr_bytes = stats.stderr_bytes,
        "demux copy finished"
    );
    Ok(stats)
}
