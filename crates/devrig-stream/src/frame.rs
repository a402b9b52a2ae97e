//! Frame header layout and stream channel tags.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::StreamError;
use crate::Result;

/// Size of a frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Logical channel a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamType {
    Stdin = 0,
    Stdout = 1,
    Stderr = 2,
    /// Engine-level error messages, not process output.
    System = 3,
}

impl StreamType {
    /// Wire tag for this channel.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::System => "system",
        }
    }
}

impl TryFrom<u8> for StreamType {
    type Error = StreamError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Stdin),
            1 => Ok(Self::Stdout),
            2 => Ok(Self::Stderr),
            3 => Ok(Self::System),
            other => Err(StreamError::malformed(format!(
                "unknown stream type tag {other}"
            ))),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub stream_type: StreamType,
    /// Declared payload length.
    pub length: u32,
}

impl FrameHeader {
    /// Parse a header. Bytes 1–3 are reserved and ignored.
    pub fn parse(raw: &[u8; HEADER_LEN]) -> Result<Self> {
        let stream_type = StreamType::try_from(raw[0])?;
        let length = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Ok(Self {
            stream_type,
            length,
        })
    }

    /// Encode with zeroed reserved bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let len = self.length.to_be_bytes();
        [self.stream_type.tag(), 0, 0, 0, len[0], len[1], len[2], len[3]]
    }
}

/// One demultiplexed chunk of channel output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub stream_type: StreamType,
    pub payload: Bytes,
}

impl StreamFrame {
    pub fn new(stream_type: StreamType, payload: impl Into<Bytes>) -> Self {
        Self {
            stream_type,
            payload: payload.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Append this frame in wire format to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        let length = u32::try_from(self.payload.len()).map_err(|_| {
            StreamError::malformed(format!(
                "payload of {} bytes does not fit a frame",
                self.payload.len()
            ))
        })?;
        let header = FrameHeader {
            stream_type: self.stream_type,
            length,
        };
        dst.reserve(HEADER_LEN + self.payload.len());
        dst.put_slice(&header.encode());
        dst.put_slice(&self.payload);
        Ok(())
    }
}

/// Build the wire bytes of a single frame.
pub fn encode_frame(stream_type: StreamType, payload: &[u8]) -> Result<Vec<u8>> {
    let mut buf = BytesMut::new();
    StreamFrame::new(stream_type, Bytes::copy_from_slice(payload)).encode_into(&mut buf)?;
    Ok(buf.to_vec())
}
