//! Incremental frame parsing.
//!
//! [`FrameDecoder`] holds the protocol state machine and implements
//! [`tokio_util::codec::Decoder`]. [`StreamDemultiplexer`] owns the
//! carry-over buffer for callers that receive raw chunks themselves.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::error::StreamError;
use crate::frame::{FrameHeader, StreamFrame, HEADER_LEN};
use crate::Result;

/// Upper bound on how much buffer space is reserved ahead of a payload.
/// A header may declare up to 4 GiB; the buffer grows as bytes arrive.
const RESERVE_HINT: usize = 64 * 1024;

/// Optional bounds checked against every frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxLimits {
    /// Total byte length of the stream, when the transport knows it
    /// (e.g. a `Content-Length`). A frame extending past it is malformed.
    pub expected_total: Option<u64>,

    /// Largest payload accepted in a single frame.
    pub max_frame_len: Option<u32>,
}

impl DemuxLimits {
    pub fn with_expected_total(mut self, total: u64) -> Self {
        self.expected_total = Some(total);
        self
    }

    pub fn with_max_frame_len(mut self, max: u32) -> Self {
        self.max_frame_len = Some(max);
        self
    }
}

/// Frame parser state machine.
///
/// Once a malformed frame is seen the decoder is poisoned and every
/// further call returns the same error.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    limits: DemuxLimits,
    /// Header read whose payload has not fully arrived yet.
    pending: Option<FrameHeader>,
    /// Bytes of the stream consumed so far (headers and payloads).
    consumed: u64,
    poisoned: Option<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DemuxLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &DemuxLimits {
        &self.limits
    }

    /// Bytes of complete headers and payloads consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Whether a header has been read but its payload is incomplete.
    pub fn in_frame(&self) -> bool {
        self.pending.is_some()
    }

    fn poison(&mut self, err: StreamError) -> StreamError {
        if let StreamError::MalformedFrame(reason) = &err {
            debug!(reason = %reason, consumed = self.consumed, "stream poisoned");
            self.poisoned = Some(reason.clone());
        }
        err
    }

    fn check_limits(&self, header: &FrameHeader) -> Result<()> {
        if let Some(max) = self.limits.max_frame_len {
            if header.length > max {
                return Err(StreamError::malformed(format!(
                    "{} frame declares {} bytes, limit is {max}",
                    header.stream_type, header.length
                )));
            }
        }

        if let Some(total) = self.limits.expected_total {
            let end = self.consumed + HEADER_LEN as u64 + u64::from(header.length);
            if end > total {
                return Err(StreamError::malformed(format!(
                    "{} frame at offset {} declares {} bytes, past stream end at {total}",
                    header.stream_type, self.consumed, header.length
                )));
            }
        }

        Ok(())
    }

    fn read_header(&mut self, src: &mut BytesMut) -> Result<Option<FrameHeader>> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&src[..HEADER_LEN]);
        let header = FrameHeader::parse(&raw)?;
        self.check_limits(&header)?;

        src.advance(HEADER_LEN);
        self.consumed += HEADER_LEN as u64;
        Ok(Some(header))
    }

    fn decode_frame(&mut self, src: &mut BytesMut) -> Result<Option<StreamFrame>> {
        if let Some(reason) = &self.poisoned {
            return Err(StreamError::MalformedFrame(reason.clone()));
        }

        let header = match self.pending.take() {
            Some(header) => header,
            None => match self.read_header(src) {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(None),
                Err(e) => return Err(self.poison(e)),
            },
        };

        let len = header.length as usize;
        if src.len() < len {
            src.reserve((len - src.len()).min(RESERVE_HINT));
            self.pending = Some(header);
            return Ok(None);
        }

        let payload = src.split_to(len).freeze();
        self.consumed += len as u64;
        trace!(stream = %header.stream_type, len, "frame decoded");

        Ok(Some(StreamFrame {
            stream_type: header.stream_type,
            payload,
        }))
    }

    /// Bytes held for an incomplete frame, counting a consumed header.
    fn incomplete_len(&self, src: &BytesMut) -> usize {
        src.len() + if self.pending.is_some() { HEADER_LEN } else { 0 }
    }
}

impl Decoder for FrameDecoder {
    type Item = StreamFrame;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<StreamFrame>> {
        self.decode_frame(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<StreamFrame>> {
        match self.decode_frame(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && self.pending.is_none() => Ok(None),
            None => Err(StreamError::UnexpectedEof {
                buffered: self.incomplete_len(src),
            }),
        }
    }
}

/// Chunk-driven demultiplexer.
///
/// Push input in pieces of any size; complete frames come out in stream
/// order and incomplete bytes are carried over to the next push.
///
/// ```
/// use devrig_stream::{encode_frame, StreamDemultiplexer, StreamType};
///
/// let wire = encode_frame(StreamType::Stdout, b"hello").unwrap();
/// let mut demux = StreamDemultiplexer::new();
/// assert!(demux.push(&wire[..3]).unwrap().is_empty());
/// let frames = demux.push(&wire[3..]).unwrap();
/// assert_eq!(&frames[0].payload[..], b"hello");
/// demux.finish().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StreamDemultiplexer {
    decoder: FrameDecoder,
    buffer: BytesMut,
}

impl StreamDemultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DemuxLimits) -> Self {
        Self {
            decoder: FrameDecoder::with_limits(limits),
            buffer: BytesMut::new(),
        }
    }

    /// Feed a chunk and return every frame it completes.
    ///
    /// If the chunk completes some frames and then hits a malformed one,
    /// the completed frames are returned and the error is reported by the
    /// next call. An empty chunk is a no-op.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamFrame>> {
        if let Some(reason) = &self.decoder.poisoned {
            return Err(StreamError::MalformedFrame(reason.clone()));
        }

        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.decoder.decode_frame(&mut self.buffer) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) if frames.is_empty() => return Err(e),
                Err(_) => break,
            }
        }
        Ok(frames)
    }

    /// Pull one complete frame out of the bytes already pushed.
    pub fn next_frame(&mut self) -> Result<Option<StreamFrame>> {
        self.decoder.decode_frame(&mut self.buffer)
    }

    /// Bytes held for a frame that has not completed yet.
    pub fn buffered(&self) -> usize {
        self.decoder.incomplete_len(&self.buffer)
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.decoder.bytes_consumed()
    }

    /// Signal end of input. Fails if the stream was poisoned or stopped
    /// inside a frame.
    pub fn finish(self) -> Result<()> {
        if let Some(reason) = self.decoder.poisoned {
            return Err(StreamError::MalformedFrame(reason));
        }
        match self.decoder.incomplete_len(&self.buffer) {
            0 => Ok(()),
            buffered => Err(StreamError::UnexpectedEof { buffered }),
        }
    }

    /// Demultiplex a complete in-memory stream.
    pub fn demultiplex(bytes: &[u8], limits: DemuxLimits) -> Result<Vec<StreamFrame>> {
        let mut demux = Self::with_limits(limits);
        let mut frames = demux.push(bytes)?;
        // A malformed frame after valid ones is held back by push.
        while let Some(frame) = demux.next_frame()? {
            frames.push(frame);
        }
        demux.finish()?;
        Ok(frames)
    }
}
