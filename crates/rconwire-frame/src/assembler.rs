use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Incremental frame parser for a byte stream.
///
/// Feed it whatever the socket returned; it hands back every frame that is
/// now complete and keeps the unfinished tail for the next call. A read can
/// carry zero, one or several frames.
#[derive(Debug)]
pub struct StreamAssembler {
    buf: BytesMut,
    config: FrameConfig,
}

impl StreamAssembler {
    /// Create an assembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append `chunk` and return every frame completed by it, in order.
    ///
    /// A `CorruptFrame` error is fatal: the stream position is lost and the
    /// connection must be dropped. Frames decoded before the corrupt one in
    /// the same call are discarded with it.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
            trace!(
                request_id = frame.request_id,
                packet_type = frame.packet_type,
                size = frame.payload.len(),
                "assembled frame"
            );
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}
