use std::io::ErrorKind;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `AsyncWrite` half.
///
/// Each call encodes into one buffer and issues a single `write_all`, so
/// frames sent together are never interleaved with another writer's bytes
/// as long as callers serialize access to the writer.
pub struct FrameWriter<W> {
    inner: W,
    buf: BytesMut,
    config: FrameConfig,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.request_id, frame.packet_type, frame.payload.as_ref())
            .await
    }

    /// Encode and send one packet.
    pub async fn send(&mut self, request_id: i32, packet_type: i32, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(
            request_id,
            packet_type,
            payload,
            self.config.max_payload_size,
            &mut self.buf,
        )?;
        self.write_buffered().await
    }

    /// Encode several frames and send them in one write.
    ///
    /// Nothing is written if any frame fails to encode.
    pub async fn send_all(&mut self, frames: &[Frame]) -> Result<()> {
        self.buf.clear();
        for frame in frames {
            encode_frame(
                frame.request_id,
                frame.packet_type,
                &frame.payload,
                self.config.max_payload_size,
                &mut self.buf,
            )?;
        }
        self.write_buffered().await
    }

    async fn write_buffered(&mut self) -> Result<()> {
        self.inner.write_all(&self.buf).await.map_err(map_io)?;
        self.buf.clear();
        self.flush().await
    }

    /// Flush the underlying stream.
    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await.map_err(map_io)
    }

    /// Shut down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(map_io)
    }
}

fn map_io(err: std::io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WriteZero | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
            FrameError::ConnectionClosed
        }
        _ => FrameError::Io(err),
    }
}

impl<W> std::fmt::Debug for FrameWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("buffered", &self.buf.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
