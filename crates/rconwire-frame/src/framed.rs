use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig};
use crate::error::FrameError;

/// `tokio_util` codec over the remote-console packet format.
///
/// Handy for servers and test doubles that want a `Framed` stream; the
/// client read loop uses [`crate::StreamAssembler`] directly.
#[derive(Debug, Clone)]
pub struct RconCodec {
    max_payload_size: usize,
}

impl RconCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
        }
    }
}

impl Default for RconCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RconCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Frame> for RconCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(
            item.request_id,
            item.packet_type,
            &item.payload,
            self.max_payload_size,
            dst,
        )
    }
}
