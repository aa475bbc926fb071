use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::packet_type::{AUTH, EXEC_COMMAND};

/// Size of the leading length field, which is not counted in its own value.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Request id (4) + packet type (4).
pub const HEADER_SIZE: usize = 8;

/// Two NUL bytes close every packet.
const TERMINATOR: [u8; 2] = [0, 0];

/// Smallest legal body: header plus terminator, empty payload.
pub const MIN_BODY_LEN: usize = HEADER_SIZE + TERMINATOR.len();

/// Conventional payload ceiling for both directions.
pub const DEFAULT_MAX_PAYLOAD: usize = 4096;

/// A single remote-console packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Client-assigned correlation id (or `-1` on auth failure).
    pub request_id: i32,
    /// Packet type code, see [`crate::packet_type`].
    pub packet_type: i32,
    /// Payload text without the trailing NUL bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(request_id: i32, packet_type: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            request_id,
            packet_type,
            payload: payload.into(),
        }
    }

    /// Create an authentication frame.
    pub fn auth(request_id: i32, password: &str) -> Self {
        Self::new(request_id, AUTH, Bytes::copy_from_slice(password.as_bytes()))
    }

    /// Create a command frame.
    pub fn command(request_id: i32, command: &str) -> Self {
        Self::new(
            request_id,
            EXEC_COMMAND,
            Bytes::copy_from_slice(command.as_bytes()),
        )
    }

    /// Payload as text. Invalid UTF-8 is replaced, not rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// The total wire size of this frame (length field + body).
    pub fn wire_size(&self) -> usize {
        LENGTH_FIELD_SIZE + MIN_BODY_LEN + self.payload.len()
    }

    /// Encode into a fresh buffer using the default payload ceiling.
    pub fn encode(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(
            self.request_id,
            self.packet_type,
            &self.payload,
            DEFAULT_MAX_PAYLOAD,
            &mut dst,
        )?;
        Ok(dst.freeze())
    }
}

/// Validate a payload without encoding it.
///
/// Fails with `PayloadTooLarge` above `max_payload` and with `InvalidPayload`
/// on an embedded NUL byte.
pub fn check_payload(payload: &[u8], max_payload: usize) -> Result<()> {
    if payload.len() > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: max_payload,
        });
    }
    if let Some(offset) = payload.iter().position(|&b| b == 0) {
        return Err(FrameError::InvalidPayload { offset });
    }
    Ok(())
}

/// Largest body length accepted for a given payload ceiling.
pub fn max_frame_len(max_payload: usize) -> usize {
    max_payload.saturating_add(MIN_BODY_LEN)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────┬────────┐
/// │ Length     │ Request id │ Type       │ Payload      │ 0x00   │
/// │ (4B LE)    │ (4B LE)    │ (4B LE)    │ (N bytes)    │ 0x00   │
/// └────────────┴────────────┴────────────┴──────────────┴────────┘
///  Length = 4 + 4 + N + 2
/// ```
pub fn encode_frame(
    request_id: i32,
    packet_type: i32,
    payload: &[u8],
    max_payload: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    check_payload(payload, max_payload)?;

    let body_len =
        i32::try_from(MIN_BODY_LEN + payload.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: i32::MAX as usize - MIN_BODY_LEN,
        })?;

    dst.reserve(LENGTH_FIELD_SIZE + MIN_BODY_LEN + payload.len());
    dst.put_i32_le(body_len);
    dst.put_i32_le(request_id);
    dst.put_i32_le(packet_type);
    dst.put_slice(payload);
    dst.put_slice(&TERMINATOR);
    Ok(())
}

/// Outcome of a decode attempt on a buffer prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A whole frame was present at the start of the buffer.
    Complete { frame: Frame, consumed: usize },
    /// The buffer holds less than one frame. Nothing was consumed.
    NeedMoreData,
}

/// Try to decode one frame from the start of `src`.
///
/// `src` may hold any number of frames, or part of one. The declared length
/// is validated before waiting for the body, so a bogus length fails fast
/// instead of making the caller buffer without bound.
pub fn try_decode(src: &[u8], max_payload: usize) -> Result<Decoded> {
    let Some(length_bytes) = src.get(..LENGTH_FIELD_SIZE) else {
        return Ok(Decoded::NeedMoreData);
    };
    let declared = read_i32_le(length_bytes);

    if declared < MIN_BODY_LEN as i32 {
        return Err(FrameError::corrupt(format!(
            "declared length {declared} is below the minimum of {MIN_BODY_LEN}"
        )));
    }
    let body_len = declared as usize;
    let max_len = max_frame_len(max_payload);
    if body_len > max_len {
        return Err(FrameError::corrupt(format!(
            "declared length {body_len} exceeds the maximum of {max_len}"
        )));
    }

    let total = LENGTH_FIELD_SIZE + body_len;
    let Some(body) = src.get(LENGTH_FIELD_SIZE..total) else {
        return Ok(Decoded::NeedMoreData);
    };

    let (payload, terminator) = body[HEADER_SIZE..].split_at(body_len - MIN_BODY_LEN);
    if terminator != TERMINATOR {
        return Err(FrameError::corrupt(format!(
            "packet is not terminated by two NUL bytes (found {terminator:02x?})"
        )));
    }

    let frame = Frame {
        request_id: read_i32_le(&body[0..4]),
        packet_type: read_i32_le(&body[4..8]),
        payload: Bytes::copy_from_slice(payload),
    };

    Ok(Decoded::Complete {
        frame,
        consumed: total,
    })
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    match try_decode(&src[..], max_payload)? {
        Decoded::Complete { frame, consumed } => {
            src.advance(consumed);
            Ok(Some(frame))
        }
        Decoded::NeedMoreData => Ok(None),
    }
}

fn read_i32_le(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes, applied to both directions. Default: 4096.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet_type::{AUTH_RESPONSE, RESPONSE_VALUE};

    fn encode(request_id: i32, packet_type: i32, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(request_id, packet_type, payload, DEFAULT_MAX_PAYLOAD, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_exact_layout() {
        let buf = encode(7, AUTH, b"secret");

        let mut expected = Vec::new();
        expected.extend_from_slice(&16i32.to_le_bytes());
        expected.extend_from_slice(&7i32.to_le_bytes());
        expected.extend_from_slice(&3i32.to_le_bytes());
        expected.extend_from_slice(b"secret");
        expected.extend_from_slice(&[0, 0]);

        assert_eq!(buf.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let cases: [(i32, i32, &[u8]); 4] = [
            (1, EXEC_COMMAND, b"list"),
            (i32::MAX, RESPONSE_VALUE, b"There are 0 players online"),
            (-1, AUTH_RESPONSE, b""),
            (42, AUTH, "p\u{e4}ssw\u{f6}rd".as_bytes()),
        ];

        for (request_id, packet_type, payload) in cases {
            let mut buf = encode(request_id, packet_type, payload);
            let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
                .unwrap()
                .unwrap();

            assert_eq!(frame.request_id, request_id);
            assert_eq!(frame.packet_type, packet_type);
            assert_eq!(frame.payload.as_ref(), payload);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_encode_payload_at_ceiling() {
        let payload = vec![b'a'; DEFAULT_MAX_PAYLOAD];
        let mut buf = encode(3, RESPONSE_VALUE, &payload);
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + MIN_BODY_LEN + DEFAULT_MAX_PAYLOAD);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(frame.payload.len(), DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let payload = vec![b'a'; DEFAULT_MAX_PAYLOAD + 1];
        let mut buf = BytesMut::new();
        let err = encode_frame(1, EXEC_COMMAND, &payload, DEFAULT_MAX_PAYLOAD, &mut buf)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 4097, max: 4096 }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_rejects_nul() {
        let mut buf = BytesMut::new();
        let err = encode_frame(1, EXEC_COMMAND, b"say\0hi", DEFAULT_MAX_PAYLOAD, &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidPayload { offset: 3 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_length() {
        let result = try_decode(&[0x0a, 0x00, 0x00], DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(result, Decoded::NeedMoreData);
    }

    #[test]
    fn test_decode_incomplete_body() {
        let buf = encode(1, RESPONSE_VALUE, b"hello");
        for cut in LENGTH_FIELD_SIZE..buf.len() {
            let result = try_decode(&buf[..cut], DEFAULT_MAX_PAYLOAD).unwrap();
            assert_eq!(result, Decoded::NeedMoreData, "cut at {cut}");
        }
    }

    #[test]
    fn test_decode_reports_consumed_with_trailing_bytes() {
        let mut buf = encode(1, RESPONSE_VALUE, b"first");
        let first_len = buf.len();
        buf.extend_from_slice(&encode(2, RESPONSE_VALUE, b"second")[..6]);

        match try_decode(&buf, DEFAULT_MAX_PAYLOAD).unwrap() {
            Decoded::Complete { frame, consumed } => {
                assert_eq!(consumed, first_len);
                assert_eq!(frame.payload.as_ref(), b"first");
            }
            Decoded::NeedMoreData => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn test_decode_negative_length() {
        let buf = (-5i32).to_le_bytes();
        let err = try_decode(&buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::CorruptFrame { .. }));
    }

    #[test]
    fn test_decode_zero_and_short_lengths() {
        for declared in [0i32, 4, 9] {
            let buf = declared.to_le_bytes();
            let err = try_decode(&buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
            assert!(
                matches!(err, FrameError::CorruptFrame { .. }),
                "length {declared}"
            );
        }
    }

    #[test]
    fn test_decode_length_too_large() {
        let mut buf = BytesMut::new();
        buf.put_i32_le((max_frame_len(DEFAULT_MAX_PAYLOAD) + 1) as i32);

        let err = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::CorruptFrame { .. }));
        // Nothing consumed on error.
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE);
    }

    #[test]
    fn test_decode_missing_terminator() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(12);
        buf.put_i32_le(1);
        buf.put_i32_le(RESPONSE_VALUE);
        buf.put_slice(b"ab\0\0");
        // Overwrite the final NUL.
        let last = buf.len() - 1;
        buf[last] = b'x';

        let err = try_decode(&buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::CorruptFrame { .. }));
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = encode(1, RESPONSE_VALUE, b"first");
        buf.extend_from_slice(&encode(2, AUTH_RESPONSE, b""));

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(f1.request_id, 1);
        assert_eq!(f1.payload.as_ref(), b"first");

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(f2.request_id, 2);
        assert_eq!(f2.packet_type, AUTH_RESPONSE);
        assert!(f2.payload.is_empty());

        assert!(buf.is_empty());
    }

    #[test]
    fn test_frame_helpers() {
        let frame = Frame::command(9, "list");
        assert_eq!(frame.packet_type, EXEC_COMMAND);
        assert_eq!(frame.wire_size(), LENGTH_FIELD_SIZE + MIN_BODY_LEN + 4);
        assert_eq!(frame.encode().unwrap().len(), frame.wire_size());

        let frame = Frame::new(1, RESPONSE_VALUE, Bytes::from_static(b"caf\xc3"));
        assert_eq!(frame.text(), "caf\u{fffd}");

        let frame = Frame::auth(2, "secret");
        assert_eq!(frame.packet_type, AUTH);
        assert_eq!(frame.text(), "secret");
    }
}
