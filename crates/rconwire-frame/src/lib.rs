//! Remote-console packet framing.
//!
//! Every packet on the wire is:
//! - A 4-byte little-endian body length
//! - A 4-byte little-endian request id
//! - A 4-byte little-endian packet type
//! - The payload text, followed by two NUL bytes
//!
//! [`StreamAssembler`] turns arbitrary TCP reads into whole frames; callers
//! never see a partial packet.

pub mod assembler;
pub mod codec;
pub mod error;
#[cfg(feature = "async")]
pub mod framed;
pub mod packet_type;
#[cfg(feature = "async")]
pub mod writer;

pub use assembler::StreamAssembler;
pub use codec::{
    check_payload, decode_frame, encode_frame, max_frame_len, try_decode, Decoded, Frame,
    FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, LENGTH_FIELD_SIZE, MIN_BODY_LEN,
};
pub use error::{FrameError, Result};
#[cfg(feature = "async")]
pub use framed::RconCodec;
pub use packet_type::{
    packet_type_name, Direction, AUTH, AUTH_FAILURE_ID, AUTH_RESPONSE, EXEC_COMMAND,
    RESPONSE_VALUE,
};
#[cfg(feature = "async")]
pub use writer::FrameWriter;
