//! Async remote-console (RCON) client.
//!
//! rconwire speaks the Source/Minecraft RCON protocol over TCP: packet
//! framing, streaming decode, request correlation, multi-packet response
//! reassembly, the auth handshake and reconnection.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect with a deadline
//! - [`frame`]: packet codec and streaming assembler
//! - [`client`]: the client engine ([`RconClient`])

/// Re-export transport types.
pub mod transport {
    pub use rconwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rconwire_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use rconwire_client::*;
}

pub use rconwire_client::{
    AuthState, ClientConfig, ClientError, ClientEvent, ConnectionState, DisconnectReason,
    ErrorKind, RconClient, ReconnectConfig, Result,
};
