//! TCP transport for remote-console connections.
//!
//! This is the lowest layer of rconwire. It resolves the server address,
//! opens the stream under a deadline and hands the split halves to the
//! connection manager. Everything above it works on [`RconStream`].

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::RconStream;
pub use tcp::{connect, display_address, DEFAULT_PORT};
