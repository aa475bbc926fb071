//! Remote-console client engine.
//!
//! [`RconClient`] owns one TCP connection and drives the whole exchange:
//! inbound bytes go through the frame assembler, responses are matched to
//! requests by id, multi-packet answers are stitched back together with a
//! sentinel probe, and the auth handshake gates every command.
//!
//! ```no_run
//! use rconwire_client::{ClientConfig, RconClient};
//!
//! # async fn run() -> rconwire_client::Result<()> {
//! let config = ClientConfig::new("127.0.0.1", 25575).with_password("secret");
//! let client = RconClient::open(config).await?;
//! let players = client.send_command("list").await?;
//! println!("{players}");
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod reassembly;
pub mod tracker;

pub use auth::AuthState;
pub use client::RconClient;
pub use config::{ClientConfig, ReconnectConfig, DEFAULT_TIMEOUT};
pub use connection::ConnectionState;
pub use error::{ClientError, DisconnectReason, ErrorKind, Result};
pub use event::ClientEvent;
pub use reassembly::{FragmentReassembler, Routed};
pub use tracker::{PendingHandle, RequestKind, RequestTracker};
