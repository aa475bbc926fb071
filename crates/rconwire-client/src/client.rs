use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::AuthState;
use crate::config::ClientConfig;
use crate::connection::{self, ConnectionState, Shared};
use crate::error::Result;
use crate::event::ClientEvent;

/// A remote-console client bound to one server.
///
/// All operations take `&self`; the client can be shared behind an `Arc`
/// and used from several tasks. Commands are still issued one at a time on
/// the wire: a second `send_command` while one is outstanding fails with
/// [`crate::ClientError::CommandInFlight`].
///
/// Dropping the client stops its background tasks and closes the
/// connection.
pub struct RconClient {
    shared: Arc<Shared>,
}

impl RconClient {
    /// Create a disconnected client. Nothing touches the network yet.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Shared::new(config),
        })
    }

    /// Create a client, connect, and authenticate with the configured
    /// password if there is one.
    ///
    /// On authentication failure the connection is closed before the error
    /// is returned.
    pub async fn open(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.connect().await?;
        if let Some(password) = client.shared.config.password.clone() {
            if let Err(err) = client.authenticate(&password).await {
                client.disconnect().await;
                return Err(err);
            }
        }
        Ok(client)
    }

    /// Open the TCP connection.
    pub async fn connect(&self) -> Result<()> {
        connection::connect(&self.shared).await
    }

    /// Authenticate the current connection.
    pub async fn authenticate(&self, password: &str) -> Result<()> {
        connection::authenticate(&self.shared, password).await
    }

    /// Run a command and return the complete response text.
    pub async fn send_command(&self, command: &str) -> Result<String> {
        connection::send_command(&self.shared, command).await
    }

    /// Close the connection and fail anything pending. Idempotent.
    pub async fn disconnect(&self) {
        connection::disconnect(&self.shared).await
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn auth_state(&self) -> AuthState {
        self.shared.auth_state()
    }

    /// Configured `host:port`.
    pub fn server_address(&self) -> String {
        self.shared.config.address()
    }

    /// Resolved address of the live connection.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.peer_addr()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Receive lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for RconClient {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl fmt::Debug for RconClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconClient")
            .field("address", &self.server_address())
            .field("state", &self.state())
            .field("auth_state", &self.auth_state())
            .finish()
    }
}
