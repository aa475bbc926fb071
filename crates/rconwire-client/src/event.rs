use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::sync::broadcast;

use crate::error::DisconnectReason;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle notifications published by a client.
///
/// Delivered over a broadcast channel; a slow subscriber lags and loses the
/// oldest events rather than blocking the connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Connected,
    Authenticated,
    Disconnected {
        reason: DisconnectReason,
    },
    AuthFailed {
        reason: String,
    },
    Error {
        cause: String,
    },
    Reconnecting {
        attempt: u32,
        #[serde(rename = "delay_ms", serialize_with = "as_millis")]
        delay: Duration,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Connected => "connected",
            ClientEvent::Authenticated => "authenticated",
            ClientEvent::Disconnected { .. } => "disconnected",
            ClientEvent::AuthFailed { .. } => "auth_failed",
            ClientEvent::Error { .. } => "error",
            ClientEvent::Reconnecting { .. } => "reconnecting",
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::Connected => f.write_str("connected"),
            ClientEvent::Authenticated => f.write_str("authenticated"),
            ClientEvent::Disconnected { reason } => write!(f, "disconnected: {reason}"),
            ClientEvent::AuthFailed { reason } => write!(f, "authentication failed: {reason}"),
            ClientEvent::Error { cause } => write!(f, "error: {cause}"),
            ClientEvent::Reconnecting { attempt, delay } => {
                write!(f, "reconnecting (attempt {attempt}) in {delay:?}")
            }
        }
    }
}

fn as_millis<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
}

/// Sending side of the event channel.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub(crate) fn emit(&self, event: ClientEvent) {
        tracing::trace!(event = event.name(), "client event");
        let _ = self.tx.send(event);
    }
}
