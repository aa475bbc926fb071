use std::fmt;
use std::time::Duration;

use rconwire_frame::FrameError;
use rconwire_transport::TransportError;
use serde::Serialize;

/// Why a connection went away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The caller asked for it.
    Requested,
    /// The server closed the stream or a read/write failed.
    ConnectionLost(String),
    /// The server sent bytes that do not decode as a frame.
    ProtocolViolation(String),
}

impl DisconnectReason {
    /// Whether this teardown should trigger automatic reconnection.
    pub fn is_unexpected(&self) -> bool {
        !matches!(self, DisconnectReason::Requested)
    }

    /// The error handed to requests that were still pending at teardown.
    ///
    /// A protocol violation surfaces as the corrupt frame that caused it.
    pub fn pending_error(&self) -> ClientError {
        match self {
            DisconnectReason::ProtocolViolation(detail) => {
                ClientError::Protocol(FrameError::CorruptFrame {
                    reason: detail.clone(),
                })
            }
            other => ClientError::Disconnected(other.clone()),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => f.write_str("disconnect requested"),
            DisconnectReason::ConnectionLost(detail) => write!(f, "connection lost: {detail}"),
            DisconnectReason::ProtocolViolation(detail) => {
                write!(f, "protocol violation: {detail}")
            }
        }
    }
}

/// Coarse classification of [`ClientError`] for callers that only need to
/// decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The transport failed or went away. Reconnecting may help.
    Connection,
    /// The server rejected the credentials.
    Authentication,
    /// The server sent something undecodable. The connection is gone.
    Protocol,
    /// No response arrived in time. The connection is still usable.
    Timeout,
    /// The call was not valid in the current state. Nothing was sent.
    Precondition,
    /// A bug in the client.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Opening the TCP connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[from] TransportError),

    /// The connection was torn down while the operation was pending.
    #[error("disconnected ({0})")]
    Disconnected(DisconnectReason),

    /// Writing to the connection failed.
    #[error("write failed: {0}")]
    Io(std::io::Error),

    /// `connect` was called on a client that is not disconnected.
    #[error("already connected")]
    AlreadyConnected,

    /// The server answered the auth request with the failure sentinel.
    #[error("authentication failed: server rejected the password")]
    AuthenticationFailed,

    /// A frame could not be encoded or the server sent a corrupt one.
    #[error("protocol error: {0}")]
    Protocol(FrameError),

    /// No response arrived before the per-operation timeout.
    #[error("request {id} timed out after {timeout:?}")]
    CommandTimeout { id: i32, timeout: Duration },

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// Commands need a successful authentication first.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A previous command has not finished yet.
    #[error("another command is still in flight")]
    CommandInFlight,

    /// An authentication request is already pending.
    #[error("authentication already in progress")]
    AuthInProgress,

    /// A request id was registered twice.
    #[error("request id {0} is already pending")]
    DuplicateRequest(i32),

    /// The client configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::ConnectionFailed(_) | ClientError::Disconnected(_) | ClientError::Io(_) => {
                ErrorKind::Connection
            }
            ClientError::AuthenticationFailed => ErrorKind::Authentication,
            ClientError::Protocol(
                FrameError::PayloadTooLarge { .. } | FrameError::InvalidPayload { .. },
            ) => ErrorKind::Precondition,
            ClientError::Protocol(_) => ErrorKind::Protocol,
            ClientError::CommandTimeout { .. } => ErrorKind::Timeout,
            ClientError::AlreadyConnected
            | ClientError::NotConnected
            | ClientError::NotAuthenticated
            | ClientError::CommandInFlight
            | ClientError::AuthInProgress
            | ClientError::InvalidConfig(_) => ErrorKind::Precondition,
            ClientError::DuplicateRequest(_) => ErrorKind::Internal,
        }
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => ClientError::Io(io),
            FrameError::ConnectionClosed => ClientError::Disconnected(
                DisconnectReason::ConnectionLost("connection closed by server".to_string()),
            ),
            other => ClientError::Protocol(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ClientError::NotAuthenticated.kind(), ErrorKind::Precondition);
        assert_eq!(ClientError::CommandInFlight.kind(), ErrorKind::Precondition);
        assert_eq!(ClientError::AuthenticationFailed.kind(), ErrorKind::Authentication);
        assert_eq!(ClientError::DuplicateRequest(3).kind(), ErrorKind::Internal);
        assert_eq!(
            ClientError::CommandTimeout {
                id: 1,
                timeout: Duration::from_secs(5)
            }
            .kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ClientError::Disconnected(DisconnectReason::Requested).kind(),
            ErrorKind::Connection
        );
    }

    #[test]
    fn pending_error_follows_reason() {
        let err = DisconnectReason::ProtocolViolation("declared length -5".into()).pending_error();
        assert!(
            matches!(&err, ClientError::Protocol(FrameError::CorruptFrame { reason }) if reason == "declared length -5"),
            "{err:?}"
        );
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = DisconnectReason::ConnectionLost("eof".into()).pending_error();
        assert!(matches!(
            err,
            ClientError::Disconnected(DisconnectReason::ConnectionLost(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn frame_errors_map_by_origin() {
        let err = ClientError::from(FrameError::ConnectionClosed);
        assert!(matches!(
            err,
            ClientError::Disconnected(DisconnectReason::ConnectionLost(_))
        ));

        let err = ClientError::from(FrameError::Io(std::io::Error::from(
            std::io::ErrorKind::BrokenPipe,
        )));
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = ClientError::from(FrameError::InvalidPayload { offset: 0 });
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let err = ClientError::from(FrameError::CorruptFrame {
            reason: "bad length".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn display_is_human_readable() {
        let err = ClientError::CommandTimeout {
            id: 7,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "request 7 timed out after 5s");

        let err = ClientError::Disconnected(DisconnectReason::ConnectionLost(
            "connection closed by server".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "disconnected (connection lost: connection closed by server)"
        );
    }

    #[test]
    fn reason_serializes_with_kind_tag() {
        let json = serde_json::to_value(DisconnectReason::ProtocolViolation("x".into())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "protocol_violation", "detail": "x" })
        );
        let json = serde_json::to_value(DisconnectReason::Requested).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "requested" }));
    }
}
