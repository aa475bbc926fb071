use std::fmt;
use std::io;

use rconwire_client::{ClientError, ErrorKind};
use rconwire_frame::FrameError;
use rconwire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const AUTH_FAILED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err.io_kind() {
        Some(io::ErrorKind::TimedOut) => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. }
        | FrameError::InvalidPayload { .. }
        | FrameError::CorruptFrame { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::ConnectionFailed(err) => {
            transport_error(&format!("{context}: connection failed"), err)
        }
        ClientError::Io(err) => io_error(context, err),
        ClientError::Protocol(err) => frame_error(context, err),
        other @ ClientError::InvalidConfig(_) => CliError::usage(format!("{context}: {other}")),
        other => {
            let code = match other.kind() {
                ErrorKind::Connection | ErrorKind::Protocol => TRANSPORT_ERROR,
                ErrorKind::Authentication => AUTH_FAILED,
                ErrorKind::Timeout => TIMEOUT,
                ErrorKind::Precondition => FAILURE,
                ErrorKind::Internal => INTERNAL,
            };
            CliError::new(code, format!("{context}: {other}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rconwire_client::DisconnectReason;

    use super::*;

    #[test]
    fn client_errors_map_to_exit_codes() {
        let cases = [
            (ClientError::AuthenticationFailed, AUTH_FAILED),
            (
                ClientError::CommandTimeout {
                    id: 4,
                    timeout: Duration::from_secs(5),
                },
                TIMEOUT,
            ),
            (
                ClientError::Disconnected(DisconnectReason::ConnectionLost("eof".into())),
                TRANSPORT_ERROR,
            ),
            (ClientError::NotAuthenticated, FAILURE),
            (ClientError::InvalidConfig("port".into()), USAGE),
            (ClientError::DuplicateRequest(1), INTERNAL),
            (
                ClientError::Protocol(FrameError::InvalidPayload { offset: 0 }),
                DATA_INVALID,
            ),
            (
                ClientError::Protocol(FrameError::CorruptFrame {
                    reason: "declared length -5".into(),
                }),
                DATA_INVALID,
            ),
        ];
        for (err, code) in cases {
            let rendered = err.to_string();
            let cli = client_error("exec failed", err);
            assert_eq!(cli.code, code, "{rendered}");
            assert!(cli.message.starts_with("exec failed: "));
        }
    }

    #[test]
    fn refused_connect_is_a_transport_error() {
        let err = ClientError::ConnectionFailed(TransportError::Connect {
            address: "127.0.0.1:1".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        assert_eq!(client_error("connect failed", err).code, TRANSPORT_ERROR);

        let err = ClientError::ConnectionFailed(TransportError::Timeout {
            address: "10.0.0.1:25575".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(client_error("connect failed", err).code, TIMEOUT);

        let err = ClientError::ConnectionFailed(TransportError::Connect {
            address: "10.0.0.1:25575".into(),
            source: io::Error::from(io::ErrorKind::TimedOut),
        });
        assert_eq!(client_error("connect failed", err).code, TIMEOUT);
    }
}
