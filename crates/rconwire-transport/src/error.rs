use std::time::Duration;

/// Errors that can occur while establishing or using the TCP transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name did not resolve to any socket address.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// The connect attempt did not finish before the deadline.
    #[error("connecting to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The underlying I/O error kind, when there is one.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            TransportError::Resolve { source, .. } | TransportError::Connect { source, .. } => {
                Some(source.kind())
            }
            TransportError::Io(err) => Some(err.kind()),
            TransportError::Timeout { .. } => Some(std::io::ErrorKind::TimedOut),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
