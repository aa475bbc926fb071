/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload contains a NUL byte, which would end the packet early.
    #[error("payload contains a NUL byte at offset {offset}")]
    InvalidPayload { offset: usize },

    /// The stream carried a packet that cannot be decoded. The stream is
    /// desynchronized from this point on.
    #[error("corrupt frame: {reason}")]
    CorruptFrame { reason: String },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was transferred.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        FrameError::CorruptFrame {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
