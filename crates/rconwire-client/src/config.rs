use std::fmt;
use std::time::Duration;

use rconwire_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use rconwire_transport::DEFAULT_PORT;

use crate::error::{ClientError, Result};

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client connection settings.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server port. Default: 25575.
    pub port: u16,
    /// Password used by `open` and by re-authentication after a reconnect.
    /// Never logged; redacted in debug output.
    pub password: Option<String>,
    /// Deadline for connect, authenticate and each command.
    pub timeout: Duration,
    /// Payload ceiling applied to both directions.
    pub max_payload_size: usize,
    /// Automatic reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            password: None,
            timeout: DEFAULT_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn address(&self) -> String {
        rconwire_transport::display_address(&self.host, self.port)
    }

    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::InvalidConfig("port must not be 0".into()));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.max_payload_size == 0 {
            return Err(ClientError::InvalidConfig(
                "max payload size must be greater than zero".into(),
            ));
        }
        if let Some(password) = &self.password {
            rconwire_frame::check_payload(password.as_bytes(), self.max_payload_size).map_err(
                |err| ClientError::InvalidConfig(format!("password is not sendable: {err}")),
            )?;
        }
        self.reconnect.validate()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ClientConfig");
        dbg.field("host", &self.host).field("port", &self.port);
        if let Some(password) = &self.password {
            dbg.field(
                "password",
                &format_args!("<redacted:{} bytes>", password.len()),
            );
        } else {
            dbg.field("password", &Option::<String>::None);
        }
        dbg.field("timeout", &self.timeout)
            .field("max_payload_size", &self.max_payload_size)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

/// Exponential backoff for automatic reconnection.
///
/// Attempt `n` (1-based) waits `initial_delay * multiplier^(n-1)`, capped at
/// `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Reconnect after an unexpected disconnect. Default: off.
    pub enabled: bool,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: Some(10),
        }
    }
}

impl ReconnectConfig {
    /// Default backoff with reconnection switched on.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            self.max_delay
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }

    fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ClientError::InvalidConfig(format!(
                "reconnect multiplier must be >= 1.0 (got {})",
                self.multiplier
            )));
        }
        if self.max_delay < self.initial_delay {
            return Err(ClientError::InvalidConfig(
                "reconnect max delay is shorter than the initial delay".into(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(ClientError::InvalidConfig(
                "reconnect max attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
