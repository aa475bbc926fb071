use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::RconStream;

/// Conventional remote-console port.
pub const DEFAULT_PORT: u16 = 25575;

/// `host:port`, with IPv6 literals bracketed (`[::1]:25575`).
pub fn display_address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Resolve `host:port` and connect to the first address that accepts,
/// giving up once `timeout` has elapsed across all attempts.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<RconStream> {
    let address = display_address(host, port);
    let host = host.trim_start_matches('[').trim_end_matches(']');

    match tokio::time::timeout(timeout, connect_any(host, port, &address)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout { address, timeout }),
    }
}

async fn connect_any(host: &str, port: u16, address: &str) -> Result<RconStream> {
    let candidates: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            address: address.to_string(),
            source,
        })?
        .collect();

    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            address: address.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ),
        });
    }

    let mut last_err = None;
    for candidate in candidates {
        debug!(%candidate, "attempting tcp connect");
        match TcpStream::connect(candidate).await {
            Ok(stream) => {
                let stream = RconStream::from_tcp(stream, candidate);
                stream.set_nodelay(true)?;
                info!(%candidate, "connected");
                return Ok(stream);
            }
            Err(err) => {
                debug!(%candidate, error = %err, "tcp connect failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        address: address.to_string(),
        source: last_err
            .unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
    })
}
