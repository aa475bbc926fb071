use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::Result;

/// A connected remote-console stream.
///
/// Wraps the tokio TCP stream together with the address it was opened
/// against, so log lines and errors above this layer can name the server.
pub struct RconStream {
    inner: TcpStream,
    peer: SocketAddr,
}

impl RconStream {
    pub(crate) fn from_tcp(inner: TcpStream, peer: SocketAddr) -> Self {
        Self { inner, peer }
    }

    /// Address of the remote server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the stream.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Disable Nagle's algorithm. Command frames are small and latency-bound.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        Ok(self.inner.set_nodelay(nodelay)?)
    }

    /// Split into owned halves for the read loop and the writer.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.inner.into_split()
    }

    /// Consume the wrapper and return the tokio stream.
    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

impl std::fmt::Debug for RconStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconStream")
            .field("type", &"tcp")
            .field("peer", &self.peer)
            .finish()
    }
}
