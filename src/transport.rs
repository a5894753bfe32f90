//! Transport seam
//!
//! Narrow interface the lifecycle manager drives a connection through.
//! Each asynchronous operation resolves exactly once, at its completion;
//! the production implementation is `tokio::net::TcpStream`, tests supply
//! a scripted fake.

use std::io;
use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Operations the lifecycle manager needs from a connected socket.
///
/// `readable` and `close` are suspension points; `peer_addr` and
/// `try_read` are synchronous. Splitting the read into wait-then-read
/// keeps pool borrows out of suspension points: a buffer is allocated
/// only once data is ready and is released before the next wait.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Query the remote endpoint of the connection
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Wait until the next inbound-data notification
    async fn readable(&self) -> io::Result<()>;

    /// Read available bytes into `buf` without blocking.
    ///
    /// Returns `Ok(0)` on EOF and `ErrorKind::WouldBlock` when the
    /// readiness notification was spurious.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Request close and wait for its completion notification
    async fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    async fn readable(&self) -> io::Result<()> {
        TcpStream::readable(self).await
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    async fn close(&mut self) -> io::Result<()> {
        self.shutdown().await
    }
}
