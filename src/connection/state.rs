//! Connection state

use std::net::SocketAddr;

/// Unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Create from raw u64
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Address family of a peer endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// One end of a connection: family, textual address and port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
    pub family: AddressFamily,
    pub addr: String,
    pub port: u16,
}

impl From<SocketAddr> for PeerDescriptor {
    fn from(addr: SocketAddr) -> Self {
        Self {
            family: if addr.is_ipv4() {
                AddressFamily::V4
            } else {
                AddressFamily::V6
            },
            addr: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl std::fmt::Display for PeerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Connection lifecycle phase
///
/// A record slot is reserved on entry to `Accepted` and returned to its
/// pool only on the transition into `Closed`, which happens strictly
/// after the close completion has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Slot reserved, handshake/peer lookup in progress
    Accepted,
    /// Inbound-data notifications are being serviced
    Reading,
    /// Close requested, completion not yet observed
    Closing,
    /// Close completion observed; the slot is about to be returned
    Closed,
}

/// Per-connection record stored in the connection pool
#[derive(Debug)]
pub struct ConnectionRecord {
    /// Unique identifier
    pub id: ConnectionId,
    /// Lifecycle phase
    pub phase: ConnectionPhase,
    /// Remote endpoint, populated after a successful peer lookup
    pub source: Option<PeerDescriptor>,
    /// Upstream endpoint for a forwarding leg. Never populated here;
    /// kept for symmetry with `source`.
    pub destination: Option<PeerDescriptor>,
    /// Bytes received over the connection's lifetime
    pub bytes_rx: u64,
}

impl ConnectionRecord {
    /// Create a fresh record in the `Accepted` phase
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            phase: ConnectionPhase::Accepted,
            source: None,
            destination: None,
            bytes_rx: 0,
        }
    }

    /// Record received bytes
    pub fn record_rx(&mut self, bytes: u64) {
        self.bytes_rx = self.bytes_rx.saturating_add(bytes);
    }
}
