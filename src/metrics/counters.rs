//! Atomic counters for hot-path metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics instance
pub static METRICS: Metrics = Metrics::new();

/// Atomic metrics counters
pub struct Metrics {
    // Connection metrics
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub connections_failed: AtomicU64,

    // Read-path metrics
    pub bytes_received: AtomicU64,
    pub reads_total: AtomicU64,
    pub read_errors: AtomicU64,

    // Pool metrics
    pub buffer_pool_exhausted: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            connections_failed: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            reads_total: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            buffer_pool_exhausted: AtomicU64::new(0),
        }
    }

    // Connection tracking
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_failed(&self) {
        self.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    // Read-path tracking
    #[inline]
    pub fn bytes_rx(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
        self.reads_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Pool tracking
    #[inline]
    pub fn buffer_exhausted(&self) {
        self.buffer_pool_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            connections_failed: self.connections_failed.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            reads_total: self.reads_total.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            buffer_pool_exhausted: self.buffer_pool_exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics for reporting
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub connections_rejected: u64,
    pub connections_failed: u64,
    pub bytes_received: u64,
    pub reads_total: u64,
    pub read_errors: u64,
    pub buffer_pool_exhausted: u64,
}
