//! Connection lifecycle manager
//!
//! Drives each connection through an explicit state machine
//! (Accepted -> Reading -> Closing -> Closed) and couples the pools to
//! the completion lifecycle of the transport: a pooled object is
//! returned iff every operation issued against it has delivered its
//! completion. No path returns a slot at the point an operation is
//! merely requested.

use std::cell::Cell;
use std::io;
use std::rc::Rc;

use tracing::{debug, error, info, trace, warn};

use crate::context::AppContext;
use crate::metrics::METRICS;
use crate::pool::{PoolError, ReadBuffer, SlotHandle};
use crate::transport::Transport;

use super::state::{ConnectionId, ConnectionPhase, ConnectionRecord, PeerDescriptor};

/// What to do after one read notification has been processed
enum ReadStep {
    /// Wait for the next notification
    Continue,
    /// Stop reading and enter the close path
    Close,
}

/// Orchestrates accept, read and close transitions for all connections
pub struct LifecycleManager {
    ctx: Rc<AppContext>,
    next_id: Cell<u64>,
}

impl LifecycleManager {
    /// Create a manager over an initialized context
    pub fn new(ctx: Rc<AppContext>) -> Rc<Self> {
        Rc::new(Self {
            ctx,
            next_id: Cell::new(1),
        })
    }

    /// Shared application context
    pub fn context(&self) -> &Rc<AppContext> {
        &self.ctx
    }

    /// Reserve a connection record ahead of confirming the connection.
    ///
    /// The slot is live from this point on and is only returned through
    /// the close path inside [`drive`](Self::drive). Exhaustion is the
    /// admission bound: the caller rejects the connection.
    pub fn reserve(&self) -> Result<SlotHandle, PoolError> {
        let id = ConnectionId::from_raw(self.next_id.get());
        self.next_id.set(id.as_u64() + 1);

        let handle = self
            .ctx
            .conn_pool
            .borrow_mut()
            .allocate(ConnectionRecord::new(id))?;

        METRICS.connection_opened();
        debug!(conn_id = %id, slot = handle.index(), "connection slot reserved");
        Ok(handle)
    }

    /// Current phase of a connection, if its slot is still live
    pub fn phase(&self, handle: SlotHandle) -> Option<ConnectionPhase> {
        self.ctx.conn_pool.borrow().get(handle).map(|r| r.phase)
    }

    /// Number of live connection records
    pub fn connection_count(&self) -> usize {
        self.ctx.conn_pool.borrow().len()
    }

    /// Drive one connection from a reserved slot to close completion.
    ///
    /// Consumes the transport; when this returns, the record slot and
    /// every buffer it touched are back in their pools.
    pub async fn drive<T: Transport>(&self, handle: SlotHandle, mut transport: T) {
        let Some(id) = self.ctx.conn_pool.borrow().get(handle).map(|r| r.id) else {
            error!(slot = handle.index(), "drive called with a dead slot");
            return;
        };

        // Peer resolution. A failure aborts the connection, but the slot
        // travels through the close path: the close must complete before
        // the record can be returned.
        match transport.peer_addr() {
            Ok(addr) => {
                let peer = PeerDescriptor::from(addr);
                info!(conn_id = %id, peer = %peer, "accepted connection");
                if let Some(rec) = self.ctx.conn_pool.borrow_mut().get_mut(handle) {
                    rec.source = Some(peer);
                    rec.phase = ConnectionPhase::Reading;
                }
            }
            Err(e) => {
                warn!(conn_id = %id, error = %e, "peer address lookup failed");
                METRICS.connection_failed();
                self.close(handle, id, &mut transport).await;
                return;
            }
        }

        self.read_loop(handle, id, &mut transport).await;
        self.close(handle, id, &mut transport).await;
    }

    /// Service inbound-data notifications until EOF, error or buffer
    /// exhaustion.
    ///
    /// Each cycle is two-phase: a buffer is allocated when data is ready
    /// and returned once the notification has been processed, on every
    /// path.
    async fn read_loop<T: Transport>(&self, handle: SlotHandle, id: ConnectionId, transport: &mut T) {
        loop {
            if let Err(e) = transport.readable().await {
                warn!(conn_id = %id, error = %e, "wait for readable failed");
                return;
            }

            // Allocate phase: one buffer per notification.
            let buf_handle = match self.ctx.buf_pool.borrow_mut().allocate(ReadBuffer::zeroed()) {
                Ok(h) => h,
                Err(e) => {
                    warn!(conn_id = %id, error = %e, "buffer pool exhausted, closing connection");
                    METRICS.buffer_exhausted();
                    return;
                }
            };

            let result = {
                let mut bufs = self.ctx.buf_pool.borrow_mut();
                match bufs.get_mut(buf_handle) {
                    Some(buf) => transport.try_read(buf),
                    None => Err(io::Error::other("read buffer slot vanished")),
                }
            };

            // Completion phase: the buffer goes back before anything
            // else happens, no matter how the read went.
            let step = self.process_read(handle, id, result);
            self.release_buffer(id, buf_handle);

            match step {
                ReadStep::Continue => continue,
                ReadStep::Close => return,
            }
        }
    }

    /// Classify one read completion and update the record
    fn process_read(
        &self,
        handle: SlotHandle,
        id: ConnectionId,
        result: io::Result<usize>,
    ) -> ReadStep {
        match result {
            Ok(0) => {
                debug!(conn_id = %id, "peer closed the connection");
                ReadStep::Close
            }
            Ok(n) => {
                // Inbound bytes are consumed and discarded.
                trace!(conn_id = %id, bytes = n, "read");
                METRICS.bytes_rx(n as u64);
                if let Some(rec) = self.ctx.conn_pool.borrow_mut().get_mut(handle) {
                    rec.record_rx(n as u64);
                }
                ReadStep::Continue
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => ReadStep::Continue,
            Err(e) => {
                warn!(conn_id = %id, error = %e, "read failed");
                METRICS.read_error();
                ReadStep::Close
            }
        }
    }

    fn release_buffer(&self, id: ConnectionId, buf_handle: SlotHandle) {
        // A failure here means the buffer lifecycle is broken somewhere.
        if let Err(e) = self.ctx.buf_pool.borrow_mut().deallocate(buf_handle) {
            error!(conn_id = %id, error = %e, "read buffer release failed");
        }
    }

    /// Close path: request close, and only once its completion has been
    /// observed return the record slot to the connection pool.
    async fn close<T: Transport>(&self, handle: SlotHandle, id: ConnectionId, transport: &mut T) {
        if let Some(rec) = self.ctx.conn_pool.borrow_mut().get_mut(handle) {
            rec.phase = ConnectionPhase::Closing;
        }

        // The record stays live across this suspension point; the close
        // completion is the release authorization.
        if let Err(e) = transport.close().await {
            debug!(conn_id = %id, error = %e, "close reported an error");
        }

        let released = {
            let mut pool = self.ctx.conn_pool.borrow_mut();
            if let Some(rec) = pool.get_mut(handle) {
                rec.phase = ConnectionPhase::Closed;
            }
            pool.deallocate(handle)
        };

        match released {
            Ok(rec) => {
                METRICS.connection_closed();
                info!(conn_id = %id, bytes_rx = rec.bytes_rx, "connection closed");
            }
            Err(e) => error!(conn_id = %id, error = %e, "connection slot release failed"),
        }
    }
}
