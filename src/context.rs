//! Application context
//!
//! Process-wide state constructed once during bootstrap and threaded
//! explicitly through the server and lifecycle manager (no globals).

use std::cell::RefCell;

use crate::config::Config;
use crate::connection::ConnectionRecord;
use crate::pool::{PoolError, ReadBuffer, SlabPool};

/// Configuration plus the two pools.
///
/// Shared as `Rc<AppContext>` between the accept loop and the
/// per-connection tasks, which all run on the same thread; the RefCell
/// borrows are short-lived and never held across a suspension point.
pub struct AppContext {
    pub config: Config,
    /// Pool of per-connection records, sized for peak simultaneous load
    pub conn_pool: RefCell<SlabPool<ConnectionRecord>>,
    /// Pool of read buffers, one per in-flight read notification
    pub buf_pool: RefCell<SlabPool<ReadBuffer>>,
}

impl AppContext {
    /// Initialize both pools at their configured fixed capacities
    pub fn new(config: Config) -> Result<Self, PoolError> {
        let conn_pool = SlabPool::new(config.pool.connection_slots)?;
        let buf_pool = SlabPool::new(config.pool.buffer_slots)?;
        Ok(Self {
            config,
            conn_pool: RefCell::new(conn_pool),
            buf_pool: RefCell::new(buf_pool),
        })
    }
}
