//! Pooled-memory TCP listening service
//!
//! A TCP server bootstrap built around two fixed-capacity slab pools:
//! one for per-connection records, one for per-read byte buffers. The
//! runtime is single-threaded and cooperative; pool slots are returned
//! strictly when the corresponding asynchronous operation has delivered
//! its completion.

pub mod config;
pub mod connection;
pub mod context;
pub mod metrics;
pub mod pool;
pub mod server;
pub mod transport;
pub mod util;

pub use config::Config;
pub use server::Server;

/// Server version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
