//! Server implementation
//!
//! Listener bootstrap and the accept loop.

mod listener;

pub use listener::Server;
