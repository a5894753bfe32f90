//! Utility modules

mod socket;
mod tracing_setup;

pub use socket::bind_tcp_listener;
pub use tracing_setup::init_tracing;
