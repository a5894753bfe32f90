//! Connection management
//!
//! Per-connection state and the lifecycle state machine coupling pool
//! usage to transport completions.

mod lifecycle;
mod state;

pub use lifecycle::LifecycleManager;
pub use state::{
    AddressFamily, ConnectionId, ConnectionPhase, ConnectionRecord, PeerDescriptor,
};
