//! Memory pool management
//!
//! Fixed-capacity slab pools backing connection state and read buffers.

mod buffer;
mod slab;

pub use buffer::{ReadBuffer, READ_BUFFER_SIZE};
pub use slab::{PoolError, SlabPool, SlotHandle};
