//! Pooled read buffer
//!
//! Fixed-size byte block handed to the transport for one read
//! notification and returned to its pool when that notification has been
//! fully processed.

use std::ops::{Deref, DerefMut};

/// Size of one pooled read buffer in bytes
pub const READ_BUFFER_SIZE: usize = 512;

/// A fixed-size byte block stored inline in a pool slot
pub struct ReadBuffer {
    bytes: [u8; READ_BUFFER_SIZE],
}

impl ReadBuffer {
    /// Create a zero-filled buffer
    pub fn zeroed() -> Self {
        Self {
            bytes: [0u8; READ_BUFFER_SIZE],
        }
    }

    /// Buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        READ_BUFFER_SIZE
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Deref for ReadBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for ReadBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}
