//! Fixed-capacity slab pool
//!
//! Pre-allocated slots with O(1) allocation and deallocation through an
//! intrusive free list. The pool never grows: once every slot is live,
//! `allocate` reports [`PoolError::Exhausted`].

use thiserror::Error;

/// Errors reported by [`SlabPool`]
///
/// Misuse (double free, foreign handle) is a detected, reported error,
/// never undefined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Requested capacity cannot be represented
    #[error("pool capacity {0} is invalid (must be 1..=u32::MAX)")]
    InvalidCapacity(usize),
    /// Every slot is live; the pool never grows
    #[error("pool exhausted, all slots in use")]
    Exhausted,
    /// Handle does not name a slot of this pool
    #[error("handle {0} is out of range for this pool")]
    InvalidHandle(usize),
    /// The slot named by the handle is already on the free list
    #[error("slot {0} is already free")]
    DoubleFree(usize),
    /// Free-list invariant violated
    #[error("free list corrupted at slot {0}")]
    Corrupted(usize),
}

/// Handle to a live slot in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle(u32);

impl SlotHandle {
    /// Get the raw slot index
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One slot: either a free-list link or a live payload.
///
/// The `Free` variant plays the role of the hidden per-slot header in a
/// classic intrusive pool; the link lives in the slot itself, so the free
/// list costs no extra storage.
enum Slot<T> {
    Free { next: Option<u32> },
    Live(T),
}

/// Fixed-capacity, fixed-element-size pool.
///
/// Every slot is in exactly one of two disjoint sets at all times: free
/// (reachable from `head` through the link chain) or live (handed to a
/// caller). The free list is a singly linked LIFO stack, so the most
/// recently freed slot is reused first.
pub struct SlabPool<T> {
    /// Contiguous backing store, exactly `capacity` slots
    slots: Box<[Slot<T>]>,
    /// First free slot, or `None` when the pool is exhausted
    head: Option<u32>,
    /// Number of live slots
    live: usize,
}

impl<T> SlabPool<T> {
    /// Create a pool with `capacity` slots, all free.
    ///
    /// The free list links slot i to slot i+1, terminating at the last
    /// slot, with `head` at slot 0.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 || capacity > u32::MAX as usize {
            return Err(PoolError::InvalidCapacity(capacity));
        }

        let slots: Box<[Slot<T>]> = (0..capacity)
            .map(|i| {
                let next = i + 1;
                Slot::Free {
                    next: (next < capacity).then_some(next as u32),
                }
            })
            .collect();

        Ok(Self {
            slots,
            head: Some(0),
            live: 0,
        })
    }

    /// Allocate a slot and place `value` in it. O(1).
    ///
    /// Pops the head of the free list; returns [`PoolError::Exhausted`]
    /// when no slot is free.
    pub fn allocate(&mut self, value: T) -> Result<SlotHandle, PoolError> {
        let idx = self.head.ok_or(PoolError::Exhausted)?;
        let next = match &self.slots[idx as usize] {
            Slot::Free { next } => *next,
            // A live slot on the free list means the list is corrupt.
            Slot::Live(_) => return Err(PoolError::Corrupted(idx as usize)),
        };

        self.slots[idx as usize] = Slot::Live(value);
        self.head = next;
        self.live += 1;
        Ok(SlotHandle(idx))
    }

    /// Return a slot to the pool, yielding its payload. O(1).
    ///
    /// The slot becomes the new head of the free list (LIFO reuse).
    /// Deallocating an already-free slot or a handle that does not belong
    /// to this pool is a reported error.
    pub fn deallocate(&mut self, handle: SlotHandle) -> Result<T, PoolError> {
        let idx = handle.index();
        if idx >= self.slots.len() {
            return Err(PoolError::InvalidHandle(idx));
        }
        if matches!(self.slots[idx], Slot::Free { .. }) {
            return Err(PoolError::DoubleFree(idx));
        }

        let prev = std::mem::replace(&mut self.slots[idx], Slot::Free { next: self.head });
        self.head = Some(handle.0);
        self.live -= 1;
        match prev {
            Slot::Live(value) => Ok(value),
            // Excluded by the check above.
            Slot::Free { .. } => Err(PoolError::Corrupted(idx)),
        }
    }

    /// Get a reference to the payload of a live slot
    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        match self.slots.get(handle.index()) {
            Some(Slot::Live(value)) => Some(value),
            _ => None,
        }
    }

    /// Get a mutable reference to the payload of a live slot
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        match self.slots.get_mut(handle.index()) {
            Some(Slot::Live(value)) => Some(value),
            _ => None,
        }
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no slot is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Check if every slot is live
    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.slots.len() - self.live
    }
}
