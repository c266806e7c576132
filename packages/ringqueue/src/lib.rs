//! Fixed-capacity FIFO queue of owned values backed by a ring buffer.

use std::{
    fmt::{self, Debug, Formatter},
    mem::MaybeUninit,
};


/// Error for pushing into a queue that is already at capacity.
///
/// The rejected value is handed back to the caller.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct CapacityError<T>(pub T);

impl<T> CapacityError<T> {
    /// Recover the value that could not be pushed.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Debug for CapacityError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("CapacityError(..)")
    }
}

impl<T> fmt::Display for CapacityError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("queue is at capacity")
    }
}

impl<T> std::error::Error for CapacityError<T> {}


/// Fixed-capacity FIFO queue of owned values backed by a ring buffer.
///
/// The capacity is chosen at construction and never changes; the queue performs a single
/// allocation up front and never reallocates. Pushing into a full queue is rejected with
/// [`CapacityError`], which hands the value back.
pub struct RingQueue<T> {
    // memory layout:
    //
    // - a "logical index" exists iff it is in [0, len)
    // - logical index i maps to storage index (start + i) % capacity
    // - storage locations are assumed to be initialized iff a logical index maps to them
    start: usize,
    len: usize,
    slots: Box<[MaybeUninit<T>]>,
}

impl<T> RingQueue<T> {
    /// Construct empty with the given fixed capacity.
    ///
    /// A capacity of zero is permitted; such a queue rejects every push.
    pub fn new(capacity: usize) -> Self {
        RingQueue {
            start: 0,
            len: 0,
            slots: Box::new_uninit_slice(capacity),
        }
    }

    /// Fixed capacity in elements.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current length in elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no elements are currently stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the queue currently holds `capacity` elements.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    // convert from logical index to storage index.
    fn storage_idx(&self, idx: usize) -> usize {
        debug_assert!(self.len <= self.capacity(), "RingQueue len > cap (internal bug)");
        debug_assert!(idx < self.len, "RingQueue index out of bounds (internal bug)");
        (self.start + idx) % self.capacity()
    }

    /// Push a value onto the back of the queue.
    ///
    /// Errors if the queue is at capacity, handing the value back.
    pub fn push(&mut self, value: T) -> Result<(), CapacityError<T>> {
        if self.is_full() {
            return Err(CapacityError(value));
        }
        let idx = (self.start + self.len) % self.capacity();
        self.slots[idx].write(value);
        self.len += 1;
        Ok(())
    }

    /// Pop the value at the front of the queue, or `None` if empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let idx = self.start;
        self.start = (self.start + 1) % self.capacity();
        self.len -= 1;
        // safety: idx was the storage index of logical index 0, so the slot is initialized.
        // start and len have already been adjusted so no logical index maps to it any more.
        Some(unsafe { self.slots[idx].assume_init_read() })
    }

    /// Borrow the value at the front of the queue, or `None` if empty.
    pub fn front(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let idx = self.storage_idx(0);
        // safety: logical index 0 maps to this slot, so it is initialized.
        Some(unsafe { self.slots[idx].assume_init_ref() })
    }

    /// Iterate over the stored values front-to-back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(move |i| {
            let idx = self.storage_idx(i);
            // safety: every logical index in [0, len) maps to an initialized slot.
            unsafe { self.slots[idx].assume_init_ref() }
        })
    }

    /// Drop all stored values, leaving the queue empty.
    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Debug> Debug for RingQueue<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
