//! Bounded History Ring

use crate::BufferError;
use std::collections::VecDeque;

/// Fixed-capacity ring that overwrites its oldest entry when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Stored entries, oldest first
    storage: VecDeque<T>,
    /// Capacity of the buffer
    capacity: usize,
    /// Total entries written (for statistics)
    total_written: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        Ok(Self {
            storage: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        })
    }

    /// Create a buffer, raising a zero capacity to one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    /// Create a buffer with the default history capacity
    pub fn with_default_capacity() -> Self {
        Self {
            storage: VecDeque::with_capacity(crate::DEFAULT_CAPACITY),
            capacity: crate::DEFAULT_CAPACITY,
            total_written: 0,
        }
    }

    /// Push an entry, returning the evicted oldest entry when full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.storage.len() >= self.capacity {
            self.storage.pop_front()
        } else {
            None
        };
        self.storage.push_back(item);
        self.total_written += 1;
        evicted
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.storage.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.storage.len() as f64 / self.capacity as f64
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&T> {
        self.storage.back()
    }

    /// Oldest entry still stored
    pub fn oldest(&self) -> Option<&T> {
        self.storage.front()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.storage.iter()
    }

    /// Read the last N entries (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<&T> {
        self.storage.iter().rev().take(count).collect()
    }

    /// Total entries written since creation (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Drop every stored entry
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Keep only entries matching the predicate
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, f: F) {
        self.storage.retain(f);
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
