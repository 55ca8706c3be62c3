//! Latest-Value Handoff Slot
//!
//! Capture threads publish frames faster than, or out of step with, the
//! processing tick. The slot keeps only the newest value; an unconsumed value
//! is dropped when a newer one arrives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

/// Publish/consume counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    /// Values handed to the slot
    pub published: u64,
    /// Values overwritten before they were consumed
    pub dropped: u64,
    /// Values taken by the consumer
    pub consumed: u64,
}

/// Single-producer/single-consumer slot retaining only the latest value
#[derive(Debug)]
pub struct LatestSlot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
    published: AtomicU64,
    dropped: AtomicU64,
    consumed: AtomicU64,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // A panicking producer cannot leave the Option half-written
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a value, replacing any unconsumed one.
    ///
    /// Returns `true` when an older value was dropped.
    pub fn publish(&self, item: T) -> bool {
        let replaced = self.lock().replace(item).is_some();
        self.published.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Latest slot dropped an unconsumed value");
        }
        self.ready.notify_one();
        replaced
    }

    /// Take the latest value if one is waiting
    pub fn take(&self) -> Option<T> {
        let item = self.lock().take();
        if item.is_some() {
            self.consumed.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    /// Wait up to `timeout` for a value
    pub fn wait_take(&self, timeout: Duration) -> Option<T> {
        let guard = self.lock();
        let (mut guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |v| v.is_none())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let item = guard.take();
        if item.is_some() {
            self.consumed.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    /// Whether a value is waiting
    pub fn has_value(&self) -> bool {
        self.lock().is_some()
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
        }
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_keeps_only_latest() {
        let slot = LatestSlot::new();
        assert!(!slot.publish(1));
        assert!(slot.publish(2));
        assert!(slot.publish(3));

        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot.take(), None);

        let stats = slot.stats();
        assert_eq!(stats, SlotStats { published: 3, dropped: 2, consumed: 1 });
    }

    #[test]
    fn test_wait_take_times_out() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert_eq!(slot.wait_take(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let slot = Arc::new(LatestSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 0..100u32 {
                    slot.publish(i);
                }
            })
        };
        producer.join().unwrap();

        // Everything but the newest value was either consumed or dropped
        assert_eq!(slot.wait_take(Duration::from_millis(50)), Some(99));
        let stats = slot.stats();
        assert_eq!(stats.published, 100);
        assert_eq!(stats.dropped + stats.consumed, 100);
    }
}
