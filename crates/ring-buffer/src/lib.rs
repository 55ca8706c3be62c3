//! Ring Buffers
//!
//! Provides the bounded buffers used by the gaze pipeline:
//! - `RingBuffer<T>`: fixed-capacity history that overwrites its oldest entry
//! - `LatestSlot<T>`: single-producer/single-consumer handoff that keeps only
//!   the most recent value (drop-oldest)

mod buffer;
mod slot;

pub use buffer::RingBuffer;
pub use slot::{LatestSlot, SlotStats};

use thiserror::Error;

/// Default history capacity (detections kept per eye)
pub const DEFAULT_CAPACITY: usize = 10;

/// Ring buffer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Ring buffer capacity must be at least 1")]
    ZeroCapacity,
}
