//! Fixed-capacity, time-ordered sample store
//!
//! Written by a single producer (the sampling task) and read by any number of
//! consumers. Readers only ever get a copy taken under the read lock, so a
//! push racing with a snapshot can never be observed half-applied.

use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

use super::sample::Sample;
use crate::core::config::{ring_capacity, ConfigError, MAX_RING_CAPACITY};

/// Slots reserved up front; the deque grows past this on demand.
const PREALLOCATED: usize = 1024;

pub struct RingBuffer {
    capacity: usize,
    samples: RwLock<VecDeque<Sample>>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if capacity > MAX_RING_CAPACITY {
            return Err(ConfigError::WindowTooLong {
                capacity: capacity as u128,
                max: MAX_RING_CAPACITY,
            });
        }
        Ok(Self {
            capacity,
            samples: RwLock::new(VecDeque::with_capacity(capacity.min(PREALLOCATED))),
        })
    }

    /// Capacity of `window / interval` samples.
    pub fn from_window(window: Duration, interval: Duration) -> Result<Self, ConfigError> {
        Self::new(ring_capacity(window, interval)?)
    }

    /// Append `sample`, evicting the oldest entry when full.
    ///
    /// A sample older than the newest retained one is dropped and `false` is
    /// returned, keeping the buffer ordered if the wall clock steps back.
    pub fn push(&self, sample: Sample) -> bool {
        let mut samples = self.write();
        if let Some(last) = samples.back() {
            if sample.timestamp < last.timestamp {
                debug!(
                    "Dropping out-of-order sample ({} < {})",
                    sample.timestamp, last.timestamp
                );
                return false;
            }
        }
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
        true
    }

    /// Copy of the retained samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.read().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Sample>> {
        self.samples.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Sample>> {
        self.samples.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
