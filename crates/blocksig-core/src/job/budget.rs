//! In-flight byte budget shared by the producer and the workers.
//!
//! The producer charges each chunk before it is dispatched; the worker's
//! reservation releases it once the chunk is hashed. The counter lives under the
//! same mutex as the condition variable, so a producer waiting for capacity
//! can't miss a release.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Counter {
    current: u64,
    peak: u64,
}

/// Bytes read from the source but not yet hashed.
#[derive(Debug, Default)]
pub struct InFlightBytes {
    counter: Mutex<Counter>,
    released: Condvar,
}

impl InFlightBytes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently held by unprocessed chunks.
    pub fn current(&self) -> u64 {
        self.lock().current
    }

    /// Highest value `current` has reached.
    pub fn peak(&self) -> u64 {
        self.lock().peak
    }

    /// Charge `bytes` and return a guard that gives them back on drop.
    pub fn reserve(self: &Arc<Self>, bytes: u64) -> Reservation {
        {
            let mut counter = self.lock();
            counter.current += bytes;
            counter.peak = counter.peak.max(counter.current);
        }
        Reservation {
            budget: Arc::clone(self),
            bytes,
        }
    }

    fn release(&self, bytes: u64) {
        let mut counter = self.lock();
        counter.current = counter.current.saturating_sub(bytes);
        drop(counter);
        self.released.notify_all();
    }

    /// Block until `current < limit` or `timeout` elapses. Returns whether there is capacity.
    pub fn wait_below(&self, limit: u64, timeout: Duration) -> bool {
        let counter = self.lock();
        let (counter, _) = self
            .released
            .wait_timeout_while(counter, timeout, |c| c.current >= limit)
            .unwrap_or_else(PoisonError::into_inner);
        counter.current < limit
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counter> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bytes charged against an `InFlightBytes` budget; released when dropped.
#[derive(Debug)]
pub struct Reservation {
    budget: Arc<InFlightBytes>,
    bytes: u64,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.budget.release(self.bytes);
    }
}
