//! Job abstraction: a producer of schedulable units plus a finalize step.
//!
//! The controller drives any `Job` through three independent queries
//! (`has_more_job`, `unfinished_jobs_limit_reached`, `make_job`) and a single
//! `finish` once every unit has drained. Units are move-only trait objects that
//! own their input.

mod budget;
mod piece;
mod signature;

use std::time::Duration;

use crate::error::JobError;

pub use budget::{InFlightBytes, Reservation};
pub use piece::{SignatureContext, SignatureJobPiece};
pub use signature::{JobSettings, SignatureJob, DEFAULT_BACKPRESSURE_MULTIPLIER, DEFAULT_CHUNK_SIZE};

/// One unit of work, executed exactly once on some worker thread.
pub trait JobUnit: Send {
    fn run(self: Box<Self>) -> Result<(), JobError>;

    /// Result slot this unit writes, if it has one (used in diagnostics).
    fn slot(&self) -> Option<usize> {
        None
    }
}

/// A producer of `JobUnit`s bounded by its own backpressure signal.
pub trait Job {
    /// True while there is input left to turn into units.
    fn has_more_job(&self) -> bool;

    /// True while the job refuses to produce more units until some in-flight work drains.
    fn unfinished_jobs_limit_reached(&self) -> bool;

    /// Produce the next unit. Fails with `CapacityExceeded` if called while the limit is reached.
    fn make_job(&mut self) -> Result<Box<dyn JobUnit>, JobError>;

    /// Block for at most `timeout` waiting for capacity. Default yields once.
    fn wait_for_capacity(&self, timeout: Duration) {
        let _ = timeout;
        std::thread::yield_now();
    }

    /// The run was stopped; no further units will be requested and `finish` won't be called.
    fn abort(&mut self) {}

    /// Called once after every unit has completed, only if the run wasn't stopped.
    fn finish(&mut self) -> Result<(), JobError>;
}

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    /// Units are still being produced.
    Producing,
    /// All units issued; waiting for them to complete.
    Draining,
    Finished,
    Aborted,
}
