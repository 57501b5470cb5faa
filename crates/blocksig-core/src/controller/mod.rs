//! Job controller: drives a `Job` to completion on a fixed worker pool.
//!
//! The calling thread is the only producer. It asks the job for units while
//! there is input and capacity, blocks on the job's backpressure signal when
//! there isn't, then waits for the pool to drain. Any production or unit
//! failure stops the run; `finish` only runs when nothing was stopped.

mod pool;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::JobError;
use crate::job::Job;

use pool::WorkerPool;

/// Upper bound on one wait for capacity, so a stop request is seen promptly.
const CAPACITY_WAIT: Duration = Duration::from_millis(50);

/// Worker count derived from hardware: available parallelism minus one (for the
/// producer), never less than one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Cloneable stop flag shared by the controller, its workers and any caller.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Idempotent. Stops future scheduling; running units complete.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a `do_job` run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every unit completed and the job's results were persisted.
    Finished,
    /// Every unit completed and `finish` ran, but persisting its results failed.
    PersistenceFailed(JobError),
    /// The run was stopped; `finish` was not called. Holds the failure that
    /// caused the stop, or `None` for an external `stop()`.
    Aborted(Option<JobError>),
}

impl RunOutcome {
    /// True when every unit completed and `finish` was called, whether or not
    /// the sink managed to persist the results.
    pub fn succeeded(&self) -> bool {
        !matches!(self, RunOutcome::Aborted(_))
    }

    /// True only when the results were also persisted.
    pub fn persisted(&self) -> bool {
        matches!(self, RunOutcome::Finished)
    }

    pub fn error(&self) -> Option<&JobError> {
        match self {
            RunOutcome::Finished => None,
            RunOutcome::PersistenceFailed(e) => Some(e),
            RunOutcome::Aborted(e) => e.as_ref(),
        }
    }
}

/// Schedules jobs' units onto a worker pool started at construction and
/// reused by every `do_job` call until the controller is dropped.
pub struct JobController {
    pool: WorkerPool,
    stop: StopHandle,
}

impl fmt::Debug for JobController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobController")
            .field("worker_count", &self.worker_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl JobController {
    /// Controller with `worker_count` workers; 0 is treated as 1. Fails only if
    /// a worker thread cannot be spawned.
    pub fn new(worker_count: usize) -> Result<Self, JobError> {
        let stop = StopHandle::default();
        let pool = WorkerPool::new(worker_count.max(1), stop.clone())?;
        Ok(Self { pool, stop })
    }

    /// Controller sized by `default_worker_count`.
    pub fn with_default_workers() -> Result<Self, JobError> {
        Self::new(default_worker_count())
    }

    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Handle that can stop this controller from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Run `job` to completion. See `RunOutcome` for what each result means.
    pub fn do_job<J: Job>(&self, mut job: J) -> RunOutcome {
        tracing::debug!(workers = self.worker_count(), "job started");

        let mut production_error = None;
        let mut dispatched = 0usize;
        while !self.stop.is_stopped() && job.has_more_job() {
            if job.unfinished_jobs_limit_reached() {
                job.wait_for_capacity(CAPACITY_WAIT);
                continue;
            }
            let submitted = job.make_job().and_then(|unit| self.pool.submit(unit));
            match submitted {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    tracing::error!("failed to produce unit {}: {}", dispatched, e);
                    production_error = Some(e);
                    self.stop.stop();
                }
            }
        }

        let unit_error = self.pool.wait_idle();

        if self.stop.is_stopped() {
            job.abort();
            let cause = production_error.or(unit_error);
            match &cause {
                Some(e) => tracing::error!(dispatched, "job aborted: {}", e),
                None => tracing::info!(dispatched, "job stopped"),
            }
            return RunOutcome::Aborted(cause);
        }

        match job.finish() {
            Ok(()) => {
                tracing::info!(units = dispatched, "job finished");
                RunOutcome::Finished
            }
            Err(e) => {
                tracing::error!("job finished but results were not persisted: {}", e);
                RunOutcome::PersistenceFailed(e)
            }
        }
    }
}
