//! Fixed-size worker pool fed through a channel.
//!
//! Threads are started once and serve every run until the pool is dropped.
//! Once the shared stop flag is set, workers discard queued units instead of
//! running them; units already running finish normally. A failing or
//! panicking unit sets the stop flag.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::JobError;
use crate::job::JobUnit;

use super::StopHandle;

type Unit = Box<dyn JobUnit>;

#[derive(Default)]
struct Progress {
    /// Units submitted but not yet run or discarded.
    pending: usize,
    first_error: Option<JobError>,
}

struct Shared {
    stop: StopHandle,
    progress: Mutex<Progress>,
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_error(&self, e: JobError) {
        let mut progress = self.lock();
        if progress.first_error.is_none() {
            progress.first_error = Some(e);
        }
    }

    fn unit_done(&self) {
        let mut progress = self.lock();
        progress.pending = progress.pending.saturating_sub(1);
        if progress.pending == 0 {
            self.idle.notify_all();
        }
    }
}

pub(crate) struct WorkerPool {
    sender: Option<Sender<Unit>>,
    handles: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub(crate) fn new(size: usize, stop: StopHandle) -> Result<Self, JobError> {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel::<Unit>();
        let rx = Arc::new(Mutex::new(rx));
        let shared = Arc::new(Shared {
            stop,
            progress: Mutex::new(Progress::default()),
            idle: Condvar::new(),
        });
        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let rx = Arc::clone(&rx);
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("blocksig-worker-{}", i))
                .spawn(move || worker_loop(&rx, &worker_shared));
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => {
                    // Let the workers already started exit before reporting.
                    drop(tx);
                    for h in handles {
                        let _ = h.join();
                    }
                    return Err(JobError::io("spawn worker thread", e));
                }
            }
        }
        tracing::debug!(workers = size, "worker pool started");
        Ok(Self {
            sender: Some(tx),
            handles,
            shared,
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn submit(&self, unit: Unit) -> Result<(), JobError> {
        let Some(tx) = &self.sender else {
            return Err(JobError::Aborted);
        };
        self.shared.lock().pending += 1;
        tx.send(unit).map_err(|_| {
            self.shared.unit_done();
            JobError::Aborted
        })
    }

    /// Block until every submitted unit has run or been discarded, then take
    /// the first unit error recorded since the last call.
    pub(crate) fn wait_idle(&self) -> Option<JobError> {
        let mut progress = self.shared.lock();
        while progress.pending > 0 {
            progress = self
                .shared
                .idle
                .wait(progress)
                .unwrap_or_else(PoisonError::into_inner);
        }
        progress.first_error.take()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for h in self.handles.drain(..) {
            if let Err(payload) = h.join() {
                tracing::error!("worker thread panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }
}

fn worker_loop(rx: &Mutex<Receiver<Unit>>, shared: &Shared) {
    loop {
        let next = rx.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(unit) = next else {
            break;
        };
        if shared.stop.is_stopped() {
            drop(unit);
        } else {
            let slot = unit.slot();
            if let Err(e) = run_unit(unit) {
                tracing::error!(?slot, "unit failed, stopping: {}", e);
                shared.record_error(e);
                shared.stop.stop();
            }
        }
        shared.unit_done();
    }
}

fn run_unit(unit: Unit) -> Result<(), JobError> {
    let slot = unit.slot();
    match panic::catch_unwind(AssertUnwindSafe(move || unit.run())) {
        Ok(res) => res,
        Err(payload) => Err(JobError::HashingFailure {
            slot,
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
