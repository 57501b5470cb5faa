//! One-call entry point: sign a file with settings from `SignatureConfig`.

use std::path::Path;

use crate::config::SignatureConfig;
use crate::controller::{JobController, RunOutcome};
use crate::error::JobError;
use crate::job::{JobSettings, SignatureJob};

/// Controller sized from `cfg.workers`, or from hardware when unset.
pub fn controller_for(cfg: &SignatureConfig) -> Result<JobController, JobError> {
    match cfg.workers {
        Some(n) => JobController::new(n),
        None => JobController::with_default_workers(),
    }
}

/// Compute the signature of `source` and write it to `destination`.
///
/// Configuration problems are returned as `Err` before any chunk is read;
/// everything after that is described by the `RunOutcome`.
pub fn sign_file(
    source: &Path,
    destination: &Path,
    cfg: &SignatureConfig,
) -> Result<RunOutcome, JobError> {
    let controller = controller_for(cfg)?;
    sign_file_with(&controller, source, destination, cfg)
}

/// Same as `sign_file` on a caller-owned controller (so it can be stopped from elsewhere).
pub fn sign_file_with(
    controller: &JobController,
    source: &Path,
    destination: &Path,
    cfg: &SignatureConfig,
) -> Result<RunOutcome, JobError> {
    let settings = JobSettings::from_config(cfg, controller.worker_count());
    let job = SignatureJob::open(source, destination, settings)?;
    tracing::debug!(
        workers = controller.worker_count(),
        limit = job.tasks_size_limit_bytes(),
        algorithm = %settings.algorithm,
        "dispatching signature job"
    );
    Ok(controller.do_job(job))
}
