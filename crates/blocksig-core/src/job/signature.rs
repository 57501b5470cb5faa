//! Signature job: turns a byte stream into per-chunk hashing units under a
//! memory budget, then writes the ordered digests to a sink.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::checksum::DigestAlgorithm;
use crate::chunk::{chunk_count, ChunkReader};
use crate::config::SignatureConfig;
use crate::error::JobError;
use crate::storage::{SignatureFileWriter, SignatureSink};

use super::budget::InFlightBytes;
use super::piece::{SignatureContext, SignatureJobPiece};
use super::{Job, JobState, JobUnit};

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_048_576;

/// Chunks of lookahead allowed per worker.
pub const DEFAULT_BACKPRESSURE_MULTIPLIER: u64 = 2;

/// Parameters for one signature job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    pub chunk_size_bytes: u64,
    /// Number of workers the job should keep fed (sizes the in-flight limit).
    pub worker_count: usize,
    pub backpressure_multiplier: u64,
    pub algorithm: DigestAlgorithm,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            worker_count: 1,
            backpressure_multiplier: DEFAULT_BACKPRESSURE_MULTIPLIER,
            algorithm: DigestAlgorithm::default(),
        }
    }
}

impl JobSettings {
    /// Settings from the loaded config, for a controller with `worker_count` workers.
    pub fn from_config(cfg: &SignatureConfig, worker_count: usize) -> Self {
        Self {
            chunk_size_bytes: cfg.chunk_size_bytes,
            worker_count,
            backpressure_multiplier: cfg.backpressure_multiplier,
            algorithm: cfg.algorithm,
        }
    }

    /// `multiplier * chunk_size * workers`; multiplier and workers count as at least 1.
    pub fn tasks_size_limit_bytes(&self) -> u64 {
        self.backpressure_multiplier
            .max(1)
            .saturating_mul(self.chunk_size_bytes)
            .saturating_mul(self.worker_count.max(1) as u64)
    }
}

/// Computes the block signature of one source.
pub struct SignatureJob<R = File> {
    chunks: ChunkReader<R>,
    context: Arc<SignatureContext>,
    sink: Box<dyn SignatureSink>,
    algorithm: DigestAlgorithm,
    tasks_size_limit_bytes: u64,
    state: JobState,
}

impl SignatureJob<File> {
    /// Open `source` and prepare to write its signature to `destination`.
    pub fn open(source: &Path, destination: &Path, settings: JobSettings) -> Result<Self, JobError> {
        let file = File::open(source).map_err(|e| {
            JobError::invalid(format!("cannot open source {}: {}", source.display(), e))
        })?;
        let metadata = file
            .metadata()
            .map_err(|e| JobError::invalid(format!("cannot size source {}: {}", source.display(), e)))?;
        if !metadata.is_file() {
            return Err(JobError::invalid(format!(
                "source {} is not a regular file",
                source.display()
            )));
        }
        let file_size = metadata.len();
        let sink = SignatureFileWriter::new(destination);
        let job = Self::from_reader(file, file_size, Box::new(sink), settings)?;
        tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            file_size,
            chunks = job.total_chunks(),
            "signature job created"
        );
        Ok(job)
    }
}

impl<R: Read> SignatureJob<R> {
    /// Build a job over `reader`, which must yield `file_size` bytes.
    pub fn from_reader(
        reader: R,
        file_size: u64,
        sink: Box<dyn SignatureSink>,
        settings: JobSettings,
    ) -> Result<Self, JobError> {
        let chunk_size = settings.chunk_size_bytes;
        if chunk_size == 0 {
            return Err(JobError::invalid("chunk size must be greater than zero"));
        }
        if file_size < chunk_size {
            return Err(JobError::invalid(format!(
                "source size {} is less than the chunk size {}",
                file_size, chunk_size
            )));
        }
        let total_chunks = chunk_count(file_size, chunk_size)?;
        Ok(Self {
            chunks: ChunkReader::new(reader, file_size, chunk_size),
            context: Arc::new(SignatureContext::new(total_chunks)),
            sink,
            algorithm: settings.algorithm,
            tasks_size_limit_bytes: settings.tasks_size_limit_bytes(),
            state: JobState::Created,
        })
    }

    pub fn total_chunks(&self) -> usize {
        self.context.total_chunks()
    }

    pub fn tasks_size_limit_bytes(&self) -> u64 {
        self.tasks_size_limit_bytes
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Budget handle; stays valid after the job is moved into a controller.
    pub fn in_flight(&self) -> Arc<InFlightBytes> {
        Arc::clone(self.context.in_flight())
    }
}

impl<R: Read> Job for SignatureJob<R> {
    fn has_more_job(&self) -> bool {
        self.state != JobState::Aborted && self.chunks.has_more()
    }

    fn unfinished_jobs_limit_reached(&self) -> bool {
        self.context.in_flight().current() >= self.tasks_size_limit_bytes
    }

    fn make_job(&mut self) -> Result<Box<dyn JobUnit>, JobError> {
        if self.state == JobState::Aborted {
            return Err(JobError::Aborted);
        }
        let in_flight = self.context.in_flight().current();
        if in_flight >= self.tasks_size_limit_bytes {
            return Err(JobError::CapacityExceeded {
                in_flight,
                limit: self.tasks_size_limit_bytes,
            });
        }
        let chunk = match self.chunks.read_chunk() {
            Ok(chunk) => chunk,
            Err(e) => {
                self.state = JobState::Aborted;
                return Err(e);
            }
        };
        self.state = if self.chunks.has_more() {
            JobState::Producing
        } else {
            JobState::Draining
        };
        let piece = SignatureJobPiece::new(Arc::clone(&self.context), chunk, self.algorithm);
        Ok(Box::new(piece))
    }

    fn wait_for_capacity(&self, timeout: Duration) {
        if !self
            .context
            .in_flight()
            .wait_below(self.tasks_size_limit_bytes, timeout)
        {
            tracing::trace!(limit = self.tasks_size_limit_bytes, "still at in-flight limit");
        }
    }

    fn abort(&mut self) {
        if self.state != JobState::Finished {
            self.state = JobState::Aborted;
        }
    }

    fn finish(&mut self) -> Result<(), JobError> {
        match self.state {
            JobState::Aborted => return Err(JobError::Aborted),
            JobState::Finished => {
                tracing::warn!("signature job finished twice; ignoring");
                return Ok(());
            }
            _ => {}
        }
        let digests = self.context.ordered_results()?;
        self.state = JobState::Finished;
        self.sink.persist(&digests).map_err(|e| {
            tracing::error!("signature computed but not persisted: {}", e);
            e
        })?;
        tracing::info!(chunks = digests.len(), "signature persisted");
        Ok(())
    }
}
