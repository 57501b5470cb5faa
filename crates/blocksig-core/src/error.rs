//! Error taxonomy for signature jobs.
//!
//! Expected conditions (no more work, capacity reached) are plain `bool`s on the
//! `Job` trait; only genuinely exceptional conditions travel as `JobError`.

use std::io;
use thiserror::Error;

/// Error raised while configuring, producing, processing or persisting a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Chunk size is zero, the source is smaller than one chunk, or the source
    /// could not be opened/sized. Raised before any work begins.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Read failure on the input stream or write failure on the output sink.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A unit was requested while the in-flight byte budget was exhausted.
    #[error("unfinished work limit reached: {in_flight} of {limit} bytes in flight")]
    CapacityExceeded { in_flight: u64, limit: u64 },

    /// Hashing a chunk failed (digest panic or a slot written twice).
    #[error("hashing failed for chunk {slot:?}: {reason}")]
    HashingFailure { slot: Option<usize>, reason: String },

    /// The job was stopped and will not produce or finalize anything.
    #[error("job aborted")]
    Aborted,
}

impl JobError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        JobError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        JobError::InvalidConfiguration(message.into())
    }

    /// True for failures that happen before any chunk is read.
    pub fn is_configuration(&self) -> bool {
        matches!(self, JobError::InvalidConfiguration(_))
    }
}
