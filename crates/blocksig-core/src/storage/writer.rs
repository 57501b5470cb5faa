//! Signature file writer with atomic finalize.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::JobError;

use super::{temp_path, SignatureSink};

/// Writes one digest per line to `<destination>.part`, syncs, then renames to
/// `destination`. On failure the temp file is removed.
#[derive(Debug, Clone)]
pub struct SignatureFileWriter {
    destination: PathBuf,
}

impl SignatureFileWriter {
    pub fn new(destination: &Path) -> Self {
        Self {
            destination: destination.to_path_buf(),
        }
    }

    fn write_temp(&self, temp: &Path, digests: &[String]) -> Result<(), JobError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp)
            .map_err(|e| JobError::io(format!("create {}", temp.display()), e))?;
        let mut out = BufWriter::new(file);
        for digest in digests {
            writeln!(out, "{}", digest)
                .map_err(|e| JobError::io(format!("write {}", temp.display()), e))?;
        }
        let file = out
            .into_inner()
            .map_err(|e| JobError::io(format!("flush {}", temp.display()), e.into_error()))?;
        file.sync_all()
            .map_err(|e| JobError::io(format!("sync {}", temp.display()), e))?;
        Ok(())
    }
}

impl SignatureSink for SignatureFileWriter {
    fn persist(&mut self, digests: &[String]) -> Result<(), JobError> {
        let temp = temp_path(&self.destination);
        if let Err(e) = self.write_temp(&temp, digests) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        fs::rename(&temp, &self.destination).map_err(|e| {
            let _ = fs::remove_file(&temp);
            JobError::io(
                format!(
                    "rename {} to {}",
                    temp.display(),
                    self.destination.display()
                ),
                e,
            )
        })?;
        tracing::debug!(path = %self.destination.display(), lines = digests.len(), "signature file written");
        Ok(())
    }
}
