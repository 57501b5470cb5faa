//! Output sinks for finished signatures.
//!
//! A sink receives the digests in slot order once the job has drained. The file
//! sink writes to a `.part` temp file and renames it into place only after the
//! last line is synced, so a failed run never leaves a partial signature.

mod writer;

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::JobError;

pub use writer::SignatureFileWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.sig` → `file.sig.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

/// Persists an ordered list of digests as newline-terminated records.
pub trait SignatureSink {
    fn persist(&mut self, digests: &[String]) -> Result<(), JobError>;
}

/// Keeps the signature in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines persisted so far (empty until the job finishes).
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SignatureSink for MemorySink {
    fn persist(&mut self, digests: &[String]) -> Result<(), JobError> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.clear();
        lines.extend_from_slice(digests);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("file.sig"));
        assert_eq!(p.to_string_lossy(), "file.sig.part");
        let p2 = temp_path(Path::new("/tmp/archive.sig"));
        assert_eq!(p2.to_string_lossy(), "/tmp/archive.sig.part");
    }

    #[test]
    fn memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer
            .persist(&["AA".to_string(), "BB".to_string()])
            .unwrap();
        assert_eq!(sink.lines(), vec!["AA".to_string(), "BB".to_string()]);
    }
}
