//! Test sources: deterministic file contents and a reader that fails on demand.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Deterministic, non-repeating-per-chunk content of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 31 + i / 251) % 256) as u8)
        .collect()
}

/// Write `pattern(len)` to `dir/name` and return the path.
pub fn write_source(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pattern(len)).unwrap();
    path
}

/// Yields `data` until `fail_after` bytes have been read, then returns an error.
pub struct FailingReader {
    data: io::Cursor<Vec<u8>>,
    fail_after: u64,
}

impl FailingReader {
    pub fn new(data: Vec<u8>, fail_after: u64) -> Self {
        Self {
            data: io::Cursor::new(data),
            fail_after,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.data.position();
        if pos >= self.fail_after {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        let allowed = (self.fail_after - pos).min(buf.len() as u64) as usize;
        self.data.read(&mut buf[..allowed])
    }
}
