//! Chunk counting and the sequential chunk reader.
//!
//! Every chunk is `chunk_size` bytes except the last, which covers whatever
//! remains of the source. Chunk `i` always maps to result slot `i`.

use std::io::{self, Read};

use crate::error::JobError;

/// Number of chunks needed to cover `total_size` bytes: `ceil(total_size / chunk_size)`.
/// Returns 0 when `chunk_size` is 0. Fails when the count does not fit in `usize`.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> Result<usize, JobError> {
    if chunk_size == 0 {
        return Ok(0);
    }
    let count = total_size.div_ceil(chunk_size);
    usize::try_from(count).map_err(|_| {
        JobError::invalid(format!(
            "{} chunks of {} bytes do not fit in memory on this platform",
            count, chunk_size
        ))
    })
}

/// An owned chunk buffer plus the result slot it belongs to.
#[derive(Debug)]
pub struct Chunk {
    slot: usize,
    data: Vec<u8>,
}

impl Chunk {
    pub fn new(slot: usize, data: Vec<u8>) -> Self {
        Self { slot, data }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Chunk length in bytes (what it charges against the in-flight budget).
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads consecutive chunks from a stream of known total length.
///
/// Only the producing thread touches the reader, so no locking is involved.
pub struct ChunkReader<R> {
    reader: R,
    file_size: u64,
    chunk_size: u64,
    bytes_read: u64,
    next_slot: usize,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R, file_size: u64, chunk_size: u64) -> Self {
        Self {
            reader,
            file_size,
            chunk_size,
            bytes_read: 0,
            next_slot: 0,
        }
    }

    /// True while fewer than `file_size` bytes have been consumed.
    pub fn has_more(&self) -> bool {
        self.bytes_read < self.file_size
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Length of the chunk `read_chunk` would return next.
    pub fn next_len(&self) -> u64 {
        self.chunk_size
            .min(self.file_size.saturating_sub(self.bytes_read))
    }

    /// Reads exactly `next_len()` bytes and assigns them the next slot.
    /// The cursor only advances when the whole chunk was read.
    pub fn read_chunk(&mut self) -> Result<Chunk, JobError> {
        let slot = self.next_slot;
        let offset = self.bytes_read;
        if !self.has_more() {
            return Err(JobError::io(
                format!("read chunk {} at offset {}", slot, offset),
                io::Error::new(io::ErrorKind::UnexpectedEof, "source already fully read"),
            ));
        }
        let next_len = self.next_len();
        let len = usize::try_from(next_len).map_err(|_| {
            JobError::invalid(format!(
                "chunk of {} bytes does not fit in memory on this platform",
                next_len
            ))
        })?;
        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data).map_err(|e| {
            JobError::io(
                format!("read chunk {} ({} bytes at offset {})", slot, len, offset),
                e,
            )
        })?;
        self.bytes_read += len as u64;
        self.next_slot += 1;
        Ok(Chunk::new(slot, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(chunk_count(3 * 1_048_576, 1_048_576).unwrap(), 3);
        assert_eq!(chunk_count(3 * 1_048_576, 1_048_577).unwrap(), 3);
        assert_eq!(chunk_count(100, 100).unwrap(), 1);
        assert_eq!(chunk_count(101, 100).unwrap(), 2);
        assert_eq!(chunk_count(100, 0).unwrap(), 0);
        assert_eq!(chunk_count(0, 100).unwrap(), 0);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn largest_count_fits_on_64_bit() {
        assert_eq!(chunk_count(u64::MAX, 1).unwrap(), usize::MAX);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn oversized_counts_are_rejected() {
        let err = chunk_count(u64::MAX, 1).unwrap_err();
        assert!(err.is_configuration());
        let mut reader = ChunkReader::new(Cursor::new(Vec::new()), u64::MAX, u64::MAX);
        assert!(reader.read_chunk().unwrap_err().is_configuration());
        assert_eq!(reader.next_slot(), 0);
    }

    #[test]
    fn reader_walks_slots_in_order() {
        let data: Vec<u8> = (0u8..10).collect();
        let mut reader = ChunkReader::new(Cursor::new(data), 10, 4);

        let first = reader.read_chunk().unwrap();
        assert_eq!(first.slot(), 0);
        assert_eq!(first.data(), &[0, 1, 2, 3]);

        let second = reader.read_chunk().unwrap();
        assert_eq!(second.slot(), 1);
        assert_eq!(second.data(), &[4, 5, 6, 7]);

        assert_eq!(reader.next_len(), 2);
        let last = reader.read_chunk().unwrap();
        assert_eq!(last.slot(), 2);
        assert_eq!(last.data(), &[8, 9]);

        assert!(!reader.has_more());
        assert_eq!(reader.bytes_read(), 10);
        assert!(reader.read_chunk().is_err());
    }

    #[test]
    fn reader_reports_truncated_source() {
        // Declared length is larger than what the stream actually holds.
        let mut reader = ChunkReader::new(Cursor::new(vec![1u8; 6]), 8, 4);
        reader.read_chunk().unwrap();
        let err = reader.read_chunk().unwrap_err();
        assert!(matches!(err, JobError::Io { .. }));
        assert_eq!(reader.bytes_read(), 4);
        assert_eq!(reader.next_slot(), 1);
    }
}
