//! Per-chunk unit of work and the result table it writes into.

use std::sync::{Arc, OnceLock};

use crate::checksum::DigestAlgorithm;
use crate::chunk::Chunk;
use crate::error::JobError;

use super::budget::{InFlightBytes, Reservation};
use super::JobUnit;

/// State shared between a `SignatureJob` and its pieces: one write-once slot
/// per chunk, plus the in-flight byte budget.
///
/// Pieces write disjoint slots, so there is no table-wide lock; the job reads the
/// table only after every piece has drained.
#[derive(Debug)]
pub struct SignatureContext {
    results: Vec<OnceLock<String>>,
    in_flight: Arc<InFlightBytes>,
}

impl SignatureContext {
    pub fn new(total_chunks: usize) -> Self {
        Self {
            results: (0..total_chunks).map(|_| OnceLock::new()).collect(),
            in_flight: Arc::new(InFlightBytes::new()),
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.results.len()
    }

    pub fn in_flight(&self) -> &Arc<InFlightBytes> {
        &self.in_flight
    }

    /// Store the digest for `slot`. A slot can be written once.
    pub fn add_result(&self, slot: usize, digest: String) -> Result<(), JobError> {
        let cell = self.results.get(slot).ok_or_else(|| JobError::HashingFailure {
            slot: Some(slot),
            reason: format!("slot out of range (table has {})", self.results.len()),
        })?;
        cell.set(digest).map_err(|_| JobError::HashingFailure {
            slot: Some(slot),
            reason: "slot already written".to_string(),
        })
    }

    /// Digests in slot order. Fails on the first empty slot.
    pub fn ordered_results(&self) -> Result<Vec<String>, JobError> {
        self.results
            .iter()
            .enumerate()
            .map(|(slot, cell)| {
                cell.get().cloned().ok_or_else(|| JobError::HashingFailure {
                    slot: Some(slot),
                    reason: "no digest recorded".to_string(),
                })
            })
            .collect()
    }
}

/// Hashes one chunk into its slot, then releases the chunk's bytes from the budget.
pub struct SignatureJobPiece {
    context: Arc<SignatureContext>,
    chunk: Chunk,
    algorithm: DigestAlgorithm,
    reservation: Reservation,
}

impl SignatureJobPiece {
    /// Charges the chunk's length against the context's budget.
    pub fn new(context: Arc<SignatureContext>, chunk: Chunk, algorithm: DigestAlgorithm) -> Self {
        let reservation = context.in_flight().reserve(chunk.len());
        Self {
            context,
            chunk,
            algorithm,
            reservation,
        }
    }

    pub fn process(self) -> Result<(), JobError> {
        let SignatureJobPiece {
            context,
            chunk,
            algorithm,
            reservation,
        } = self;
        let digest = algorithm.hex_digest(chunk.data());
        context.add_result(chunk.slot(), digest)?;
        drop(chunk);
        drop(reservation);
        Ok(())
    }
}

impl JobUnit for SignatureJobPiece {
    fn run(self: Box<Self>) -> Result<(), JobError> {
        (*self).process()
    }

    fn slot(&self) -> Option<usize> {
        Some(self.chunk.slot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_writes_its_slot_and_releases_bytes() {
        let context = Arc::new(SignatureContext::new(2));
        let piece = SignatureJobPiece::new(
            Arc::clone(&context),
            Chunk::new(1, b"hello".to_vec()),
            DigestAlgorithm::Md5,
        );
        assert_eq!(context.in_flight().current(), 5);
        assert_eq!(piece.slot(), Some(1));

        Box::new(piece).run().unwrap();
        assert_eq!(context.in_flight().current(), 0);
        assert!(matches!(
            context.ordered_results(),
            Err(JobError::HashingFailure { slot: Some(0), .. })
        ));
    }

    #[test]
    fn slot_cannot_be_written_twice() {
        let context = SignatureContext::new(1);
        context.add_result(0, "AA".to_string()).unwrap();
        let err = context.add_result(0, "BB".to_string()).unwrap_err();
        assert!(matches!(err, JobError::HashingFailure { slot: Some(0), .. }));
        assert_eq!(context.ordered_results().unwrap(), vec!["AA".to_string()]);
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let context = SignatureContext::new(1);
        assert!(context.add_result(3, "AA".to_string()).is_err());
    }

    #[test]
    fn dropped_piece_still_releases_bytes() {
        let context = Arc::new(SignatureContext::new(1));
        let piece = SignatureJobPiece::new(
            Arc::clone(&context),
            Chunk::new(0, vec![0u8; 16]),
            DigestAlgorithm::Sha256,
        );
        assert_eq!(context.in_flight().current(), 16);
        drop(piece);
        assert_eq!(context.in_flight().current(), 0);
    }
}
