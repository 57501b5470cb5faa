//! Block digests: algorithm selection, hex encoding, and a single-threaded
//! reference signature.
//!
//! Digests are produced through the RustCrypto `Digest` trait, so any hash from
//! that family can be plugged into `hex_digest`. Output is uppercase hex with
//! no separators.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::chunk::ChunkReader;
use crate::error::JobError;

/// Digest used for every block of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Digest `data` and return it as uppercase hex.
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => hex_digest::<Md5>(data),
            DigestAlgorithm::Sha256 => hex_digest::<Sha256>(data),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Md5 => write!(f, "md5"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(format!("unknown digest algorithm: {}", other)),
        }
    }
}

/// init / update / finalize over one buffer, hex-encoded in uppercase.
pub fn hex_digest<D: Digest>(data: &[u8]) -> String {
    let mut hasher = D::new();
    hasher.update(data);
    hex::encode_upper(hasher.finalize())
}

/// Compute the signature of `reader` on the calling thread, one chunk at a time.
/// Produces exactly what the parallel pipeline writes, in the same order.
pub fn signature_sequential<R: Read>(
    reader: R,
    file_size: u64,
    chunk_size: u64,
    algorithm: DigestAlgorithm,
) -> Result<Vec<String>, JobError> {
    if chunk_size == 0 {
        return Err(JobError::invalid("chunk size must be greater than zero"));
    }
    let mut chunks = ChunkReader::new(reader, file_size, chunk_size);
    let mut out = Vec::with_capacity(crate::chunk::chunk_count(file_size, chunk_size)?);
    while chunks.has_more() {
        let chunk = chunks.read_chunk()?;
        out.push(algorithm.hex_digest(chunk.data()));
    }
    Ok(out)
}
