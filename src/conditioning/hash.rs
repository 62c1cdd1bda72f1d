//! Incremental hash accumulators backing each entropy pool.
//!
//! A pool absorbs arbitrary byte streams and is later drained into a
//! fixed-size digest. Draining resets the accumulator, so each digest
//! covers exactly the bytes absorbed since the previous drain.

use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a pool digest in bytes (both algorithms produce 32).
pub const DIGEST_LEN: usize = 32;

/// Supported hash algorithms for pool accumulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 - fast, secure, recommended default.
    #[default]
    Blake3,
    /// SHA-256 - widely deployed, conservative choice.
    Sha256,
}

/// Digest drained from a pool.
///
/// The bytes are wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PoolDigest {
    data: [u8; DIGEST_LEN],
}

impl PoolDigest {
    /// Returns the digest bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.data
    }
}

impl std::fmt::Debug for PoolDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolDigest").finish_non_exhaustive()
    }
}

enum Accumulator {
    Blake3(Blake3Hasher),
    Sha256(Sha256),
}

/// A single pool: an incremental hash plus a pending-byte count.
pub struct PoolHasher {
    inner: Accumulator,
    pending: u64,
}

impl PoolHasher {
    /// Creates an empty accumulator using `algorithm`.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::Blake3 => Accumulator::Blake3(Blake3Hasher::new()),
            HashAlgorithm::Sha256 => Accumulator::Sha256(Sha256::new()),
        };
        Self { inner, pending: 0 }
    }

    /// Absorbs `bytes`. Never allocates.
    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        match &mut self.inner {
            Accumulator::Blake3(h) => {
                h.update(bytes);
            }
            Accumulator::Sha256(h) => Digest::update(h, bytes),
        }
        self.pending += bytes.len() as u64;
    }

    /// Returns the digest of everything absorbed since the last finish and
    /// resets the accumulator to empty.
    pub fn finish(&mut self) -> PoolDigest {
        let mut data = [0u8; DIGEST_LEN];
        match &mut self.inner {
            Accumulator::Blake3(h) => {
                data.copy_from_slice(h.finalize().as_bytes());
                h.reset();
            }
            Accumulator::Sha256(h) => {
                data.copy_from_slice(&h.finalize_reset());
            }
        }
        self.pending = 0;
        PoolDigest { data }
    }

    /// Bytes absorbed since the last finish.
    #[inline]
    pub fn pending_bytes(&self) -> u64 {
        self.pending
    }

    /// Algorithm this accumulator hashes with.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self.inner {
            Accumulator::Blake3(_) => HashAlgorithm::Blake3,
            Accumulator::Sha256(_) => HashAlgorithm::Sha256,
        }
    }
}

impl std::fmt::Debug for PoolHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHasher")
            .field("algorithm", &self.algorithm())
            .field("pending", &self.pending)
            .finish()
    }
}
