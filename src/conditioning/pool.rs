//! Bank of entropy pools.
//!
//! Holds a fixed number of independent accumulators, only a prefix of
//! which is in rotation. The active prefix only ever grows.

use super::hash::{HashAlgorithm, PoolDigest, PoolHasher, DIGEST_LEN};

/// Upper bound on the number of pools a bank may hold.
pub const MAX_POOLS: usize = 32;

/// Fixed-capacity array of pools with a growing active prefix.
///
/// Not synchronized; the owner serializes access with the entropy lock.
pub struct PoolBank {
    /// All pools, active or not.
    pools: Vec<PoolHasher>,
    /// Length of the active prefix, `1..=pools.len()`.
    active: usize,
    /// Total bytes ever absorbed (for metrics).
    total_bytes_absorbed: u64,
}

impl PoolBank {
    /// Creates a bank of `pool_count` empty pools with only pool 0 active.
    ///
    /// `pool_count` is clamped to `1..=MAX_POOLS`.
    pub fn new(pool_count: usize, algorithm: HashAlgorithm) -> Self {
        let pool_count = pool_count.clamp(1, MAX_POOLS);
        Self {
            pools: (0..pool_count).map(|_| PoolHasher::new(algorithm)).collect(),
            active: 1,
            total_bytes_absorbed: 0,
        }
    }

    /// Absorbs `bytes` into pool `index`.
    #[inline]
    pub fn absorb(&mut self, index: usize, bytes: &[u8]) {
        self.pools[index].update(bytes);
        self.total_bytes_absorbed += bytes.len() as u64;
    }

    /// Drains pool `index`, leaving it empty.
    pub fn finish(&mut self, index: usize) -> PoolDigest {
        self.pools[index].finish()
    }

    /// Drains pools `0..n` into `scratch` as concatenated digests.
    ///
    /// `scratch` is cleared first. `n` is clamped to the pool count.
    pub fn drain_into(&mut self, n: usize, scratch: &mut Vec<u8>) {
        let n = n.min(self.pools.len());
        scratch.clear();
        for pool in &mut self.pools[..n] {
            let digest = pool.finish();
            scratch.extend_from_slice(digest.as_bytes());
        }

        tracing::trace!(pools = n, bytes = n * DIGEST_LEN, "Drained pools");
    }

    /// Number of pools currently in rotation.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Total pools, active or not.
    #[inline]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Brings the next pool into rotation. Returns false if all are active.
    pub fn activate_next(&mut self) -> bool {
        if self.active >= self.pools.len() {
            return false;
        }
        self.active += 1;
        true
    }

    /// Bytes absorbed by pool `index` since it was last drained.
    pub fn pending_bytes(&self, index: usize) -> u64 {
        self.pools.get(index).map_or(0, PoolHasher::pending_bytes)
    }

    /// Bytes waiting across all pools.
    pub fn total_pending_bytes(&self) -> u64 {
        self.pools.iter().map(PoolHasher::pending_bytes).sum()
    }

    /// Returns total bytes ever absorbed by the bank.
    pub fn total_bytes_absorbed(&self) -> u64 {
        self.total_bytes_absorbed
    }
}

impl std::fmt::Debug for PoolBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBank")
            .field("pools", &self.pools.len())
            .field("active", &self.active)
            .field("total_bytes_absorbed", &self.total_bytes_absorbed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_one_active() {
        let bank = PoolBank::new(8, HashAlgorithm::Blake3);
        assert_eq!(bank.active_count(), 1);
        assert_eq!(bank.pool_count(), 8);
    }

    #[test]
    fn test_pool_count_clamped() {
        assert_eq!(PoolBank::new(0, HashAlgorithm::Blake3).pool_count(), 1);
        assert_eq!(
            PoolBank::new(1000, HashAlgorithm::Blake3).pool_count(),
            MAX_POOLS
        );
    }

    #[test]
    fn test_activation_saturates() {
        let mut bank = PoolBank::new(3, HashAlgorithm::Blake3);
        assert!(bank.activate_next());
        assert!(bank.activate_next());
        assert!(!bank.activate_next());
        assert_eq!(bank.active_count(), 3);
    }

    #[test]
    fn test_drain_concatenates_and_resets() {
        let mut bank = PoolBank::new(4, HashAlgorithm::Blake3);
        bank.absorb(0, b"zero");
        bank.absorb(1, b"one");
        bank.absorb(2, b"two");

        let mut scratch = Vec::new();
        bank.drain_into(2, &mut scratch);

        assert_eq!(scratch.len(), 2 * DIGEST_LEN);
        assert_eq!(&scratch[..32], blake3::hash(b"zero").as_bytes());
        assert_eq!(&scratch[32..], blake3::hash(b"one").as_bytes());
        assert_eq!(bank.pending_bytes(0), 0);
        assert_eq!(bank.pending_bytes(1), 0);
        // Pool 2 was not part of the drain
        assert_eq!(bank.pending_bytes(2), 3);
        assert_eq!(bank.total_bytes_absorbed(), 10);
    }
}
