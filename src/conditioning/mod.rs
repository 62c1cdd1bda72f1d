//! Entropy pools.
//!
//! Harvested samples are hashed into a small bank of incremental
//! accumulators. Draining a pool yields a fixed-size digest used as
//! reseed material for the root generator.

mod hash;
mod pool;

pub use hash::{HashAlgorithm, PoolDigest, PoolHasher, DIGEST_LEN};
pub use pool::{PoolBank, MAX_POOLS};
