//! Root generator: the ChaCha20 stream whose key the pools refresh.
//!
//! # Rekeying Model
//!
//! Every rekey uses BLAKE3 to mix:
//! - The current key
//! - The new input (concatenated pool digests, or one raw event)
//! - A domain separator and the generation counter
//!
//! The ChaCha20 stream is then rebuilt from the new key. Before the first
//! rekey the generator runs on an all-zero key and reports generation 0;
//! callers must go through `ensure_seeded` before drawing output.

use crate::harvest::HarvestedEvent;
use blake3::Hasher;
use parking_lot::{Condvar, Mutex};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use zeroize::Zeroize;

/// Domain separator for pool-driven reseeds.
const RESEED_DOMAIN: &[u8] = b"fenestras-root-reseed-v1";

/// Domain separator for direct rekeys from first-time sources.
const DIRECT_DOMAIN: &[u8] = b"fenestras-root-direct-v1";

/// The generator the pool bank rekeys.
///
/// Implementations serialize rekeys internally. The entropy lock is always
/// taken before the generator's own lock, never the reverse.
pub trait RootGenerator: Send + Sync {
    /// Number of rekeys so far; 0 means never keyed.
    fn generation(&self) -> u64;

    /// Mixes `material` into the key and bumps the generation.
    fn reseed(&self, material: &[u8]);

    /// Mixes a single event straight into the key, bypassing the pools.
    fn reseed_direct(&self, event: &HarvestedEvent<'_>);

    /// Wakes anyone blocked waiting for the first key.
    fn unblock_waiters(&self) {}
}

struct RootInner {
    /// The underlying ChaCha20 stream.
    rng: ChaCha20Rng,
    /// Current key. This is NOT the ChaCha internal state.
    key: [u8; 32],
    /// Bytes generated since last rekey.
    bytes_since_reseed: u64,
}

/// ChaCha20 root generator rekeyed through BLAKE3.
pub struct ChaChaRoot {
    inner: Mutex<RootInner>,
    generation: AtomicU64,
    seeded: Mutex<bool>,
    seeded_cv: Condvar,
}

impl ChaChaRoot {
    /// Creates an unkeyed generator (generation 0).
    pub fn new() -> Self {
        let key = [0u8; 32];
        Self {
            inner: Mutex::new(RootInner {
                rng: ChaCha20Rng::from_seed(key),
                key,
                bytes_since_reseed: 0,
            }),
            generation: AtomicU64::new(0),
            seeded: Mutex::new(false),
            seeded_cv: Condvar::new(),
        }
    }

    fn rekey(&self, domain: &[u8], parts: &[&[u8]]) -> u64 {
        let mut inner = self.inner.lock();
        let generation = self.generation.load(Ordering::Relaxed);

        // key' = BLAKE3(domain || generation || key || input...)
        let mut hasher = Hasher::new();
        hasher.update(domain);
        hasher.update(&generation.to_le_bytes());
        hasher.update(&inner.key);
        for part in parts {
            hasher.update(part);
        }

        let mut next_key: [u8; 32] = *hasher.finalize().as_bytes();
        inner.rng = ChaCha20Rng::from_seed(next_key);
        inner.key.copy_from_slice(&next_key);
        inner.bytes_since_reseed = 0;
        next_key.zeroize();

        let next = generation + 1;
        self.generation.store(next, Ordering::Release);
        next
    }

    /// Fills `dest` from the current stream.
    pub fn fill_bytes(&self, dest: &mut [u8]) {
        let mut inner = self.inner.lock();
        inner.bytes_since_reseed += dest.len() as u64;
        inner.rng.fill_bytes(dest);
    }

    /// Returns a random `u64` from the current stream.
    pub fn next_u64(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.bytes_since_reseed += 8;
        inner.rng.next_u64()
    }

    /// Returns bytes generated since the last rekey.
    pub fn bytes_since_reseed(&self) -> u64 {
        self.inner.lock().bytes_since_reseed
    }

    /// Blocks until the generator has been keyed or `timeout` elapses.
    ///
    /// Returns whether the generator is keyed.
    pub fn wait_seeded(&self, timeout: Duration) -> bool {
        let mut seeded = self.seeded.lock();
        if !*seeded {
            let _ = self
                .seeded_cv
                .wait_while_for(&mut seeded, |s| !*s, timeout);
        }
        *seeded
    }
}

impl Default for ChaChaRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl RootGenerator for ChaChaRoot {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn reseed(&self, material: &[u8]) {
        let generation = self.rekey(RESEED_DOMAIN, &[material]);

        tracing::debug!(
            generation,
            material_bytes = material.len(),
            "Root generator reseeded via BLAKE3 mixing"
        );
    }

    fn reseed_direct(&self, event: &HarvestedEvent<'_>) {
        let source = [event.source().index() as u8];
        let counter = event.counter_bytes();
        let parts: [&[u8]; 3] = [&source, &counter, event.payload()];
        let generation = self.rekey(DIRECT_DOMAIN, &parts);

        tracing::debug!(
            generation,
            source = %event.source(),
            "Root generator rekeyed directly from new source"
        );
    }

    fn unblock_waiters(&self) {
        let mut seeded = self.seeded.lock();
        *seeded = true;
        self.seeded_cv.notify_all();
    }
}

impl std::fmt::Debug for ChaChaRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaChaRoot")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EntropySource;

    #[test]
    fn test_starts_unkeyed() {
        let root = ChaChaRoot::new();
        assert_eq!(root.generation(), 0);
    }

    #[test]
    fn test_reseed_increments_generation() {
        let root = ChaChaRoot::new();
        root.reseed(&[0x42; 32]);
        assert_eq!(root.generation(), 1);

        let event = HarvestedEvent::new(EntropySource::Tpm, &[1, 2, 3], 9, 0);
        root.reseed_direct(&event);
        assert_eq!(root.generation(), 2);
    }

    #[test]
    fn test_bytes_since_reseed_tracking() {
        let root = ChaChaRoot::new();
        root.reseed(&[0x01; 32]);

        let mut buf = [0u8; 100];
        root.fill_bytes(&mut buf);
        assert_eq!(root.bytes_since_reseed(), 100);

        root.reseed(&[0x02; 32]);
        assert_eq!(root.bytes_since_reseed(), 0);
    }

    #[test]
    fn test_reseed_changes_output() {
        let rng1 = ChaChaRoot::new();
        let rng2 = ChaChaRoot::new();

        // Before reseed: same output
        let mut out1 = [0u8; 32];
        let mut out2 = [0u8; 32];
        rng1.fill_bytes(&mut out1);
        rng2.fill_bytes(&mut out2);
        assert_eq!(out1, out2);

        // Reseed rng1 only
        rng1.reseed(&[0xAB; 32]);

        rng1.fill_bytes(&mut out1);
        rng2.fill_bytes(&mut out2);
        assert_ne!(out1, out2);
    }

    #[test]
    fn test_different_material_different_result() {
        let rng1 = ChaChaRoot::new();
        let rng2 = ChaChaRoot::new();

        rng1.reseed(&[0xAA; 32]);
        rng2.reseed(&[0xBB; 32]);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_generation_affects_output() {
        // Same material applied at different generations should differ
        let rng1 = ChaChaRoot::new();
        let rng2 = ChaChaRoot::new();

        rng1.reseed(&[0xAA; 32]);

        rng2.reseed(&[0x00; 32]);
        rng2.reseed(&[0xAA; 32]);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_direct_and_pooled_rekeys_are_separated() {
        let rng1 = ChaChaRoot::new();
        let rng2 = ChaChaRoot::new();

        let payload = [0x55u8; 16];
        let event = HarvestedEvent::new(EntropySource::Rdrand, &payload, 0, 0);
        rng1.reseed_direct(&event);
        rng2.reseed(&payload);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_wait_seeded_times_out_then_wakes() {
        let root = std::sync::Arc::new(ChaChaRoot::new());
        assert!(!root.wait_seeded(Duration::from_millis(10)));

        let waiter = {
            let root = std::sync::Arc::clone(&root);
            std::thread::spawn(move || root.wait_seeded(Duration::from_secs(10)))
        };
        root.reseed(&[1; 32]);
        root.unblock_waiters();

        assert!(waiter.join().unwrap());
    }
}
