//! Per-source bootstrap bookkeeping.

use super::EntropySource;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Bytes of each high-quality source routed to pool 0 after every reseed.
pub const RESEED_WINDOW_BYTES: u8 = 32;

/// Sticky per-source "has ever contributed" flags.
///
/// A flag goes from unset to set exactly once for the lifetime of the set.
/// The only mutation offered is [`test_and_set`](Self::test_and_set).
pub struct SeenSet {
    flags: [AtomicBool; EntropySource::COUNT],
}

impl SeenSet {
    /// Creates a set with every source unseen.
    pub fn new() -> Self {
        Self {
            flags: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    /// Marks `source` as seen and returns whether it already was.
    ///
    /// Exactly one caller ever observes `false` for a given source.
    #[inline]
    pub fn test_and_set(&self, source: EntropySource) -> bool {
        self.flags[source.index()].swap(true, Ordering::AcqRel)
    }

    /// Returns whether `source` has been seen.
    #[inline]
    pub fn contains(&self, source: EntropySource) -> bool {
        self.flags[source.index()].load(Ordering::Acquire)
    }

    /// Number of sources seen so far.
    pub fn len(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| f.load(Ordering::Relaxed))
            .count()
    }

    /// Returns true if no source has been seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SeenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(
                EntropySource::ALL
                    .iter()
                    .filter(|s| self.contains(**s))
                    .map(|s| s.name()),
            )
            .finish()
    }
}

/// Bytes each source has routed to pool 0 since the last reseed.
///
/// Reads are lock-free so the router can skip the lock when a source's
/// window is already full. Writes happen only while the entropy lock is
/// held; the atomics exist so those unlocked reads are well defined.
pub struct ReseedSeenCounters {
    counts: [AtomicU8; EntropySource::COUNT],
}

impl ReseedSeenCounters {
    /// Creates counters with every window open.
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU8::new(0)),
        }
    }

    /// Unlocked read. May be stale; re-check under the lock before acting.
    #[inline]
    pub fn peek(&self, source: EntropySource) -> u8 {
        self.counts[source.index()].load(Ordering::Relaxed)
    }

    /// Bytes still routed preferentially to pool 0 for `source`.
    #[inline]
    pub fn remaining(&self, source: EntropySource) -> usize {
        usize::from(RESEED_WINDOW_BYTES.saturating_sub(self.peek(source)))
    }

    /// Records `taken` more window bytes for `source`. Caller holds the lock.
    pub(crate) fn advance(&self, source: EntropySource, taken: usize) {
        let slot = &self.counts[source.index()];
        let current = usize::from(slot.load(Ordering::Relaxed));
        let next = (current + taken).min(usize::from(RESEED_WINDOW_BYTES));
        // `next` is bounded by the window size, which fits in a u8.
        slot.store(next as u8, Ordering::Relaxed);
    }

    /// Re-opens the window for every source. Caller holds the lock.
    pub(crate) fn reset_all(&self) {
        for slot in &self.counts {
            slot.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for ReseedSeenCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_set_reports_unset() {
        let seen = SeenSet::new();
        assert!(!seen.test_and_set(EntropySource::Rdrand));
        assert!(seen.test_and_set(EntropySource::Rdrand));
        assert!(seen.test_and_set(EntropySource::Rdrand));
        assert!(!seen.contains(EntropySource::Mouse));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_only_one_thread_wins() {
        let seen = std::sync::Arc::new(SeenSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = std::sync::Arc::clone(&seen);
                std::thread::spawn(move || !seen.test_and_set(EntropySource::Tpm))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_window_advances_and_resets() {
        let counters = ReseedSeenCounters::new();
        assert_eq!(counters.remaining(EntropySource::Rdseed), 32);

        counters.advance(EntropySource::Rdseed, 20);
        assert_eq!(counters.remaining(EntropySource::Rdseed), 12);

        counters.advance(EntropySource::Rdseed, 50);
        assert_eq!(counters.peek(EntropySource::Rdseed), RESEED_WINDOW_BYTES);
        assert_eq!(counters.remaining(EntropySource::Rdseed), 0);

        counters.reset_all();
        assert_eq!(counters.remaining(EntropySource::Rdseed), 32);
    }
}
