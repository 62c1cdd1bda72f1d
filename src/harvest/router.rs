//! Hot-path routing of harvested samples into pools.
//!
//! Routing never blocks beyond the entropy lock and never fails. In order:
//!
//! 1. A source's first non-empty sample is special. Once the root is keyed
//!    it rekeys the root directly; before that it goes straight to pool 0.
//! 2. Right after every reseed, the first 32 bytes from each high-quality
//!    source go to pool 0 so the next single-pool reseed has fresh input.
//! 3. Everything else is spread over the active pools by destination hint.

use crate::harvest::HarvestedEvent;
use crate::reseeding::RootGenerator;
use crate::source::RESEED_WINDOW_BYTES;
use crate::state::{EntropyState, Locked};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts of events per routing path.
#[derive(Debug, Default)]
pub struct RouterStats {
    direct: AtomicU64,
    bootstrap: AtomicU64,
    preferred: AtomicU64,
    preferred_bytes: AtomicU64,
    round_robin: AtomicU64,
}

impl RouterStats {
    /// First-time sources mixed straight into the keyed root.
    pub fn direct(&self) -> u64 {
        self.direct.load(Ordering::Relaxed)
    }

    /// First-time sources absorbed into pool 0 before keying.
    pub fn bootstrap(&self) -> u64 {
        self.bootstrap.load(Ordering::Relaxed)
    }

    /// Events that sent at least one byte to pool 0 through the
    /// post-reseed window.
    pub fn preferred(&self) -> u64 {
        self.preferred.load(Ordering::Relaxed)
    }

    /// Bytes sent to pool 0 through the post-reseed window.
    pub fn preferred_bytes(&self) -> u64 {
        self.preferred_bytes.load(Ordering::Relaxed)
    }

    /// Events (or event remainders) spread round robin.
    pub fn round_robin(&self) -> u64 {
        self.round_robin.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

impl<R: RootGenerator> EntropyState<R> {
    /// Routes one harvested sample.
    ///
    /// Safe to call concurrently from any thread. Each event's bytes land
    /// in a pool atomically with respect to other events and to draining.
    pub fn process_event(&self, event: &HarvestedEvent<'_>) {
        let source = event.source();
        let high = source.is_high_quality();
        let total = event.len();

        if total > 0 && !self.seen.test_and_set(source) {
            self.route_first_contribution(event, high);
            return;
        }

        let window = self.reseed_seen.peek(source);
        self.route_seen(event, window);
    }

    /// Routes a sample from a source that has already contributed.
    ///
    /// `window` is the unlocked read of the source's pool-0 window; it is
    /// checked again under the lock before any byte is committed.
    pub(crate) fn route_seen(&self, event: &HarvestedEvent<'_>, window: u8) {
        let source = event.source();
        let high = source.is_high_quality();
        let total = event.len();
        let mut payload = event.payload();
        let mut locked = None;

        if total > 0
            && high
            && self.active.load(Ordering::Relaxed) > 1
            && window < RESEED_WINDOW_BYTES
        {
            let guard = locked.insert(self.lock());
            // The unlocked read may be stale.
            let room = self.reseed_seen.remaining(source);
            if room > 0 {
                let take = room.min(payload.len());
                let (head, tail) = payload.split_at(payload.len() - take);
                guard.bank.absorb(0, tail);
                self.reseed_seen.advance(source, take);
                RouterStats::bump(&self.stats.preferred, 1);
                RouterStats::bump(&self.stats.preferred_bytes, take as u64);

                if head.is_empty() {
                    guard.bank.absorb(0, &event.counter_bytes());
                    tracing::trace!(source = %source, bytes = take, "Routed event to pool 0");
                    drop(locked);
                    self.account_preseed(high, total);
                    return;
                }
                payload = head;
            }
        }

        let mut guard = match locked {
            Some(guard) => guard,
            None => self.lock(),
        };
        let pool = self.round_robin(&mut guard, event, payload);
        drop(guard);

        tracing::trace!(source = %source, pool, bytes = payload.len(), "Routed event");
        self.account_preseed(high, total);
    }

    fn route_first_contribution(&self, event: &HarvestedEvent<'_>, high: bool) {
        let source = event.source();

        if self.root.generation() > 0 {
            tracing::debug!(source = %source, "New source; rekeying root directly");
            RouterStats::bump(&self.stats.direct, 1);
            self.root.reseed_direct(event);
            return;
        }

        {
            let mut locked = self.lock();
            locked.bank.absorb(0, event.payload());
            locked.bank.absorb(0, &event.counter_bytes());
        }
        RouterStats::bump(&self.stats.bootstrap, 1);
        if high {
            self.add_preseed(event.len());
        }

        tracing::debug!(
            source = %source,
            bytes = event.len(),
            preseed_entropy = self.preseed_entropy(),
            "New source before first keying; absorbed into pool 0"
        );
    }

    fn round_robin(&self, locked: &mut Locked, event: &HarvestedEvent<'_>, payload: &[u8]) -> usize {
        let active = locked.bank.active_count();
        let pool = event.destination() as usize % active;
        locked.bank.absorb(pool, payload);
        locked.bank.absorb(pool, &event.counter_bytes());
        RouterStats::bump(&self.stats.round_robin, 1);
        pool
    }

    fn account_preseed(&self, high: bool, bytes: usize) {
        if high && self.root.generation() == 0 {
            self.add_preseed(bytes);
        }
    }
}
