//! Process-wide entropy state.
//!
//! One [`EntropyState`] owns the pool bank, the per-source bookkeeping and
//! the schedule, and is shared by reference with every harvesting call
//! site and with the reseed worker. The bank and schedule sit behind a
//! single lock (the entropy lock); the per-source flags and counters are
//! atomics so the router can take fast paths without it.
//!
//! Lock order: the entropy lock is taken before the root generator's
//! internal lock, never the reverse.

use crate::conditioning::{PoolBank, DIGEST_LEN};
use crate::config::ReseedConfig;
use crate::harvest::RouterStats;
use crate::reseeding::{ChaChaRoot, RootGenerator};
use crate::schedule::{tolerance_for, ReseedTimer, SchedulerState};
use crate::source::{ReseedSeenCounters, SeenSet};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use zeroize::Zeroize;

/// Everything guarded by the entropy lock.
pub(crate) struct Locked {
    pub(crate) bank: PoolBank,
    pub(crate) schedule: SchedulerState,
    /// Concatenated digests for one `mix`; wiped after every use.
    scratch: Vec<u8>,
}

/// Pool bank, per-source state and reseed schedule for one root generator.
pub struct EntropyState<R> {
    pub(crate) locked: Mutex<Locked>,
    /// Mirror of the bank's active count for unlocked reads.
    pub(crate) active: AtomicUsize,
    pub(crate) seen: SeenSet,
    pub(crate) reseed_seen: ReseedSeenCounters,
    preseed_entropy: AtomicU32,
    pub(crate) stats: RouterStats,
    reseed_count: AtomicU64,
    pub(crate) root: R,
    timer: OnceLock<Arc<dyn ReseedTimer>>,
    first_run_armed: AtomicBool,
    first_reseed_delay: Duration,
}

impl<R: RootGenerator> EntropyState<R> {
    /// Creates the state for a fresh process: one active pool, nothing
    /// seen, schedule at a one-second interval, `root` unkeyed.
    ///
    /// Out-of-range pool counts are clamped; see [`ReseedConfig::validate`].
    pub fn new(config: &ReseedConfig, root: R) -> Self {
        let bank = PoolBank::new(config.pool_count, config.algorithm);
        let scratch = Vec::with_capacity(bank.pool_count() * DIGEST_LEN);

        tracing::debug!(
            pools = bank.pool_count(),
            interval_cap_secs = config.interval_cap_secs,
            algorithm = ?config.algorithm,
            "Entropy state created"
        );

        Self {
            locked: Mutex::new(Locked {
                bank,
                schedule: SchedulerState::new(config.interval_cap_secs),
                scratch,
            }),
            active: AtomicUsize::new(1),
            seen: SeenSet::new(),
            reseed_seen: ReseedSeenCounters::new(),
            preseed_entropy: AtomicU32::new(0),
            stats: RouterStats::default(),
            reseed_count: AtomicU64::new(0),
            root,
            timer: OnceLock::new(),
            first_run_armed: AtomicBool::new(false),
            first_reseed_delay: config.first_reseed_delay(),
        }
    }

    /// Takes the entropy lock.
    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, Locked> {
        self.locked.lock()
    }

    /// One scheduler round.
    ///
    /// Drains the pools the schedule picks into the root generator,
    /// activates a new pool when due, and returns the delay until the
    /// next round. The timer re-arms with that delay.
    ///
    /// On an unkeyed root the round is spent on first keying instead, so
    /// waiters are woken and the first run is armed as usual.
    pub fn timer_reseed(&self) -> Duration {
        if self.root.generation() == 0 {
            tracing::debug!("Scheduled reseed before first keying");
            self.ensure_seeded();
            return self.first_reseed_delay;
        }

        let mut locked = self.lock();
        let active = locked.bank.active_count();
        let pool_count = locked.bank.pool_count();
        let (plan, next_secs) = locked.schedule.advance(active, pool_count);

        self.mix(&mut locked, plan.pools());

        if plan.activates() && locked.bank.activate_next() {
            let active = locked.bank.active_count();
            self.active.store(active, Ordering::Release);
            tracing::info!(active_pools = active, "Activated entropy pool");
        }
        drop(locked);

        Duration::from_secs(u64::from(next_secs))
    }

    /// Drains pools `0..n` into one reseed and re-opens every source's
    /// pool-0 window.
    fn mix(&self, locked: &mut Locked, n: usize) {
        let Locked { bank, scratch, .. } = locked;
        bank.drain_into(n, scratch);
        self.root.reseed(scratch);
        scratch.zeroize();
        self.reseed_seen.reset_all();
        let count = self.reseed_count.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::debug!(
            pools = n,
            reseed_count = count,
            generation = self.root.generation(),
            "Reseeded root generator from pools"
        );
    }

    /// Installs the timer that drives [`timer_reseed`](Self::timer_reseed).
    ///
    /// If the root is already keyed the first run is armed here; otherwise
    /// [`ensure_seeded`](Self::ensure_seeded) arms it. Only the first
    /// timer attached is used.
    pub fn attach_timer(&self, timer: Arc<dyn ReseedTimer>) {
        // Serialized with first keying so exactly one side sees the other.
        let keyed = {
            let _locked = self.lock();
            if self.timer.set(timer).is_err() {
                tracing::warn!("Reseed timer already attached");
                return;
            }
            self.root.generation() != 0
        };

        if keyed {
            self.arm_first_run();
        }
    }

    /// Arms the first scheduled run, once.
    pub(crate) fn arm_first_run(&self) {
        let Some(timer) = self.timer.get() else {
            tracing::debug!("Reseed timer not attached; deferring first run");
            return;
        };
        if self.first_run_armed.swap(true, Ordering::AcqRel) {
            return;
        }

        let delay = self.first_reseed_delay;
        timer.schedule(delay, tolerance_for(delay));
        tracing::debug!(?delay, "Armed first scheduled reseed");
    }

    /// Adds high-quality bytes seen before first keying, saturating.
    pub(crate) fn add_preseed(&self, bytes: usize) {
        let bytes = u32::try_from(bytes).unwrap_or(u32::MAX);
        let _ = self
            .preseed_entropy
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_add(bytes))
            });
    }

    /// The root generator.
    pub fn root(&self) -> &R {
        &self.root
    }

    /// Number of pools in rotation.
    pub fn active_pools(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Total pools in the bank.
    pub fn pool_count(&self) -> usize {
        self.lock().bank.pool_count()
    }

    /// High-quality bytes harvested before the root was first keyed.
    pub fn preseed_entropy(&self) -> u32 {
        self.preseed_entropy.load(Ordering::Relaxed)
    }

    /// Current scheduler interval in seconds.
    pub fn interval_secs(&self) -> u32 {
        self.lock().schedule.interval_secs()
    }

    /// Per-path routing counters.
    pub fn router_stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Bytes pool `index` has absorbed since it was last drained.
    pub fn pending_bytes(&self, index: usize) -> u64 {
        self.lock().bank.pending_bytes(index)
    }

    /// Bytes waiting across all pools.
    pub fn total_pending_bytes(&self) -> u64 {
        self.lock().bank.total_pending_bytes()
    }

    /// Bytes ever absorbed by the pool bank.
    pub fn total_bytes_absorbed(&self) -> u64 {
        self.lock().bank.total_bytes_absorbed()
    }

    /// Scheduled reseeds performed.
    pub fn reseed_count(&self) -> u64 {
        self.reseed_count.load(Ordering::Relaxed)
    }

    /// Number of distinct sources that have contributed.
    pub fn seen_sources(&self) -> usize {
        self.seen.len()
    }
}

impl EntropyState<ChaChaRoot> {
    /// Fills `dest` with output from the root generator, keying it first
    /// if needed.
    pub fn fill_random(&self, dest: &mut [u8]) {
        self.ensure_seeded();
        self.root.fill_bytes(dest);
    }
}

impl<R: RootGenerator> std::fmt::Debug for EntropyState<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyState")
            .field("generation", &self.root.generation())
            .field("active_pools", &self.active_pools())
            .field("seen", &self.seen)
            .field("preseed_entropy", &self.preseed_entropy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::HarvestedEvent;
    use crate::source::EntropySource;

    fn state(pool_count: usize, cap: u32) -> EntropyState<ChaChaRoot> {
        EntropyState::new(&ReseedConfig::with_schedule(pool_count, cap), ChaChaRoot::new())
    }

    #[test]
    fn test_fresh_state() {
        let state = state(8, 3600);
        assert_eq!(state.root().generation(), 0);
        assert_eq!(state.active_pools(), 1);
        assert_eq!(state.pool_count(), 8);
        assert_eq!(state.interval_secs(), 1);
        assert_eq!(state.preseed_entropy(), 0);
        assert_eq!(state.seen_sources(), 0);
    }

    #[test]
    fn test_preseed_saturates() {
        let state = state(8, 3600);
        state.add_preseed(usize::MAX);
        state.add_preseed(10);
        assert_eq!(state.preseed_entropy(), u32::MAX);
    }

    #[test]
    fn test_timer_reseed_grows_interval() {
        let state = state(8, 27);
        assert!(state.ensure_seeded());

        let delays: Vec<u64> = (0..5).map(|_| state.timer_reseed().as_secs()).collect();
        assert_eq!(delays, vec![3, 9, 27, 27, 27]);
        assert_eq!(state.reseed_count(), 5);
        assert_eq!(state.root().generation(), 6);
    }

    #[test]
    fn test_steady_phase_activates_pools() {
        let state = state(3, 1);
        state.ensure_seeded();

        for _ in 0..3 {
            state.timer_reseed();
        }
        assert_eq!(state.active_pools(), 2);

        for _ in 0..6 {
            state.timer_reseed();
        }
        assert_eq!(state.active_pools(), 3);

        for _ in 0..100 {
            state.timer_reseed();
        }
        assert_eq!(state.active_pools(), 3);
    }

    #[test]
    fn test_mix_reopens_pool0_window() {
        let state = state(4, 1);
        state.ensure_seeded();
        for _ in 0..3 {
            state.timer_reseed();
        }

        let payload = [7u8; 32];
        // First contribution bypasses the pools.
        state.process_event(&HarvestedEvent::new(EntropySource::Rdseed, &payload, 0, 1));
        state.process_event(&HarvestedEvent::new(EntropySource::Rdseed, &payload, 0, 1));
        assert_eq!(state.reseed_seen.remaining(EntropySource::Rdseed), 0);

        state.timer_reseed();
        assert_eq!(state.reseed_seen.remaining(EntropySource::Rdseed), 32);
    }

    #[test]
    fn test_fill_random_keys_on_demand() {
        let state = state(8, 3600);
        let mut out = [0u8; 32];
        state.fill_random(&mut out);
        assert_eq!(state.root().generation(), 1);
        assert!(out.iter().any(|&b| b != 0));
    }
}
