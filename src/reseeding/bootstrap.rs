//! First keying of the root generator.
//!
//! The root starts unkeyed. The first request for random output keys it
//! from whatever pool 0 has absorbed so far, even if that is nothing:
//! callers of a randomness API always get an answer.

use crate::reseeding::RootGenerator;
use crate::state::EntropyState;

impl<R: RootGenerator> EntropyState<R> {
    /// Makes sure the root generator has been keyed at least once.
    ///
    /// Always returns `true`. The first call drains pool 0 into the root,
    /// wakes anyone waiting for randomness, and arms the reseed schedule
    /// if a timer is attached.
    pub fn ensure_seeded(&self) -> bool {
        if self.root.generation() != 0 {
            return true;
        }

        let keyed_now = {
            let mut locked = self.lock();
            if self.root.generation() != 0 {
                false
            } else {
                let pending = locked.bank.pending_bytes(0);
                let digest = locked.bank.finish(0);
                self.root.reseed(digest.as_bytes());
                drop(digest);

                if pending == 0 {
                    tracing::warn!("Keying root generator from an empty pool");
                }
                tracing::info!(
                    pending_bytes = pending,
                    preseed_entropy = self.preseed_entropy(),
                    sources = self.seen_sources(),
                    "Root generator keyed for the first time"
                );
                true
            }
        };

        if keyed_now {
            self.root.unblock_waiters();
            self.arm_first_run();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ReseedConfig;
    use crate::harvest::HarvestedEvent;
    use crate::reseeding::{ChaChaRoot, RootGenerator};
    use crate::schedule::ReseedTimer;
    use crate::source::EntropySource;
    use crate::state::EntropyState;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTimer {
        armed: Mutex<Vec<Duration>>,
    }

    impl ReseedTimer for RecordingTimer {
        fn schedule(&self, delay: Duration, _tolerance: Duration) {
            self.armed.lock().push(delay);
        }
    }

    #[test]
    fn test_seeds_with_no_entropy() {
        let state = EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new());
        assert!(state.ensure_seeded());
        assert_eq!(state.root().generation(), 1);
    }

    #[test]
    fn test_idempotent() {
        let state = EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new());
        assert!(state.ensure_seeded());
        assert!(state.ensure_seeded());
        assert!(state.ensure_seeded());
        assert_eq!(state.root().generation(), 1);
    }

    #[test]
    fn test_drains_pool0() {
        let state = EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new());
        let payload = [0x11u8; 24];
        state.process_event(&HarvestedEvent::new(EntropySource::Keyboard, &payload, 1, 0));
        assert_eq!(state.pending_bytes(0), 32);

        state.ensure_seeded();
        assert_eq!(state.pending_bytes(0), 0);
    }

    #[test]
    fn test_concurrent_callers_key_once() {
        let state = Arc::new(EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.ensure_seeded())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(state.root().generation(), 1);
    }

    #[test]
    fn test_arms_attached_timer_once() {
        let state = EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new());
        let timer = Arc::new(RecordingTimer::default());
        state.attach_timer(timer.clone());
        assert!(timer.armed.lock().is_empty());

        state.ensure_seeded();
        state.ensure_seeded();
        assert_eq!(*timer.armed.lock(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_late_timer_armed_on_attach() {
        let state = EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new());
        state.ensure_seeded();

        let timer = Arc::new(RecordingTimer::default());
        state.attach_timer(timer.clone());
        assert_eq!(timer.armed.lock().len(), 1);
    }

    #[test]
    fn test_timer_round_before_keying_uses_bootstrap() {
        let state = Arc::new(EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new()));
        let timer = Arc::new(RecordingTimer::default());
        state.attach_timer(timer.clone());

        let waiter = {
            let state = Arc::clone(&state);
            std::thread::spawn(move || state.root().wait_seeded(Duration::from_secs(10)))
        };

        assert_eq!(state.timer_reseed(), Duration::from_secs(1));
        assert_eq!(state.root().generation(), 1);
        assert!(waiter.join().unwrap());
        assert_eq!(*timer.armed.lock(), vec![Duration::from_secs(1)]);

        // The schedule itself has not moved.
        assert_eq!(state.reseed_count(), 0);
        assert_eq!(state.interval_secs(), 1);

        state.ensure_seeded();
        assert_eq!(timer.armed.lock().len(), 1);
    }

    #[test]
    fn test_wakes_waiters() {
        let state = Arc::new(EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new()));
        let waiter = {
            let state = Arc::clone(&state);
            std::thread::spawn(move || state.root().wait_seeded(Duration::from_secs(10)))
        };
        state.ensure_seeded();
        assert!(waiter.join().unwrap());
    }
}
