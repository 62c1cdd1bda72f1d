//! Reseed schedule.
//!
//! Reseeds start one second apart and the interval triples each round until
//! it reaches the cap. From then on the interval stays at the cap and a
//! base-3 counter picks how many pools each round drains: pool `j` joins
//! roughly every `3^j` rounds, and a new pool is activated the first time
//! the count reaches the current active-pool boundary.

/// What one scheduler round should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReseedPlan {
    /// Drain the first `pools` pools into the root generator.
    Mix {
        /// Number of pools to drain.
        pools: usize,
    },
    /// Drain the first `pools` pools, then bring pool `pools` into rotation.
    MixAndActivate {
        /// Number of pools to drain (the active count before activation).
        pools: usize,
    },
}

impl ReseedPlan {
    /// Number of pools this round drains.
    pub fn pools(&self) -> usize {
        match *self {
            ReseedPlan::Mix { pools } | ReseedPlan::MixAndActivate { pools } => pools,
        }
    }

    /// Returns true if this round activates a new pool.
    pub fn activates(&self) -> bool {
        matches!(self, ReseedPlan::MixAndActivate { .. })
    }
}

/// Interval and round counter carried between scheduler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    interval_secs: u32,
    reseed_number: u64,
    cap_secs: u32,
}

impl SchedulerState {
    /// Creates the state for a fresh process with the given interval cap.
    pub fn new(cap_secs: u32) -> Self {
        Self {
            interval_secs: 1,
            reseed_number: 1,
            cap_secs: cap_secs.max(1),
        }
    }

    /// Current interval in seconds.
    pub fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    /// Next steady-phase round number.
    pub fn reseed_number(&self) -> u64 {
        self.reseed_number
    }

    /// Returns true once the interval has reached the cap.
    pub fn is_steady(&self) -> bool {
        self.interval_secs >= self.cap_secs
    }

    /// Advances one round.
    ///
    /// `active` is the current active-pool count and `pool_count` the total.
    /// Returns the plan for this round and the delay, in seconds, until the
    /// next one.
    pub fn advance(&mut self, active: usize, pool_count: usize) -> (ReseedPlan, u32) {
        if !self.is_steady() {
            let next = self.interval_secs.saturating_mul(3).min(self.cap_secs);
            self.interval_secs = next;
            return (ReseedPlan::Mix { pools: 1 }, next);
        }

        let mut k = self.reseed_number;
        self.reseed_number += 1;

        let boundary = active + 1;
        let limit = boundary.min(pool_count);
        let mut i = 1;
        while i < limit {
            if k % 3 != 0 {
                break;
            }
            k /= 3;
            i += 1;
        }

        let plan = if i == boundary {
            ReseedPlan::MixAndActivate { pools: active }
        } else {
            ReseedPlan::Mix { pools: i }
        };
        (plan, self.interval_secs)
    }
}
