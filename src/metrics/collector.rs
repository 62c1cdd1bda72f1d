//! Metrics collection and registry.

use crate::reseeding::RootGenerator;
use crate::state::EntropyState;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric construction, registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of entropy state for metrics update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Root generator generation (0 = never keyed).
    pub generation: u64,
    /// Pools currently in rotation.
    pub active_pools: u64,
    /// Bytes waiting in pools.
    pub pool_pending_bytes: u64,
    /// Total bytes ever absorbed by the pool bank.
    pub pool_bytes_absorbed: u64,
    /// Scheduled reseeds performed.
    pub reseed_count: u64,
    /// High-quality bytes seen before first keying.
    pub preseed_entropy: u64,
    /// Current scheduler interval in seconds.
    pub interval_secs: u64,
    /// Distinct sources that have contributed.
    pub seen_sources: u64,
    /// First-time sources mixed directly into the root.
    pub events_direct: u64,
    /// First-time sources absorbed into pool 0 before keying.
    pub events_bootstrap: u64,
    /// Events routed through the post-reseed pool-0 window.
    pub events_preferred: u64,
    /// Bytes sent to pool 0 through that window.
    pub preferred_bytes: u64,
    /// Events spread round robin.
    pub events_round_robin: u64,
}

impl MetricsSnapshot {
    /// Captures the current state of an [`EntropyState`].
    pub fn from_state<R: RootGenerator>(state: &EntropyState<R>) -> Self {
        let stats = state.router_stats();
        Self {
            generation: state.root().generation(),
            active_pools: state.active_pools() as u64,
            pool_pending_bytes: state.total_pending_bytes(),
            pool_bytes_absorbed: state.total_bytes_absorbed(),
            reseed_count: state.reseed_count(),
            preseed_entropy: u64::from(state.preseed_entropy()),
            interval_secs: u64::from(state.interval_secs()),
            seen_sources: state.seen_sources() as u64,
            events_direct: stats.direct(),
            events_bootstrap: stats.bootstrap(),
            events_preferred: stats.preferred(),
            preferred_bytes: stats.preferred_bytes(),
            events_round_robin: stats.round_robin(),
        }
    }
}

/// Prometheus metrics registry for pool monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Root generator metrics
    generation: IntGauge,
    reseed_total: IntCounter,
    preseed_entropy: IntGauge,
    interval_secs: IntGauge,

    // Pool metrics
    active_pools: IntGauge,
    pool_pending_bytes: IntGauge,
    pool_bytes_absorbed: IntCounter,
    seen_sources: IntGauge,

    // Router metrics
    events_direct: IntCounter,
    events_bootstrap: IntCounter,
    events_preferred: IntCounter,
    preferred_bytes: IntCounter,
    events_round_robin: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all pool metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let generation = IntGauge::new(
            "fenestras_root_generation",
            "Root generator generation (0 = never keyed)",
        )?;
        let reseed_total = IntCounter::new(
            "fenestras_reseed_total",
            "Total number of scheduled reseeds performed",
        )?;
        let preseed_entropy = IntGauge::new(
            "fenestras_preseed_entropy_bytes",
            "High-quality bytes harvested before first keying",
        )?;
        let interval_secs = IntGauge::new(
            "fenestras_reseed_interval_seconds",
            "Current interval between scheduled reseeds",
        )?;

        let active_pools = IntGauge::new(
            "fenestras_active_pools",
            "Number of pools in rotation",
        )?;
        let pool_pending_bytes = IntGauge::new(
            "fenestras_pool_pending_bytes",
            "Bytes absorbed by pools since they were last drained",
        )?;
        let pool_bytes_absorbed = IntCounter::new(
            "fenestras_pool_bytes_absorbed_total",
            "Total bytes ever absorbed by the pool bank",
        )?;
        let seen_sources = IntGauge::new(
            "fenestras_seen_sources",
            "Distinct entropy sources that have contributed",
        )?;

        let events_direct = IntCounter::new(
            "fenestras_events_direct_total",
            "First-time sources mixed directly into the root generator",
        )?;
        let events_bootstrap = IntCounter::new(
            "fenestras_events_bootstrap_total",
            "First-time sources absorbed into pool 0 before keying",
        )?;
        let events_preferred = IntCounter::new(
            "fenestras_events_preferred_total",
            "Events routed through the post-reseed pool 0 window",
        )?;
        let preferred_bytes = IntCounter::new(
            "fenestras_preferred_bytes_total",
            "Bytes routed through the post-reseed pool 0 window",
        )?;
        let events_round_robin = IntCounter::new(
            "fenestras_events_round_robin_total",
            "Events spread round robin over active pools",
        )?;

        // Register all metrics
        registry.register(Box::new(generation.clone()))?;
        registry.register(Box::new(reseed_total.clone()))?;
        registry.register(Box::new(preseed_entropy.clone()))?;
        registry.register(Box::new(interval_secs.clone()))?;
        registry.register(Box::new(active_pools.clone()))?;
        registry.register(Box::new(pool_pending_bytes.clone()))?;
        registry.register(Box::new(pool_bytes_absorbed.clone()))?;
        registry.register(Box::new(seen_sources.clone()))?;
        registry.register(Box::new(events_direct.clone()))?;
        registry.register(Box::new(events_bootstrap.clone()))?;
        registry.register(Box::new(events_preferred.clone()))?;
        registry.register(Box::new(preferred_bytes.clone()))?;
        registry.register(Box::new(events_round_robin.clone()))?;

        Ok(Self {
            registry,
            generation,
            reseed_total,
            preseed_entropy,
            interval_secs,
            active_pools,
            pool_pending_bytes,
            pool_bytes_absorbed,
            seen_sources,
            events_direct,
            events_bootstrap,
            events_preferred,
            preferred_bytes,
            events_round_robin,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.generation.set(gauge(snapshot.generation));
        self.preseed_entropy.set(gauge(snapshot.preseed_entropy));
        self.interval_secs.set(gauge(snapshot.interval_secs));
        self.active_pools.set(gauge(snapshot.active_pools));
        self.pool_pending_bytes.set(gauge(snapshot.pool_pending_bytes));
        self.seen_sources.set(gauge(snapshot.seen_sources));

        // Counters only move forward
        advance(&self.reseed_total, snapshot.reseed_count);
        advance(&self.pool_bytes_absorbed, snapshot.pool_bytes_absorbed);
        advance(&self.events_direct, snapshot.events_direct);
        advance(&self.events_bootstrap, snapshot.events_bootstrap);
        advance(&self.events_preferred, snapshot.events_preferred);
        advance(&self.preferred_bytes, snapshot.preferred_bytes);
        advance(&self.events_round_robin, snapshot.events_round_robin);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}
