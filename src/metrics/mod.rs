//! Prometheus metrics exporter for pool monitoring.
//!
//! # Metrics Exposed
//!
//! ## Root Generator
//! - `fenestras_root_generation` - Rekeys so far (0 = never keyed)
//! - `fenestras_reseed_total` - Scheduled reseeds performed
//! - `fenestras_preseed_entropy_bytes` - High-quality bytes seen before keying
//! - `fenestras_reseed_interval_seconds` - Current schedule interval
//!
//! ## Pools
//! - `fenestras_active_pools` - Pools in rotation
//! - `fenestras_pool_pending_bytes` - Bytes waiting to be drained
//! - `fenestras_pool_bytes_absorbed_total` - Bytes ever absorbed
//! - `fenestras_seen_sources` - Distinct sources that have contributed
//!
//! ## Routing
//! - `fenestras_events_direct_total` - New sources mixed straight into the root
//! - `fenestras_events_bootstrap_total` - New sources absorbed before keying
//! - `fenestras_events_preferred_total` - Events sent through the pool 0 window
//! - `fenestras_preferred_bytes_total` - Bytes sent through the pool 0 window
//! - `fenestras_events_round_robin_total` - Events spread over active pools
//!
//! # Example
//!
//! ```no_run
//! use fenestras::{ChaChaRoot, EntropyState, ReseedConfig};
//! use fenestras::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let state = EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new());
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! registry.update(&MetricsSnapshot::from_state(&state));
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
