//! Fenestras: multi-pool entropy accumulation and scheduled reseeding.
//!
//! Raw samples from many entropy sources are hashed into a small bank of
//! pools, which periodically rekey a root ChaCha20 generator.
//!
//! # Architecture
//!
//! Data flows one way:
//!
//! ```text
//! harvest → router → pools → (scheduled mix) → root generator
//!                      ↓
//!              (first demand) bootstrap keying
//! ```
//!
//! - Pool 0 is drained on every scheduled reseed; pool `j` joins roughly
//!   every `3^j` rounds, so later pools accumulate long enough to recover
//!   from a compromised state even if early rounds are observed.
//! - Reseed intervals start at one second and triple up to a cap.
//! - A source's first sample is mixed straight into the root once keyed.
//! - Nothing here fails or blocks indefinitely: [`EntropyState::ensure_seeded`]
//!   always returns `true`, keying from whatever has been collected.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fenestras::{
//!     ChaChaRoot, EntropySource, EntropyState, HarvestedEvent, ReseedConfig, ReseedWorker,
//! };
//!
//! let state = Arc::new(EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new()));
//! let _worker = ReseedWorker::spawn(&state).unwrap();
//!
//! // Harvesting call sites feed samples as they arrive
//! let sample = 0x1234_5678u32.to_le_bytes();
//! state.process_event(&HarvestedEvent::new(EntropySource::Interrupt, &sample, 42, 7));
//!
//! // Output requests key the root on first use
//! let mut out = [0u8; 32];
//! state.fill_random(&mut out);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod conditioning;
pub mod config;
pub mod harvest;
pub mod metrics;
pub mod reseeding;
pub mod schedule;
pub mod source;
mod state;

// Re-export commonly used types at crate root
pub use conditioning::{HashAlgorithm, PoolBank, PoolDigest, PoolHasher};
pub use config::{ConfigError, FileConfig, ReseedConfig};
pub use harvest::{HarvestedEvent, RouterStats};
pub use reseeding::{ChaChaRoot, RootGenerator};
pub use schedule::{ReseedTimer, ReseedWorker};
pub use source::{AccessClass, EntropySource, SourceClass, SourceQuality};
pub use state::EntropyState;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
