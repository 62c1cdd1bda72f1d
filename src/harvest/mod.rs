//! Sample ingestion.
//!
//! Harvesting call sites wrap each raw sample in a [`HarvestedEvent`] and
//! hand it to [`EntropyState::process_event`](crate::EntropyState::process_event),
//! which decides which pool (if any) absorbs it.

mod event;
mod router;

pub use event::{HarvestedEvent, MAX_EVENT_PAYLOAD};
pub use router::RouterStats;
