//! Periodic reseeding.
//!
//! [`SchedulerState`] decides what each round does; [`ReseedWorker`] is the
//! background thread that runs rounds at the intervals it picks.

mod plan;
mod worker;

pub use plan::{ReseedPlan, SchedulerState};
pub use worker::{ReseedTimer, ReseedWorker, WorkerError, WORKER_THREAD_NAME};

pub(crate) use worker::tolerance_for;
