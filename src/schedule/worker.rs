//! Background thread that runs the reseed schedule.

use crate::reseeding::RootGenerator;
use crate::state::EntropyState;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

/// Name of the reseed worker thread.
pub const WORKER_THREAD_NAME: &str = "fx-reseed";

/// Errors that can occur while starting the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The OS refused to start the thread.
    #[error("failed to spawn reseed thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// "Run the reseed task once after `delay`" service.
///
/// `tolerance` is how late the run may fire; implementations may ignore it.
pub trait ReseedTimer: Send + Sync {
    /// Arms the task.
    fn schedule(&self, delay: Duration, tolerance: Duration);
}

enum Command {
    Arm(Duration),
    Shutdown,
}

/// Timer handle stored in the entropy state; forwards arm requests.
struct WorkerTimer {
    tx: Sender<Command>,
}

impl ReseedTimer for WorkerTimer {
    fn schedule(&self, delay: Duration, tolerance: Duration) {
        tracing::trace!(?delay, ?tolerance, "Arming reseed worker");
        // The worker only stops when the state or the worker is gone.
        let _ = self.tx.send(Command::Arm(delay));
    }
}

/// Owner of the reseed thread.
///
/// Dropping the worker stops and joins the thread.
pub struct ReseedWorker {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl ReseedWorker {
    /// Spawns the worker and attaches it as `state`'s timer.
    ///
    /// If `state` is already keyed the first run is armed immediately;
    /// otherwise it is armed by the first `ensure_seeded` call.
    pub fn spawn<R>(state: &Arc<EntropyState<R>>) -> Result<Self, WorkerError>
    where
        R: RootGenerator + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let weak = Arc::downgrade(state);

        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(weak, rx))?;

        state.attach_timer(Arc::new(WorkerTimer { tx: tx.clone() }));

        tracing::info!("Reseed worker started");
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Stops the worker and waits for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Command::Shutdown);
            if handle.join().is_err() {
                tracing::warn!("Reseed worker panicked");
            } else {
                tracing::info!("Reseed worker stopped");
            }
        }
    }
}

impl Drop for ReseedWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<R: RootGenerator>(state: Weak<EntropyState<R>>, rx: Receiver<Command>) {
    // Idle until the first arm request.
    let mut delay = match rx.recv() {
        Ok(Command::Arm(delay)) => delay,
        Ok(Command::Shutdown) | Err(_) => return,
    };

    loop {
        match rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            // A later arm request replaces the pending delay.
            Ok(Command::Arm(next)) => {
                delay = next;
                continue;
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
        }

        let Some(state) = state.upgrade() else {
            return;
        };
        delay = state.timer_reseed();
    }
}

/// Advisory lateness allowed for a run after `delay`.
pub(crate) fn tolerance_for(delay: Duration) -> Duration {
    delay / 20
}
