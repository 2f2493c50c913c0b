//! Request coalescing ("singleflight") for health check runs.
//!
//! # Responsibilities
//! - Keep at most one run in flight when coalescing is enabled
//! - Let concurrent callers attach to that run and share its result
//! - Clear the in-flight slot as soon as the run completes
//!
//! # Design Decisions
//! - Not a cache: a caller arriving after completion always starts a new run
//! - The start-vs-attach decision happens under one mutex
//! - The run executes in its own task, so a caller that goes away
//!   does not cancel it for the others

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::health::runner::{describe_join_error, RunResult, Runner};
use crate::observability::metrics;

type SharedRun = Shared<BoxFuture<'static, Arc<RunResult>>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    run: Option<SharedRun>,
}

/// Entry point used by the HTTP front end to obtain a run result.
pub struct RunCoalescer {
    runner: Arc<Runner>,
    enabled: bool,
    slot: Arc<Mutex<Slot>>,
}

impl RunCoalescer {
    pub fn new(runner: Arc<Runner>, enabled: bool) -> Self {
        Self {
            runner,
            enabled,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn runner(&self) -> &Arc<Runner> {
        &self.runner
    }

    /// Obtain the result of a run.
    ///
    /// With coalescing disabled every call starts an independent run.
    pub async fn invoke(&self) -> Arc<RunResult> {
        if !self.enabled {
            return Arc::new(self.runner.run().await);
        }
        self.attach_or_start().await
    }

    fn attach_or_start(&self) -> SharedRun {
        let mut slot = lock(&self.slot);
        if let Some(run) = &slot.run {
            metrics::record_coalesced();
            tracing::debug!(generation = slot.generation, "Attaching to in-flight health check run");
            return run.clone();
        }

        slot.generation += 1;
        let release = Release {
            slot: Arc::clone(&self.slot),
            generation: slot.generation,
        };
        let runner = Arc::clone(&self.runner);
        let handle = tokio::spawn(async move {
            let _release = release;
            Arc::new(runner.run().await)
        });

        let runner = Arc::clone(&self.runner);
        let run = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let reason = describe_join_error(e);
                    tracing::error!(error = %reason, "Health check run task failed");
                    Arc::new(runner.crashed(&reason))
                }
            }
        }
        .boxed()
        .shared();

        slot.run = Some(run.clone());
        run
    }
}

/// Clears the in-flight slot when the run task finishes, including by panic.
///
/// The slot is cleared before the task's output becomes visible to waiters.
struct Release {
    slot: Arc<Mutex<Slot>>,
    generation: u64,
}

impl Drop for Release {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if slot.generation == self.generation {
            slot.run = None;
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    // Slot updates are single assignments; a poisoned guard still holds a consistent value.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
