//! Runs caller-supplied tasks behind a [`RateGate`].
//!
//! Every `submit` spawns its own Tokio task, so a caller stuck behind an exhausted gate never
//! holds up another caller's `submit`. The returned [`SubmissionHandle`] resolves exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::analytics::stats::Stats;
use crate::error::DispatchError;
use crate::throttle::gate::RateGate;
use crate::utils::time::elapsed_ms;

/// Pending outcome of one submitted task.
///
/// Await it to get the result. Dropping it does not cancel the submission.
#[derive(Debug)]
pub struct SubmissionHandle<T, E> {
    id: Uuid,
    inner: JoinHandle<Result<T, DispatchError<E>>>,
}

impl<T, E> SubmissionHandle<T, E> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True once the outcome is available.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<T, E> Future for SubmissionHandle<T, E> {
    type Output = Result<T, DispatchError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(DispatchError::Aborted(join_err))),
        }
    }
}

/// Counts the submission as aborted unless disarmed, i.e. the task panicked or was dropped.
struct AbortGuard {
    stats: Arc<Stats>,
    armed: bool,
}

impl AbortGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if self.armed {
            self.stats.inc_aborted();
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    gate: RateGate,
    runtime: Handle,
    stats: Arc<Stats>,
}

impl Dispatcher {
    /// Dispatch onto the runtime this is called from.
    ///
    /// # Panics
    /// Outside a Tokio runtime. [`RateGate::new`] already requires one.
    pub fn new(gate: RateGate) -> Self {
        Self::with_runtime(gate, Handle::current())
    }

    pub fn with_runtime(gate: RateGate, runtime: Handle) -> Self {
        Self {
            gate,
            runtime,
            stats: Arc::new(Stats::new()),
        }
    }

    /// Wait for a gate slot, then run `task` exactly once.
    ///
    /// The slot stays consumed whatever the task's outcome; only the gate's refill restores it.
    /// If the gate is shut down first, the handle resolves to [`DispatchError::Cancelled`] and
    /// `task` is never called.
    pub fn submit<F, Fut, T, E>(&self, task: F) -> SubmissionHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let id = Uuid::new_v4();
        let gate = self.gate.clone();
        let stats = self.stats.clone();
        stats.inc_submitted();

        let span = tracing::debug_span!("submission", %id);
        let inner = self.runtime.spawn(
            async move {
                let guard = AbortGuard {
                    stats: stats.clone(),
                    armed: true,
                };

                if let Err(e) = gate.acquire().await {
                    debug!("Submission not admitted: {}", e);
                    guard.disarm();
                    stats.inc_cancelled();
                    return Err(DispatchError::Cancelled);
                }
                stats.inc_admitted();
                debug!(available = gate.available(), "Submission admitted");

                let start = Instant::now();
                let outcome = task().await;
                stats.update_task_latency(elapsed_ms(start));
                guard.disarm();

                match outcome {
                    Ok(value) => {
                        stats.inc_succeeded();
                        debug!("Submission completed");
                        Ok(value)
                    }
                    Err(e) => {
                        stats.inc_failed();
                        warn!("Submission failed: {}", e);
                        Err(DispatchError::Task(e))
                    }
                }
            }
            .instrument(span),
        );

        SubmissionHandle { id, inner }
    }

    /// Stop admitting work. Already-running tasks finish normally.
    pub fn shutdown(&self) {
        self.gate.shutdown();
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }
}
