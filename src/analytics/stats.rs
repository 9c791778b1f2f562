use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct Stats {
    pub submitted: AtomicU64,
    pub admitted: AtomicU64,
    pub cancelled: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub aborted: AtomicU64,

    // Last observed value only, gauge-like
    pub last_task_latency_ms: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_task_latency(&self, ms: u64) {
        self.last_task_latency_ms.store(ms, Ordering::Relaxed);
    }

    /// Submissions accepted but not yet resolved (waiting for a slot or running).
    pub fn in_flight(&self) -> u64 {
        let submitted = self.submitted.load(Ordering::Relaxed);
        let resolved = self.cancelled.load(Ordering::Relaxed)
            + self.succeeded.load(Ordering::Relaxed)
            + self.failed.load(Ordering::Relaxed)
            + self.aborted.load(Ordering::Relaxed);
        submitted.saturating_sub(resolved)
    }

    pub fn log_stats(&self) {
        let submitted = self.submitted.load(Ordering::Relaxed);
        let admitted = self.admitted.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let aborted = self.aborted.load(Ordering::Relaxed);
        let latency = self.last_task_latency_ms.load(Ordering::Relaxed);

        info!(
            "STATS: Submitted: {} | Admitted: {} | Cancelled: {} | Tasks: {} Success, {} Failed, {} Aborted | Last latency {}ms",
            submitted, admitted, cancelled, succeeded, failed, aborted, latency
        );
    }
}
