//! Counting admission gate that snaps back to full capacity once per interval.
//!
//! Slots are consumed by [`RateGate::acquire`] and are never returned by the caller: only the
//! periodic refill restores them. Waiters are served strictly in arrival order, and a new
//! caller never overtakes a queued one even if a slot is free at that instant.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::error::GateError;

struct GateState {
    available: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
    closed: bool,
}

struct Inner {
    capacity: usize,
    refill_interval: Duration,
    state: Mutex<GateState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Inner {
    fn refill(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }

        state.available = self.capacity;
        let mut woken = 0;
        while state.available > 0 {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            // A waiter whose acquire future was dropped does not take the slot.
            if waiter.send(()).is_ok() {
                state.available -= 1;
                woken += 1;
            }
        }

        trace!(
            available = state.available,
            woken,
            waiting = state.waiters.len(),
            "Gate refilled"
        );
    }
}

/// Shared handle to a rate gate. Clones refer to the same gate.
#[derive(Clone)]
pub struct RateGate {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RateGate")
            .field("capacity", &self.inner.capacity)
            .field("refill_interval", &self.inner.refill_interval)
            .field("available", &state.available)
            .field("waiting", &state.waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl RateGate {
    /// Create a gate holding `capacity` slots and start its refill schedule.
    ///
    /// The first refill happens one full `refill_interval` after construction. Must be called
    /// from within a Tokio runtime.
    pub fn new(capacity: usize, refill_interval: Duration) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::InvalidCapacity);
        }
        if refill_interval.is_zero() {
            return Err(GateError::InvalidInterval);
        }
        let runtime = Handle::try_current().map_err(|_| GateError::NoRuntime)?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let inner = Arc::new(Inner {
            capacity,
            refill_interval,
            state: Mutex::new(GateState {
                available: capacity,
                waiters: VecDeque::new(),
                closed: false,
            }),
            shutdown_tx,
        });

        let first_refill = Instant::now() + refill_interval;
        runtime.spawn(refill_loop(
            Arc::downgrade(&inner),
            shutdown_rx,
            first_refill,
            refill_interval,
        ));
        debug!(capacity, ?refill_interval, "Rate gate started");

        Ok(Self { inner })
    }

    /// Wait for a slot and consume it.
    ///
    /// Fails with [`GateError::Cancelled`] if the gate is shut down before or while waiting.
    pub async fn acquire(&self) -> Result<(), GateError> {
        let rx = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(GateError::Cancelled);
            }
            if state.available > 0 && state.waiters.is_empty() {
                state.available -= 1;
                return Ok(());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        // The sender is dropped without sending only on shutdown.
        rx.await.map_err(|_| GateError::Cancelled)
    }

    /// Take a slot only if one is free right now and nobody is queued ahead.
    pub fn try_acquire(&self) -> Result<bool, GateError> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(GateError::Cancelled);
        }
        if state.available > 0 && state.waiters.is_empty() {
            state.available -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Reset the gate to full capacity and admit queued waiters. No-op once shut down.
    pub fn refill(&self) {
        self.inner.refill();
    }

    /// Stop the refill schedule and fail every pending and future `acquire`.
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.waiters)
        };

        let _ = self.inner.shutdown_tx.send(());
        info!(cancelled_waiters = dropped.len(), "Rate gate shut down");
        drop(dropped);
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn refill_interval(&self) -> Duration {
        self.inner.refill_interval
    }

    pub fn available(&self) -> usize {
        self.inner.state.lock().available
    }

    /// Number of callers currently queued in `acquire`.
    pub fn waiting(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

async fn refill_loop(
    inner: Weak<Inner>,
    mut shutdown: broadcast::Receiver<()>,
    start: Instant,
    period: Duration,
) {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match inner.upgrade() {
                    Some(inner) => inner.refill(),
                    None => break,
                }
            }
            _ = shutdown.recv() => break,
        }
    }

    trace!("Refill loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep};

    const TICK: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_rejects_invalid_parameters() {
        assert_eq!(RateGate::new(0, TICK).unwrap_err(), GateError::InvalidCapacity);
        assert_eq!(RateGate::new(1, Duration::ZERO).unwrap_err(), GateError::InvalidInterval);
    }

    #[test]
    fn test_requires_runtime() {
        assert_eq!(RateGate::new(1, TICK).unwrap_err(), GateError::NoRuntime);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_then_exhausted() {
        let gate = RateGate::new(3, TICK).unwrap();

        for expected in [2, 1, 0] {
            gate.acquire().await.unwrap();
            assert_eq!(gate.available(), expected);
        }

        // No more slots until the next tick
        assert!(!gate.try_acquire().unwrap());
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_reset_not_increment() {
        let gate = RateGate::new(2, TICK).unwrap();

        gate.refill();
        gate.refill();
        assert_eq!(gate.available(), 2);

        assert!(gate.try_acquire().unwrap());
        gate.refill();
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_refill() {
        let gate = RateGate::new(1, TICK).unwrap();
        assert!(gate.try_acquire().unwrap());

        sleep(TICK - Duration::from_millis(1)).await;
        assert!(!gate.try_acquire().unwrap());

        // Step just past the tick so the refill task has run
        sleep(Duration::from_millis(2)).await;
        assert!(gate.try_acquire().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_acquire_admitted_after_refill() {
        let gate = RateGate::new(1, TICK).unwrap();
        gate.acquire().await.unwrap();

        let start = Instant::now();
        gate.acquire().await.unwrap();
        assert_eq!(start.elapsed(), TICK);
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_served_in_order() {
        let gate = RateGate::new(1, TICK).unwrap();
        gate.acquire().await.unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = vec![];
        for i in 0..3 {
            let waiter = gate.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                waiter.acquire().await.unwrap();
                order.lock().push(i);
            }));
            // Make sure each task has queued before spawning the next one
            while gate.waiting() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_waiter_not_overtaken() {
        let gate = RateGate::new(1, TICK).unwrap();
        gate.acquire().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await })
        };
        while gate.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        gate.refill();
        // The slot went to the queued waiter
        assert!(!gate.try_acquire().unwrap());
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_does_not_consume_slot() {
        let gate = RateGate::new(1, TICK).unwrap();
        gate.acquire().await.unwrap();

        let timed_out = tokio::time::timeout(TICK / 2, gate.acquire()).await;
        assert!(timed_out.is_err());
        assert_eq!(gate.waiting(), 1);

        gate.refill();
        assert_eq!(gate.waiting(), 0);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_fails_pending_and_future_acquires() {
        let gate = RateGate::new(1, TICK).unwrap();
        gate.acquire().await.unwrap();

        let pending = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await })
        };
        while gate.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        gate.shutdown();
        assert_eq!(pending.await.unwrap(), Err(GateError::Cancelled));
        assert_eq!(gate.acquire().await, Err(GateError::Cancelled));
        assert_eq!(gate.try_acquire(), Err(GateError::Cancelled));
        assert!(gate.is_closed());

        // Refill no longer restores anything
        advance(TICK * 3).await;
        gate.refill();
        assert_eq!(gate.available(), 0);

        // Idempotent
        gate.shutdown();
    }
}
