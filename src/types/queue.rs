// src/types/queue.rs

//! # Queue Type Support
//!
//! Per-key queues held in a `DashMap<String, Arc<Queue>>`. The map's shard lock is
//! only held long enough to look up or create a key's `Queue`; each `Queue` then has
//! its own mutex guarding its items and its blocked waiters, so unrelated keys never
//! contend.
//!
//! Items are appended at the tail and popped from the tail, so a queue hands back
//! the most recently pushed item first.
//!
//! A blocking pop that finds the queue empty registers a `Waiter` (a oneshot sender)
//! and suspends with no lock held. A push hands its first value to the oldest waiter.
//! Taking a waiter out of `waiters` is the only way to complete it, and that only
//! happens under the queue mutex, so delivery and timeout can never both win.
//!
//! Supported commands:
//! - `QPUSH`
//! - `QPOP`
//! - `BQPOP`

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Result, StoreError};

/// A blocked `BQPOP` caller waiting for a hand-off.
#[derive(Debug)]
struct Waiter {
    id: u64,
    tx: oneshot::Sender<String>,
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<String>,
    /// Oldest waiter first.
    waiters: VecDeque<Waiter>,
}

impl QueueState {
    /// Deliver `value` to the oldest live waiter.
    ///
    /// Returns the value back if nobody could take it. Waiters whose receiver is
    /// already gone are discarded on the way.
    fn hand_off(&mut self, mut value: String) -> Option<String> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.tx.send(value) {
                Ok(()) => return None,
                Err(rejected) => value = rejected,
            }
        }
        Some(value)
    }

    /// Remove a waiter by id. `false` means it was already completed by a push.
    fn remove_waiter(&mut self, id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Put a value back as if it had just been pushed.
    fn requeue(&mut self, value: String) {
        if let Some(value) = self.hand_off(value) {
            self.items.push(value);
        }
    }
}

/// A single key's queue.
#[derive(Debug, Default)]
pub struct Queue {
    state: Mutex<QueueState>,
}

impl Queue {
    /// Nothing inside the critical sections can leave the state half-updated,
    /// so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of one blocked pop.
///
/// If the owning future is dropped before it settles (the client went away), the
/// waiter is withdrawn, and a value that was already handed to it goes back into
/// the queue instead of being lost.
struct PendingPop {
    queue: Arc<Queue>,
    id: u64,
    rx: oneshot::Receiver<String>,
    settled: bool,
}

impl PendingPop {
    /// Called once the wait is over without a received value.
    fn settle_without_value(&mut self) -> Result<String> {
        self.settled = true;
        let mut state = self.queue.lock();
        if state.remove_waiter(self.id) {
            return Err(StoreError::Timeout);
        }
        // A push claimed this waiter first; the send finished under the same lock.
        drop(state);
        self.rx.try_recv().map_err(|_| StoreError::Timeout)
    }
}

impl Drop for PendingPop {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.queue.lock();
        if state.remove_waiter(self.id) {
            debug!(waiter = self.id, "blocked pop cancelled");
            return;
        }
        if let Ok(value) = self.rx.try_recv() {
            debug!(waiter = self.id, "blocked pop cancelled after hand-off, requeueing value");
            state.requeue(value);
        }
    }
}

#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<String, Arc<Queue>>,
    next_waiter: AtomicU64,
}

impl QueueStore {
    pub fn new() -> Self {
        QueueStore::default()
    }

    fn queue_or_create(&self, key: &str) -> Arc<Queue> {
        self.queues
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Queue::default()))
            .clone()
    }

    fn existing(&self, key: &str) -> Option<Arc<Queue>> {
        self.queues.get(key).map(|q| q.clone())
    }

    /// Execute QPUSH:
    /// Append `values` to the tail of the queue at `key`, creating it if needed.
    ///
    /// When callers are blocked on this key, the first value goes straight to the
    /// oldest of them and is never stored; the rest are appended in argument order.
    pub fn push<I>(&self, key: &str, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        let queue = self.queue_or_create(key);
        let mut state = queue.lock();
        let mut values = values.into_iter();
        if let Some(first) = values.next() {
            if let Some(first) = state.hand_off(first) {
                state.items.push(first);
            }
        }
        state.items.extend(values);
    }

    /// Execute QPOP:
    /// Remove and return the tail element of the queue at `key`.
    ///
    /// # Errors
    ///
    /// `QueueNotFound` if no queue was ever created for `key`,
    /// `QueueEmpty` if it exists but holds no items.
    pub fn pop(&self, key: &str) -> Result<String> {
        let queue = self.existing(key).ok_or(StoreError::QueueNotFound)?;
        let mut state = queue.lock();
        state.items.pop().ok_or(StoreError::QueueEmpty)
    }

    /// Execute BQPOP:
    /// Pop the tail element, or wait up to `timeout` for a push to hand one over.
    /// `Duration::ZERO` waits without a bound. A missing queue is created.
    ///
    /// # Errors
    ///
    /// `Timeout` if the time bound elapses before any value is delivered.
    pub async fn blocking_pop(&self, key: &str, timeout: Duration) -> Result<String> {
        let queue = self.queue_or_create(key);

        let (id, rx) = {
            let mut state = queue.lock();
            if let Some(value) = state.items.pop() {
                return Ok(value);
            }
            let (tx, rx) = oneshot::channel();
            let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
            state.waiters.push_back(Waiter { id, tx });
            (id, rx)
        };
        debug!(key, waiter = id, ?timeout, "queue empty, waiting for push");

        let mut pending = PendingPop { queue, id, rx, settled: false };

        let received = if timeout.is_zero() {
            Some((&mut pending.rx).await)
        } else {
            tokio::time::timeout(timeout, &mut pending.rx).await.ok()
        };

        match received {
            Some(Ok(value)) => {
                pending.settled = true;
                Ok(value)
            }
            // Timer fired (or the sender vanished): race the push for the waiter.
            _ => {
                let res = pending.settle_without_value();
                if res.is_err() {
                    debug!(key, waiter = id, "blocked pop timed out");
                }
                res
            }
        }
    }

    /// Number of stored items, or `None` when the queue was never created.
    pub fn len(&self, key: &str) -> Option<usize> {
        self.existing(key).map(|q| q.lock().items.len())
    }

    /// Number of callers currently blocked on `key`.
    pub fn waiting(&self, key: &str) -> usize {
        self.existing(key).map_or(0, |q| q.lock().waiters.len())
    }
}
