//! Bounded event queue between the capture producer and the consumer loop.
//!
//! `push` never blocks: when the queue is at capacity the newest event is
//! dropped and counted, because the producer runs on a real-time capture
//! tick that must not stall. `pop` blocks up to a timeout so the consumer
//! can re-check its run flag without busy-waiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::observation::Observation;

/// Outcome of a non-blocking push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    Dropped,
}

pub struct EventQueue {
    buffer: Mutex<VecDeque<Observation>>,
    capacity: usize,
    dropped: AtomicU64,
    available: Notify,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            available: Notify::new(),
        }
    }

    /// Enqueue an observation, dropping it if the queue is full.
    pub fn push(&self, observation: Observation) -> PushOutcome {
        {
            let mut buffer = self.buffer.lock();
            if buffer.len() >= self.capacity {
                drop(buffer);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return PushOutcome::Dropped;
            }
            buffer.push_back(observation);
        }
        self.available.notify_one();
        PushOutcome::Accepted
    }

    /// Dequeue the oldest observation, waiting up to `timeout`.
    pub async fn pop(&self, timeout: Duration) -> Option<Observation> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(observation) = self.buffer.lock().pop_front() {
                return Some(observation);
            }
            // Register interest before re-checking so a push between the
            // check above and this await leaves a stored permit.
            let notified = self.available.notified();
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return self.buffer.lock().pop_front();
            }
        }
    }

    /// Non-blocking dequeue.
    pub fn try_pop(&self) -> Option<Observation> {
        self.buffer.lock().pop_front()
    }

    /// Remove and return everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<Observation> {
        self.buffer.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total observations dropped due to a full queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
