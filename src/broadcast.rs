//! Snapshot fan-out to a dynamic set of subscribers.
//!
//! Delivery is best-effort and the registry is self-pruning: any failed
//! delivery removes that subscriber, with no retry and no error surfaced
//! to the publisher or to other subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::analyzer::WindowSnapshot;

/// Buffered snapshots per subscriber before it counts as failed.
const SUBSCRIBER_BUFFER: usize = 16;

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(Uuid);

pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriberHandle, mpsc::Sender<Arc<WindowSnapshot>>>>,
    latest: Mutex<Option<Arc<WindowSnapshot>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            latest: Mutex::new(None),
        }
    }

    /// Register a subscriber. A late joiner immediately receives the most
    /// recent published snapshot, if any, before subsequent ones.
    pub fn subscribe(&self) -> (SubscriberHandle, mpsc::Receiver<Arc<WindowSnapshot>>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let handle = SubscriberHandle(Uuid::new_v4());

        if let Some(snapshot) = self.latest.lock().clone() {
            // Freshly created channel with a non-zero buffer; cannot fail.
            let _ = tx.try_send(snapshot);
        }

        self.subscribers.lock().insert(handle, tx);
        debug!(target: "netmood::broadcast", "subscriber added ({} active)", self.subscriber_count());
        (handle, rx)
    }

    pub fn unsubscribe(&self, handle: &SubscriberHandle) {
        if self.subscribers.lock().remove(handle).is_some() {
            debug!(target: "netmood::broadcast", "subscriber removed ({} active)", self.subscriber_count());
        }
    }

    /// Deliver a snapshot to every subscriber, pruning the ones that fail.
    ///
    /// The whole iterate-and-prune pass holds the registry lock so a
    /// subscriber removed here cannot be delivered to concurrently.
    /// Returns the number of successful deliveries.
    pub fn publish(&self, snapshot: WindowSnapshot) -> usize {
        let snapshot = Arc::new(snapshot);
        *self.latest.lock() = Some(snapshot.clone());

        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|_, tx| tx.try_send(snapshot.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered < before {
            debug!(
                target: "netmood::broadcast",
                "pruned {} failed subscriber(s)",
                before - delivered
            );
        }
        delivered
    }

    /// Latest successfully published snapshot, if one exists yet.
    pub fn latest(&self) -> Option<Arc<WindowSnapshot>> {
        self.latest.lock().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_observations;
    use crate::observation::{MoodLabel, Observation};
    use chrono::Local;

    fn snapshot() -> WindowSnapshot {
        let window: Vec<Observation> = (0..10)
            .map(|_| Observation {
                timestamp: Local::now(),
                source: "192.168.0.1".to_string(),
                destination: "10.0.0.1".to_string(),
                protocol: "TCP".to_string(),
                bytes: 1500,
                rate: 200.0,
                entropy: 0.4,
                mood: MoodLabel::Calm,
            })
            .collect();
        analyze_observations(&window).unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let broadcaster = Broadcaster::new();
        let (_handle, mut rx) = broadcaster.subscribe();

        assert_eq!(broadcaster.publish(snapshot()), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.sample_count, 10);
    }

    #[tokio::test]
    async fn test_late_joiner_gets_latest_snapshot() {
        let broadcaster = Broadcaster::new();
        broadcaster.publish(snapshot());

        let (_handle, mut rx) = broadcaster.subscribe();
        let catch_up = rx.recv().await.unwrap();
        assert_eq!(catch_up.sample_count, 10);
    }

    #[tokio::test]
    async fn test_no_catch_up_before_first_publish() {
        let broadcaster = Broadcaster::new();
        let (_handle, mut rx) = broadcaster.subscribe();
        assert!(rx.try_recv().is_err());
        assert!(broadcaster.latest().is_none());
    }

    #[tokio::test]
    async fn test_failed_subscriber_is_pruned() {
        let broadcaster = Broadcaster::new();
        let (_kept, _rx_kept) = broadcaster.subscribe();
        let (_dead, rx_dead) = broadcaster.subscribe();
        drop(rx_dead);
        assert_eq!(broadcaster.subscriber_count(), 2);

        // The dead channel fails delivery and is silently removed.
        assert_eq!(broadcaster.publish(snapshot()), 1);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_handle() {
        let broadcaster = Broadcaster::new();
        let (handle, _rx) = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);
        broadcaster.unsubscribe(&handle);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_treated_as_failed() {
        let broadcaster = Broadcaster::new();
        let (_handle, mut rx) = broadcaster.subscribe();

        // Fill the buffer past capacity without consuming.
        for _ in 0..SUBSCRIBER_BUFFER + 1 {
            broadcaster.publish(snapshot());
        }
        assert_eq!(broadcaster.subscriber_count(), 0);

        // The buffered snapshots are still readable.
        assert!(rx.recv().await.is_some());
    }
}
