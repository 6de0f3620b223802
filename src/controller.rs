//! Capture lifecycle controller.
//!
//! Owns the producer (capture tick loop) and consumer (dequeue -> classify
//! -> aggregate -> maybe-analyze -> maybe-broadcast) tasks. Lifecycle is
//! strictly Idle -> Capturing -> Stopped; Stopped is terminal for a
//! controller instance and a fresh capture requires a new one.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::analyzer::{WindowAnalyzer, WindowSnapshot};
use crate::broadcast::{Broadcaster, SubscriberHandle};
use crate::capture::{CaptureSource, Captured};
use crate::config::Settings;
use crate::export;
use crate::features::FeatureVector;
use crate::metrics::Metrics;
use crate::mood;
use crate::queue::{EventQueue, PushOutcome};
use crate::stats::{StatsAggregator, StatsSnapshot};

/// Consumer dequeue timeout. Every expiry is a cooperative checkpoint for
/// the run flag, so shutdown latency is bounded by this value.
const POP_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopped,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

pub struct CaptureController {
    state: Mutex<CaptureState>,
    run: Arc<AtomicBool>,
    queue: Arc<EventQueue>,
    stats: Arc<StatsAggregator>,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<Metrics>,
    settings: Settings,
    source: Mutex<Option<CaptureSource>>,
    source_kind: &'static str,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CaptureController {
    pub fn new(settings: Settings, source: CaptureSource, metrics: Arc<Metrics>) -> Self {
        let source_kind = source.kind();
        Self {
            state: Mutex::new(CaptureState::Idle),
            run: Arc::new(AtomicBool::new(false)),
            queue: Arc::new(EventQueue::new(settings.queue_capacity)),
            stats: Arc::new(StatsAggregator::new()),
            broadcaster: Arc::new(Broadcaster::new()),
            metrics,
            settings,
            source: Mutex::new(Some(source)),
            source_kind,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Begin capturing. A no-op returning the current state unless the
    /// controller is Idle.
    pub fn start(&self) -> CaptureState {
        let mut state = self.state.lock();
        if *state != CaptureState::Idle {
            return *state;
        }
        let source = match self.source.lock().take() {
            Some(source) => source,
            None => return *state,
        };

        *state = CaptureState::Capturing;
        self.run.store(true, Ordering::SeqCst);
        info!(
            target: "netmood::controller",
            "capture started ({} source, queue capacity {})",
            self.source_kind, self.settings.queue_capacity
        );

        let producer = tokio::spawn(producer_loop(
            self.run.clone(),
            source,
            self.queue.clone(),
            self.metrics.clone(),
        ));
        let consumer = tokio::spawn(consumer_loop(
            self.run.clone(),
            self.queue.clone(),
            self.stats.clone(),
            self.broadcaster.clone(),
            self.metrics.clone(),
            WindowAnalyzer::new(self.settings.window_size, self.settings.analysis_interval),
        ));
        self.tasks.lock().extend([producer, consumer]);

        CaptureState::Capturing
    }

    /// Signal both loops to exit at their next cooperative checkpoint.
    /// Eventual, not immediate: in-flight work is never force-killed.
    /// A no-op returning the current state unless the controller is
    /// Capturing.
    pub fn stop(&self) -> CaptureState {
        let mut state = self.state.lock();
        if *state != CaptureState::Capturing {
            return *state;
        }
        *state = CaptureState::Stopped;
        self.run.store(false, Ordering::SeqCst);
        info!(target: "netmood::controller", "capture stopping");
        *state
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock()
    }

    pub fn source_kind(&self) -> &'static str {
        self.source_kind
    }

    /// Immutable copy of the running stats, drop counter included.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.queue.dropped())
    }

    /// Latest published window snapshot, or `None` before the first one.
    pub fn latest_window(&self) -> Option<Arc<WindowSnapshot>> {
        self.broadcaster.latest()
    }

    pub fn subscribe(&self) -> (SubscriberHandle, tokio::sync::mpsc::Receiver<Arc<WindowSnapshot>>) {
        let subscription = self.broadcaster.subscribe();
        self.metrics
            .subscribers
            .set(self.broadcaster.subscriber_count() as i64);
        subscription
    }

    pub fn unsubscribe(&self, handle: &SubscriberHandle) {
        self.broadcaster.unsubscribe(handle);
        self.metrics
            .subscribers
            .set(self.broadcaster.subscriber_count() as i64);
    }

    /// Drain buffered-but-unconsumed observations to a sink as CSV.
    /// Best-effort (the set may be empty) and valid in any state.
    pub fn export<W: Write>(&self, sink: &mut W) -> io::Result<usize> {
        let drained = self.queue.drain();
        self.metrics.queue_len.set(0);
        export::write_csv(sink, &drained)
    }
}

async fn producer_loop(
    run: Arc<AtomicBool>,
    mut source: CaptureSource,
    queue: Arc<EventQueue>,
    metrics: Arc<Metrics>,
) {
    info!(target: "netmood::controller", "producer loop running");
    while run.load(Ordering::SeqCst) {
        match source.next().await {
            Captured::Observation(observation) => match queue.push(observation) {
                PushOutcome::Accepted => {
                    metrics.queue_len.set(queue.len() as i64);
                }
                PushOutcome::Dropped => {
                    metrics.drops_total.inc();
                    debug!(target: "netmood::controller", "queue full, newest observation dropped");
                }
            },
            Captured::Idle => continue,
            Captured::End => {
                info!(target: "netmood::controller", "capture source exhausted");
                break;
            }
        }
    }
    info!(target: "netmood::controller", "producer loop exited");
}

async fn consumer_loop(
    run: Arc<AtomicBool>,
    queue: Arc<EventQueue>,
    stats: Arc<StatsAggregator>,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<Metrics>,
    mut analyzer: WindowAnalyzer,
) {
    info!(target: "netmood::controller", "consumer loop running");
    loop {
        match queue.pop(POP_TIMEOUT).await {
            Some(mut observation) => {
                let features = FeatureVector {
                    entropy: observation.entropy,
                    bytes: observation.bytes,
                    rate: observation.rate,
                };
                observation.mood = mood::classify(&features);

                stats.record(observation.mood);
                metrics.observations_total.inc();
                metrics
                    .moods_total
                    .with_label_values(&[observation.mood.as_str()])
                    .inc();
                metrics.queue_len.set(queue.len() as i64);

                if analyzer.push(observation) {
                    match analyzer.analyze() {
                        Some(snapshot) => {
                            let delivered = broadcaster.publish(snapshot);
                            metrics.snapshots_total.inc();
                            debug!(
                                target: "netmood::controller",
                                "window snapshot published to {} subscriber(s)",
                                delivered
                            );
                        }
                        None => {
                            debug!(
                                target: "netmood::controller",
                                "window below analysis minimum, no snapshot"
                            );
                        }
                    }
                }
            }
            // Timeout: the cooperative checkpoint.
            None => {
                if !run.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }
    info!(target: "netmood::controller", "consumer loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FramePoll, LinkDriver, RawFrame};
    use crate::config::SourceKind;
    use crate::errors::CaptureError;
    use crate::privacy::Anonymizer;

    struct BurstDriver {
        remaining: usize,
    }

    impl LinkDriver for BurstDriver {
        fn poll(&mut self) -> Result<FramePoll, CaptureError> {
            if self.remaining == 0 {
                return Ok(FramePoll::Closed);
            }
            self.remaining -= 1;
            Ok(FramePoll::Frame(RawFrame {
                payload: vec![0xAB; 64],
                source: "192.168.7.1".to_string(),
                destination: "192.168.7.2".to_string(),
                protocol: 6,
            }))
        }

        fn description(&self) -> &str {
            "burst"
        }
    }

    fn controller_with_frames(frames: usize) -> CaptureController {
        let settings = Settings::default();
        let source = CaptureSource::select(
            SourceKind::Auto,
            Arc::new(Anonymizer::new(1)),
            Some(Box::new(BurstDriver { remaining: frames })),
        );
        CaptureController::new(settings, source, Arc::new(Metrics::new()))
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn test_stop_before_start_is_a_noop() {
        let controller = controller_with_frames(0);
        assert_eq!(controller.stop(), CaptureState::Idle);
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_stopped_is_terminal() {
        let controller = controller_with_frames(0);
        assert_eq!(controller.start(), CaptureState::Capturing);
        assert_eq!(controller.stop(), CaptureState::Stopped);
        // start() after stop() remains a no-op
        assert_eq!(controller.start(), CaptureState::Stopped);
        assert_eq!(controller.stop(), CaptureState::Stopped);
    }

    #[tokio::test]
    async fn test_double_start_returns_current_state() {
        let controller = controller_with_frames(0);
        assert_eq!(controller.start(), CaptureState::Capturing);
        assert_eq!(controller.start(), CaptureState::Capturing);
        controller.stop();
    }

    #[tokio::test]
    async fn test_pipeline_end_to_end() {
        let controller = Arc::new(controller_with_frames(30));
        let (_handle, mut rx) = controller.subscribe();

        controller.start();
        wait_for(|| controller.stats().total == 30).await;

        // 30 consumed at interval 10: at least one snapshot published
        let snapshot = controller.latest_window().expect("snapshot published");
        assert!(snapshot.sample_count >= 10);

        // the subscriber saw it too
        let received = rx.recv().await.expect("subscriber delivery");
        assert!(received.sample_count >= 10);

        // identical small frames: low entropy, low byte count, low rate
        let stats = controller.stats();
        assert_eq!(stats.total, 30);
        assert_eq!(stats.dropped, 0);

        controller.stop();
        assert_eq!(controller.state(), CaptureState::Stopped);
    }

    #[tokio::test]
    async fn test_export_on_idle_controller_is_empty() {
        let controller = controller_with_frames(0);
        let mut sink = Vec::new();
        let exported = controller.export(&mut sink).unwrap();
        assert_eq!(exported, 0);
        let text = String::from_utf8(sink).unwrap();
        assert!(text.starts_with("timestamp,"));
    }
}
