//! Live link-layer capture behind a driver capability interface.
//!
//! The platform-specific capture driver lives outside this crate; anything
//! that can hand over raw frames implements `LinkDriver` and gets feature
//! extraction, anonymization and rate accounting for free.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::warn;

use super::Captured;
use crate::errors::CaptureError;
use crate::features;
use crate::observation::{protocol_name, Observation};
use crate::privacy::Anonymizer;

/// Pause between polls while the driver has nothing to hand over.
const IDLE_TICK: Duration = Duration::from_millis(100);

/// One raw link-layer frame as delivered by a driver.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub payload: Vec<u8>,
    pub source: String,
    pub destination: String,
    /// IP protocol number.
    pub protocol: u8,
}

/// Non-blocking driver poll result.
pub enum FramePoll {
    Frame(RawFrame),
    /// No frame ready right now.
    Idle,
    /// The driver will produce no further frames.
    Closed,
}

/// Capability interface for platform capture drivers.
pub trait LinkDriver: Send {
    fn poll(&mut self) -> Result<FramePoll, CaptureError>;

    /// Human-readable driver description for the capability probe log.
    fn description(&self) -> &str;
}

pub struct LiveCapture {
    driver: Box<dyn LinkDriver>,
    anonymizer: Arc<Anonymizer>,
    window_start: Instant,
    frames_in_window: u32,
    last_rate: f64,
}

impl LiveCapture {
    pub fn new(driver: Box<dyn LinkDriver>, anonymizer: Arc<Anonymizer>) -> Self {
        Self {
            driver,
            anonymizer,
            window_start: Instant::now(),
            frames_in_window: 0,
            last_rate: 0.0,
        }
    }

    pub async fn next(&mut self) -> Captured {
        match self.driver.poll() {
            Ok(FramePoll::Frame(frame)) => Captured::Observation(self.observe(frame)),
            Ok(FramePoll::Idle) => {
                tokio::time::sleep(IDLE_TICK).await;
                Captured::Idle
            }
            Ok(FramePoll::Closed) => Captured::End,
            Err(e) => {
                // Malformed input: discard the single frame and keep going.
                warn!(target: "netmood::capture", "discarding frame: {}", e);
                tokio::time::sleep(IDLE_TICK).await;
                Captured::Idle
            }
        }
    }

    fn observe(&mut self, frame: RawFrame) -> Observation {
        let rate = self.update_rate();
        let bytes = frame.payload.len() as u64;
        let feature = features::extract(&frame.payload, rate, bytes);

        Observation {
            timestamp: Local::now(),
            source: self.anonymizer.anonymize(&frame.source),
            destination: self.anonymizer.anonymize(&frame.destination),
            protocol: protocol_name(frame.protocol),
            bytes,
            rate,
            entropy: feature.entropy,
            mood: Default::default(),
        }
    }

    /// Frames per second over a rolling one-second window.
    fn update_rate(&mut self) -> f64 {
        self.frames_in_window += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.last_rate = self.frames_in_window as f64 / elapsed.as_secs_f64();
            self.window_start = Instant::now();
            self.frames_in_window = 0;
        }
        self.last_rate.max(self.frames_in_window as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Driver replaying a fixed frame script, then closing.
    struct ScriptedDriver {
        script: Vec<Result<FramePoll, CaptureError>>,
    }

    impl LinkDriver for ScriptedDriver {
        fn poll(&mut self) -> Result<FramePoll, CaptureError> {
            if self.script.is_empty() {
                Ok(FramePoll::Closed)
            } else {
                self.script.remove(0)
            }
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }

    fn frame(payload: &[u8]) -> RawFrame {
        RawFrame {
            payload: payload.to_vec(),
            source: "192.168.0.10".to_string(),
            destination: "8.8.8.8".to_string(),
            protocol: 6,
        }
    }

    #[tokio::test]
    async fn test_frames_become_observations() {
        let driver = ScriptedDriver {
            script: vec![Ok(FramePoll::Frame(frame(b"abcdabcd")))],
        };
        let mut capture = LiveCapture::new(Box::new(driver), Arc::new(Anonymizer::new(1)));

        match capture.next().await {
            Captured::Observation(obs) => {
                assert_eq!(obs.bytes, 8);
                assert_eq!(obs.protocol, "TCP");
                assert_eq!(obs.source, "192.168.0.10");
                assert!((0.0..=1.0).contains(&obs.entropy));
            }
            _ => panic!("expected an observation"),
        }

        match capture.next().await {
            Captured::End => {}
            _ => panic!("expected end of capture"),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let driver = ScriptedDriver {
            script: vec![
                Err(CaptureError::MalformedFrame("truncated".to_string())),
                Ok(FramePoll::Frame(frame(b"payload"))),
            ],
        };
        let mut capture = LiveCapture::new(Box::new(driver), Arc::new(Anonymizer::new(1)));

        assert!(matches!(capture.next().await, Captured::Idle));
        assert!(matches!(capture.next().await, Captured::Observation(_)));
    }

    #[tokio::test]
    async fn test_addresses_are_anonymized() {
        let driver = ScriptedDriver {
            script: vec![Ok(FramePoll::Frame(frame(b"x")))],
        };
        let mut capture = LiveCapture::new(Box::new(driver), Arc::new(Anonymizer::new(5)));

        match capture.next().await {
            Captured::Observation(obs) => {
                assert_eq!(obs.source, "127.0.0.1");
                assert_eq!(obs.destination, "127.0.0.1");
            }
            _ => panic!("expected an observation"),
        }
    }
}
