//! Traffic capture sources.
//!
//! Three variants in descending preference: live link-layer capture (only
//! when a platform driver capability was injected), interface counter
//! sampling, and pure-software simulation. Selection is a capability probe
//! performed once at construction, not a user choice - although the
//! configuration can pin the counter or simulation variant explicitly.

pub mod counters;
pub mod live;
pub mod sim;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::SourceKind;
use crate::observation::Observation;
use crate::privacy::Anonymizer;

pub use live::{FramePoll, LinkDriver, RawFrame};

/// Result of one producer poll.
pub enum Captured {
    /// One new observation, ready for the queue.
    Observation(Observation),
    /// Nothing this tick; the producer loop re-checks its run flag.
    Idle,
    /// The source is exhausted (a live driver closed).
    End,
}

pub enum CaptureSource {
    Live(live::LiveCapture),
    Counters(counters::CounterSampler),
    Simulation(sim::Simulator),
}

impl CaptureSource {
    /// Evaluate the capability chain and construct the first available
    /// variant: live, then counter sampling, then simulation.
    pub fn select(
        kind: SourceKind,
        anonymizer: Arc<Anonymizer>,
        driver: Option<Box<dyn LinkDriver>>,
    ) -> Self {
        match kind {
            SourceKind::Sim => {
                info!(target: "netmood::capture", "using simulation source (configured)");
                CaptureSource::Simulation(sim::Simulator::new(anonymizer))
            }
            SourceKind::Counters => {
                if counters::available() {
                    info!(target: "netmood::capture", "using interface counter sampling (configured)");
                    CaptureSource::Counters(counters::CounterSampler::new(anonymizer))
                } else {
                    warn!(
                        target: "netmood::capture",
                        "no network interfaces visible, falling back to simulation"
                    );
                    CaptureSource::Simulation(sim::Simulator::new(anonymizer))
                }
            }
            SourceKind::Auto => {
                if let Some(driver) = driver {
                    info!(
                        target: "netmood::capture",
                        "using live capture via {}",
                        driver.description()
                    );
                    return CaptureSource::Live(live::LiveCapture::new(driver, anonymizer));
                }
                if counters::available() {
                    info!(target: "netmood::capture", "no live capture driver, using interface counter sampling");
                    return CaptureSource::Counters(counters::CounterSampler::new(anonymizer));
                }
                info!(target: "netmood::capture", "no capture capability available, using simulation");
                CaptureSource::Simulation(sim::Simulator::new(anonymizer))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CaptureSource::Live(_) => "live",
            CaptureSource::Counters(_) => "counters",
            CaptureSource::Simulation(_) => "simulation",
        }
    }

    /// Poll for the next observation. Never blocks longer than the
    /// variant's tick interval.
    pub async fn next(&mut self) -> Captured {
        match self {
            CaptureSource::Live(source) => source.next().await,
            CaptureSource::Counters(source) => source.next().await,
            CaptureSource::Simulation(source) => source.next().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CaptureError;

    struct NoopDriver;

    impl LinkDriver for NoopDriver {
        fn poll(&mut self) -> Result<FramePoll, CaptureError> {
            Ok(FramePoll::Closed)
        }

        fn description(&self) -> &str {
            "noop"
        }
    }

    fn anonymizer() -> Arc<Anonymizer> {
        Arc::new(Anonymizer::new(1))
    }

    #[test]
    fn test_sim_override_wins() {
        let source = CaptureSource::select(SourceKind::Sim, anonymizer(), Some(Box::new(NoopDriver)));
        assert_eq!(source.kind(), "simulation");
    }

    #[test]
    fn test_auto_prefers_injected_driver() {
        let source =
            CaptureSource::select(SourceKind::Auto, anonymizer(), Some(Box::new(NoopDriver)));
        assert_eq!(source.kind(), "live");
    }

    #[test]
    fn test_auto_without_driver_falls_back() {
        let source = CaptureSource::select(SourceKind::Auto, anonymizer(), None);
        // Either counters (interfaces visible) or simulation; never live.
        assert_ne!(source.kind(), "live");
    }
}
