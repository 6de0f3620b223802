//! Interface counter sampling.
//!
//! When no live driver is available the host's interface byte and packet
//! counters are polled at a fixed 1 Hz tick and one pseudo-observation is
//! synthesized per non-idle interface. There is no payload to measure, so
//! these observations carry a neutral entropy.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use sysinfo::Networks;
use tracing::debug;

use super::Captured;
use crate::observation::Observation;
use crate::privacy::Anonymizer;

/// Sampling cadence.
const COUNTER_TICK: Duration = Duration::from_secs(1);

/// Entropy assigned to synthesized counter observations.
const COUNTER_ENTROPY: f64 = 0.5;

/// Synthesized endpoints for counter observations (no per-flow addressing
/// exists at this granularity).
const COUNTER_SOURCE: &str = "192.168.1.100";
const COUNTER_DESTINATION: &str = "8.8.8.8";

/// Capability probe: true when any network interface is visible.
pub fn available() -> bool {
    let networks = Networks::new_with_refreshed_list();
    (&networks).into_iter().next().is_some()
}

pub struct CounterSampler {
    networks: Networks,
    pending: VecDeque<Observation>,
    anonymizer: Arc<Anonymizer>,
}

impl CounterSampler {
    pub fn new(anonymizer: Arc<Anonymizer>) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            pending: VecDeque::new(),
            anonymizer,
        }
    }

    pub async fn next(&mut self) -> Captured {
        if let Some(observation) = self.pending.pop_front() {
            return Captured::Observation(observation);
        }

        tokio::time::sleep(COUNTER_TICK).await;
        self.networks.refresh();

        for (name, data) in &self.networks {
            // received()/transmitted() report deltas since the last refresh
            let bytes = data.received() + data.transmitted();
            let packets = data.packets_received() + data.packets_transmitted();
            if bytes == 0 {
                continue;
            }

            debug!(
                target: "netmood::capture",
                "interface {} moved {} bytes / {} packets",
                name, bytes, packets
            );

            self.pending.push_back(Observation {
                timestamp: Local::now(),
                source: self.anonymizer.anonymize(COUNTER_SOURCE),
                destination: self.anonymizer.anonymize(COUNTER_DESTINATION),
                protocol: "TCP".to_string(),
                bytes,
                rate: packets as f64,
                entropy: COUNTER_ENTROPY,
                mood: Default::default(),
            });
        }

        match self.pending.pop_front() {
            Some(observation) => Captured::Observation(observation),
            None => Captured::Idle,
        }
    }
}
