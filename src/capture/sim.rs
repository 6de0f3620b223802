//! Simulation source: synthetic observations at a fixed 2 Hz tick.
//!
//! Used when no capture capability exists at all, so the rest of the
//! pipeline (and its consumers) can run anywhere.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;

use super::Captured;
use crate::observation::Observation;
use crate::privacy::Anonymizer;

const SIM_TICK: Duration = Duration::from_millis(500);

const SIM_PROTOCOLS: [&str; 3] = ["TCP", "UDP", "ICMP"];
const SIM_SOURCE: &str = "192.168.1.100";
const SIM_DESTINATION: &str = "8.8.8.8";

pub struct Simulator {
    anonymizer: Arc<Anonymizer>,
}

impl Simulator {
    pub fn new(anonymizer: Arc<Anonymizer>) -> Self {
        Self { anonymizer }
    }

    pub async fn next(&mut self) -> Captured {
        tokio::time::sleep(SIM_TICK).await;
        Captured::Observation(self.generate())
    }

    fn generate(&self) -> Observation {
        let mut rng = rand::thread_rng();
        let protocol = SIM_PROTOCOLS
            .choose(&mut rng)
            .copied()
            .unwrap_or("TCP")
            .to_string();

        Observation {
            timestamp: Local::now(),
            source: self.anonymizer.anonymize(SIM_SOURCE),
            destination: self.anonymizer.anonymize(SIM_DESTINATION),
            protocol,
            bytes: rng.gen_range(1_000..51_000),
            rate: rng.gen_range(100.0..1_100.0),
            entropy: rng.gen_range(0.0..1.0),
            mood: Default::default(),
        }
    }
}
