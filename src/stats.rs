//! Running capture statistics.
//!
//! Single-writer: only the consumer loop calls `record`. Readers always get
//! an immutable copy, never a live reference; the observation rate is
//! derived from elapsed time at read time, not stored.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::observation::MoodLabel;

/// Immutable copy of the aggregate counters at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub per_mood: BTreeMap<MoodLabel, u64>,
    pub started_at: DateTime<Local>,
    pub elapsed_seconds: f64,
    /// Observations per second since start.
    pub rate: f64,
    /// Observations dropped by the bounded queue, never absorbed into
    /// `total` as successes.
    pub dropped: u64,
}

struct Inner {
    total: u64,
    per_mood: BTreeMap<MoodLabel, u64>,
}

pub struct StatsAggregator {
    inner: RwLock<Inner>,
    started_at: DateTime<Local>,
    started: Instant,
}

impl StatsAggregator {
    pub fn new() -> Self {
        let mut per_mood = BTreeMap::new();
        for label in MoodLabel::ALL {
            per_mood.insert(label, 0);
        }
        Self {
            inner: RwLock::new(Inner { total: 0, per_mood }),
            started_at: Local::now(),
            started: Instant::now(),
        }
    }

    /// Record one consumed, classified observation.
    pub fn record(&self, mood: MoodLabel) {
        let mut inner = self.inner.write();
        inner.total += 1;
        *inner.per_mood.entry(mood).or_insert(0) += 1;
    }

    /// Take an immutable snapshot; `dropped` is the queue's drop counter.
    pub fn snapshot(&self, dropped: u64) -> StatsSnapshot {
        let inner = self.inner.read();
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            inner.total as f64 / elapsed
        } else {
            0.0
        };
        StatsSnapshot {
            total: inner.total,
            per_mood: inner.per_mood.clone(),
            started_at: self.started_at,
            elapsed_seconds: elapsed,
            rate,
            dropped,
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_labels_start_at_zero() {
        let stats = StatsAggregator::new();
        let snapshot = stats.snapshot(0);
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.per_mood.len(), MoodLabel::ALL.len());
        assert!(snapshot.per_mood.values().all(|&c| c == 0));
    }

    #[test]
    fn test_record_updates_total_and_label() {
        let stats = StatsAggregator::new();
        stats.record(MoodLabel::Angry);
        stats.record(MoodLabel::Angry);
        stats.record(MoodLabel::Calm);

        let snapshot = stats.snapshot(5);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.per_mood[&MoodLabel::Angry], 2);
        assert_eq!(snapshot.per_mood[&MoodLabel::Calm], 1);
        assert_eq!(snapshot.per_mood[&MoodLabel::Sad], 0);
        assert_eq!(snapshot.dropped, 5);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let stats = StatsAggregator::new();
        stats.record(MoodLabel::Happy);
        let snapshot = stats.snapshot(0);
        stats.record(MoodLabel::Happy);
        // the earlier copy is unaffected by later writes
        assert_eq!(snapshot.total, 1);
        assert_eq!(stats.snapshot(0).total, 2);
    }

    #[test]
    fn test_rate_is_derived_from_elapsed_time() {
        let stats = StatsAggregator::new();
        for _ in 0..10 {
            stats.record(MoodLabel::Calm);
        }
        let snapshot = stats.snapshot(0);
        assert!(snapshot.elapsed_seconds >= 0.0);
        assert!(snapshot.rate >= 0.0);
    }
}
