//! Windowed mood analysis over the most recent observations.
//!
//! The consumer loop feeds every classified observation into a fixed-size
//! ring; every `interval` consumed observations the window is re-analyzed
//! into a `WindowSnapshot`. A snapshot is immutable once published and is
//! superseded, not merged, by the next one.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::observation::{MoodLabel, Observation};

/// Analysis is skipped below this many buffered observations.
pub const MIN_ANALYSIS_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    High,
    Medium,
    Info,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::High => "high",
            AlertSeverity::Medium => "medium",
            AlertSeverity::Info => "info",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
}

/// Per-label detail over the analyzed window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodBreakdown {
    pub count: u64,
    pub total_bytes: u64,
    pub total_rate: f64,
    pub avg_bytes: f64,
    pub avg_rate: f64,
    pub avg_entropy: f64,
    pub protocols: BTreeMap<String, u64>,
    /// Distinct sources plus distinct destinations. An address seen on both
    /// sides counts twice; accepted behavior, not deduplicated.
    pub distinct_addresses: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub generated_at: DateTime<Local>,
    pub sample_count: usize,
    /// Per-label share of the window, one decimal, normalized to sum 100.
    pub percentages: BTreeMap<MoodLabel, f64>,
    pub moods: BTreeMap<MoodLabel, MoodBreakdown>,
    /// Ordered by severity; never empty.
    pub alerts: Vec<Alert>,
    pub summary: String,
}

/// Ring buffer of the most recent observations plus the analysis cadence.
pub struct WindowAnalyzer {
    window: VecDeque<Observation>,
    window_size: usize,
    interval: usize,
    consumed: u64,
}

impl WindowAnalyzer {
    pub fn new(window_size: usize, interval: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            interval,
            consumed: 0,
        }
    }

    /// Add a classified observation to the window, evicting the oldest on
    /// overflow. Returns true when an analysis pass is due.
    pub fn push(&mut self, observation: Observation) -> bool {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(observation);
        self.consumed += 1;
        self.consumed % self.interval as u64 == 0
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Analyze the current window; `None` while fewer than
    /// `MIN_ANALYSIS_SAMPLES` observations are buffered.
    pub fn analyze(&mut self) -> Option<WindowSnapshot> {
        analyze_observations(self.window.make_contiguous())
    }
}

/// Analyze a slice of classified observations into a snapshot.
///
/// Shared by the live window and the offline CSV batch path.
pub fn analyze_observations(observations: &[Observation]) -> Option<WindowSnapshot> {
    if observations.len() < MIN_ANALYSIS_SAMPLES {
        return None;
    }

    let mut moods = BTreeMap::new();
    for label in MoodLabel::ALL {
        moods.insert(label, breakdown_for(label, observations));
    }

    let percentages = mood_percentages(&moods, observations.len());
    let alerts = build_alerts(&percentages);
    let summary = build_summary(observations, &percentages, &moods);

    Some(WindowSnapshot {
        generated_at: Local::now(),
        sample_count: observations.len(),
        percentages,
        moods,
        alerts,
        summary,
    })
}

fn breakdown_for(label: MoodLabel, observations: &[Observation]) -> MoodBreakdown {
    let matching: Vec<&Observation> = observations.iter().filter(|o| o.mood == label).collect();
    if matching.is_empty() {
        return MoodBreakdown::default();
    }

    let count = matching.len() as u64;
    let total_bytes: u64 = matching.iter().map(|o| o.bytes).sum();
    let total_rate: f64 = matching.iter().map(|o| o.rate).sum();
    let total_entropy: f64 = matching.iter().map(|o| o.entropy).sum();

    let mut protocols: BTreeMap<String, u64> = BTreeMap::new();
    for o in &matching {
        *protocols.entry(o.protocol.clone()).or_insert(0) += 1;
    }

    let sources: HashSet<&str> = matching.iter().map(|o| o.source.as_str()).collect();
    let destinations: HashSet<&str> = matching.iter().map(|o| o.destination.as_str()).collect();

    MoodBreakdown {
        count,
        total_bytes,
        total_rate,
        avg_bytes: total_bytes as f64 / count as f64,
        avg_rate: total_rate / count as f64,
        avg_entropy: total_entropy / count as f64,
        protocols,
        distinct_addresses: sources.len() + destinations.len(),
    }
}

/// Per-label percentages in tenths-of-a-percent precision, with a final
/// normalization pass: any rounding residue is folded into the dominant
/// label so the total is exactly 100.
fn mood_percentages(
    moods: &BTreeMap<MoodLabel, MoodBreakdown>,
    total: usize,
) -> BTreeMap<MoodLabel, f64> {
    let mut tenths: BTreeMap<MoodLabel, i64> = BTreeMap::new();
    for label in MoodLabel::ALL {
        let count = moods.get(&label).map(|b| b.count).unwrap_or(0);
        let value = if total > 0 {
            (count as f64 / total as f64 * 1000.0).round() as i64
        } else {
            0
        };
        tenths.insert(label, value);
    }

    if total > 0 {
        let sum: i64 = tenths.values().sum();
        let residue = 1000 - sum;
        if residue != 0 {
            let dominant = dominant_label(&tenths);
            *tenths.entry(dominant).or_insert(0) += residue;
        }
    }

    tenths
        .into_iter()
        .map(|(label, t)| (label, t as f64 / 10.0))
        .collect()
}

/// Highest share wins; ties break on the fixed label precedence encoded by
/// `MoodLabel::ALL` declaration order.
fn dominant_label(tenths: &BTreeMap<MoodLabel, i64>) -> MoodLabel {
    let mut best = MoodLabel::Calm;
    let mut best_value = i64::MIN;
    for label in MoodLabel::ALL {
        let value = tenths.get(&label).copied().unwrap_or(0);
        if value > best_value {
            best = label;
            best_value = value;
        }
    }
    best
}

/// Threshold alerts in severity order. The list is never empty: with no
/// threshold tripped a single informational nominal alert is emitted.
fn build_alerts(percentages: &BTreeMap<MoodLabel, f64>) -> Vec<Alert> {
    let pct = |label: MoodLabel| percentages.get(&label).copied().unwrap_or(0.0);
    let mut alerts = Vec::new();

    let angry = pct(MoodLabel::Angry);
    if angry > 15.0 {
        alerts.push(Alert {
            severity: AlertSeverity::High,
            message: format!(
                "Network anger level at {}% - security review required",
                angry
            ),
        });
    }

    let anxious = pct(MoodLabel::Anxious);
    if anxious > 25.0 {
        alerts.push(Alert {
            severity: AlertSeverity::Medium,
            message: format!(
                "Network anxiety at {}% - tighten monitoring",
                anxious
            ),
        });
    }

    let calm = pct(MoodLabel::Calm);
    if calm > 60.0 {
        alerts.push(Alert {
            severity: AlertSeverity::Info,
            message: format!("Network nominal - calm level at {}%", calm),
        });
    }

    if alerts.is_empty() {
        alerts.push(Alert {
            severity: AlertSeverity::Info,
            message: "All mood indicators within normal range".to_string(),
        });
    }

    alerts
}

fn build_summary(
    observations: &[Observation],
    percentages: &BTreeMap<MoodLabel, f64>,
    moods: &BTreeMap<MoodLabel, MoodBreakdown>,
) -> String {
    let total = observations.len();
    let total_bytes: u64 = observations.iter().map(|o| o.bytes).sum();
    let avg_entropy =
        observations.iter().map(|o| o.entropy).sum::<f64>() / total.max(1) as f64;

    let tenths: BTreeMap<MoodLabel, i64> = percentages
        .iter()
        .map(|(l, p)| (*l, (p * 10.0).round() as i64))
        .collect();
    let dominant = dominant_label(&tenths);
    let dominant_pct = percentages.get(&dominant).copied().unwrap_or(0.0);

    let mut lines = Vec::new();
    lines.push(match dominant {
        MoodLabel::Calm => format!(
            "Network is calm: {}% of {} samples show stable patterns (avg entropy {:.2}).",
            dominant_pct, total, avg_entropy
        ),
        MoodLabel::Happy => format!(
            "Network shows healthy activity: {}% of traffic follows normal patterns ({:.1} KiB processed).",
            dominant_pct,
            total_bytes as f64 / 1024.0
        ),
        MoodLabel::Anxious => format!(
            "Anxious patterns detected: {}% of traffic is irregular (avg entropy {:.2}); additional monitoring advised.",
            dominant_pct, avg_entropy
        ),
        MoodLabel::Angry => format!(
            "Warning: {}% of traffic matches hostile patterns; immediate security review recommended.",
            dominant_pct
        ),
        MoodLabel::Sad => format!(
            "Network is quiet: {}% of traffic is low-volume background chatter.",
            dominant_pct
        ),
    });

    for label in MoodLabel::ALL {
        let breakdown = moods.get(&label);
        let count = breakdown.map(|b| b.count).unwrap_or(0);
        let entropy = breakdown.map(|b| b.avg_entropy).unwrap_or(0.0);
        lines.push(format!(
            "- {}: {} samples (avg entropy {:.2})",
            label, count, entropy
        ));
    }

    lines.join("\n")
}
