//! Rule-based mood classification.

use crate::features::FeatureVector;
use crate::observation::MoodLabel;

/// Classify a feature vector into a mood label.
///
/// Rules are evaluated in order and the first match wins. Anomaly rules
/// (angry, anxious) come before benign-activity rules so that traffic
/// matching both is always labeled as the anomaly. Reordering this cascade
/// changes classification outcomes on overlapping feature ranges.
pub fn classify(features: &FeatureVector) -> MoodLabel {
    let FeatureVector {
        entropy,
        bytes,
        rate,
    } = *features;

    if entropy > 0.8 && bytes > 50_000 {
        MoodLabel::Angry
    } else if entropy > 0.6 && rate > 500.0 {
        MoodLabel::Anxious
    } else if bytes < 1_000 && rate < 100.0 {
        MoodLabel::Sad
    } else if rate > 1_000.0 && entropy < 0.3 {
        MoodLabel::Happy
    } else {
        MoodLabel::Calm
    }
}
