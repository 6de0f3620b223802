//! Core observation types shared across the capture pipeline.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Mood labels assigned to classified traffic.
///
/// Declaration order is the tie-break precedence when picking a dominant
/// label for the window summary (calm wins over happy, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Calm,
    Happy,
    Anxious,
    Angry,
    Sad,
}

impl MoodLabel {
    pub const ALL: [MoodLabel; 5] = [
        MoodLabel::Calm,
        MoodLabel::Happy,
        MoodLabel::Anxious,
        MoodLabel::Angry,
        MoodLabel::Sad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Calm => "calm",
            MoodLabel::Happy => "happy",
            MoodLabel::Anxious => "anxious",
            MoodLabel::Angry => "angry",
            MoodLabel::Sad => "sad",
        }
    }

    /// Parse the lowercase wire/CSV form.
    pub fn parse(s: &str) -> Option<MoodLabel> {
        match s.trim() {
            "calm" => Some(MoodLabel::Calm),
            "happy" => Some(MoodLabel::Happy),
            "anxious" => Some(MoodLabel::Anxious),
            "angry" => Some(MoodLabel::Angry),
            "sad" => Some(MoodLabel::Sad),
            _ => None,
        }
    }
}

impl Default for MoodLabel {
    fn default() -> Self {
        MoodLabel::Calm
    }
}

impl std::fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One traffic sample flowing through the pipeline.
///
/// Created by a capture source with `mood` left at its default; the consumer
/// loop assigns the label exactly once after classification. Addresses are
/// already anonymized by the time an observation exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Local>,
    pub source: String,
    pub destination: String,
    pub protocol: String,
    pub bytes: u64,
    /// Units per second as reported or synthesized by the source.
    pub rate: f64,
    /// Normalized Shannon entropy of the payload, in [0, 1].
    pub entropy: f64,
    pub mood: MoodLabel,
}

/// Map an IP protocol number to its conventional name.
pub fn protocol_name(proto: u8) -> String {
    match proto {
        1 => "ICMP".to_string(),
        6 => "TCP".to_string(),
        17 => "UDP".to_string(),
        47 => "GRE".to_string(),
        50 => "ESP".to_string(),
        51 => "AH".to_string(),
        other => format!("proto-{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_label_roundtrip() {
        for label in MoodLabel::ALL {
            assert_eq!(MoodLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(MoodLabel::parse("bogus"), None);
    }

    #[test]
    fn test_mood_label_serde_lowercase() {
        let json = serde_json::to_string(&MoodLabel::Anxious).unwrap();
        assert_eq!(json, "\"anxious\"");
    }

    #[test]
    fn test_default_mood_is_calm() {
        assert_eq!(MoodLabel::default(), MoodLabel::Calm);
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(protocol_name(6), "TCP");
        assert_eq!(protocol_name(17), "UDP");
        assert_eq!(protocol_name(1), "ICMP");
        assert_eq!(protocol_name(99), "proto-99");
    }
}
