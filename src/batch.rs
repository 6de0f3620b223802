//! Offline batch analysis of exported CSV data.
//!
//! Re-ingests the export format (see `export::EXPORT_FIELDS`) and runs the
//! same window analysis over the whole file. A malformed record is logged
//! and skipped; the run continues.

use chrono::{DateTime, Local};
use tracing::warn;

use crate::analyzer::{analyze_observations, WindowSnapshot, MIN_ANALYSIS_SAMPLES};
use crate::errors::{CsvError, NetMoodError};
use crate::export;
use crate::observation::{MoodLabel, Observation};

/// Built-in sample data set for the demo subcommand.
pub const SAMPLE_CSV: &str = "\
timestamp,source-address,destination-address,protocol,byte-count,rate,entropy,mood-label
2025-10-03T10:00:00+00:00,192.168.0.1,8.8.8.8,TCP,23456,120,0.62,calm
2025-10-03T10:01:00+00:00,192.168.0.2,10.0.0.5,UDP,34000,780,0.85,angry
2025-10-03T10:02:00+00:00,192.168.0.3,1.1.1.1,ICMP,4500,40,0.55,happy
2025-10-03T10:03:00+00:00,192.168.0.3,8.8.4.4,TCP,17000,500,0.75,anxious
2025-10-03T10:04:00+00:00,192.168.0.4,20.1.1.2,TCP,20000,230,0.68,calm
2025-10-03T10:05:00+00:00,192.168.0.5,8.8.8.8,TCP,15000,180,0.45,calm
2025-10-03T10:06:00+00:00,192.168.0.6,10.0.0.1,UDP,50000,920,0.92,angry
2025-10-03T10:07:00+00:00,192.168.0.7,1.1.1.1,TCP,28000,350,0.58,happy
2025-10-03T10:08:00+00:00,192.168.0.8,8.8.4.4,ICMP,8000,60,0.42,calm
2025-10-03T10:09:00+00:00,192.168.0.9,20.1.1.2,TCP,32000,480,0.78,anxious
";

/// Parse exported CSV text back into observations.
///
/// The header row must match the export field names exactly. Bad records
/// are skipped with a warning; an input with no valid records is an error.
pub fn parse_csv(text: &str) -> Result<Vec<Observation>, CsvError> {
    let mut lines = text.lines();
    let header = lines.next().map(str::trim).unwrap_or_default();
    if header != export::header_line() {
        return Err(CsvError::MissingHeader);
    }

    let mut observations = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_record(line) {
            Ok(observation) => observations.push(observation),
            Err(reason) => {
                // line 1 is the header
                warn!(
                    target: "netmood::batch",
                    "skipping malformed record on line {}: {}",
                    index + 2,
                    reason
                );
            }
        }
    }

    if observations.is_empty() {
        return Err(CsvError::Empty);
    }
    Ok(observations)
}

fn parse_record(line: &str) -> Result<Observation, String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != export::EXPORT_FIELDS.len() {
        return Err(format!(
            "expected {} fields, got {}",
            export::EXPORT_FIELDS.len(),
            fields.len()
        ));
    }

    let timestamp: DateTime<Local> = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| format!("bad timestamp: {}", e))?
        .with_timezone(&Local);
    let bytes: u64 = fields[4]
        .parse()
        .map_err(|_| format!("bad byte-count '{}'", fields[4]))?;
    let rate: f64 = fields[5]
        .parse()
        .map_err(|_| format!("bad rate '{}'", fields[5]))?;
    let entropy: f64 = fields[6]
        .parse()
        .map_err(|_| format!("bad entropy '{}'", fields[6]))?;
    let mood =
        MoodLabel::parse(fields[7]).ok_or_else(|| format!("unknown mood label '{}'", fields[7]))?;

    Ok(Observation {
        timestamp,
        source: fields[1].to_string(),
        destination: fields[2].to_string(),
        protocol: fields[3].to_string(),
        bytes,
        rate,
        entropy,
        mood,
    })
}

/// Parse and analyze a whole exported file in one pass.
pub fn analyze_csv(text: &str) -> Result<WindowSnapshot, NetMoodError> {
    let observations = parse_csv(text)?;
    analyze_observations(&observations).ok_or_else(|| {
        NetMoodError::Csv(CsvError::TooFewRecords {
            have: observations.len(),
            need: MIN_ANALYSIS_SAMPLES,
        })
    })
}
