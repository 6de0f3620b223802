//! CSV export of observation records.

use std::io::{self, Write};

use chrono::{DateTime, Local};

use crate::observation::Observation;

/// Export field names, in record order. The header row uses exactly these.
pub const EXPORT_FIELDS: [&str; 8] = [
    "timestamp",
    "source-address",
    "destination-address",
    "protocol",
    "byte-count",
    "rate",
    "entropy",
    "mood-label",
];

pub fn header_line() -> String {
    EXPORT_FIELDS.join(",")
}

/// Format one observation as a CSV record. Timestamps are ISO-8601 in the
/// local offset; none of the remaining fields can contain a comma.
pub fn record_line(observation: &Observation) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        observation.timestamp.to_rfc3339(),
        observation.source,
        observation.destination,
        observation.protocol,
        observation.bytes,
        observation.rate,
        observation.entropy,
        observation.mood
    )
}

/// Write header plus one record per observation; returns the record count.
pub fn write_csv<W: Write>(sink: &mut W, observations: &[Observation]) -> io::Result<usize> {
    writeln!(sink, "{}", header_line())?;
    for observation in observations {
        writeln!(sink, "{}", record_line(observation))?;
    }
    Ok(observations.len())
}

/// Timestamped file name for a shutdown export.
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("netmood_capture_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
