//! Domain-specific error types for the NetMood pipeline.
//!
//! Nothing here is fatal to the process: every failure mode degrades
//! functionality (fewer captures, a stale snapshot, fewer subscribers)
//! rather than terminating the pipeline.
#![allow(dead_code)]

use thiserror::Error;

/// Capture source errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("capture driver error: {0}")]
    Driver(String),
}

/// Configuration validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("privacy level must be 1-5, got {0}")]
    InvalidPrivacyLevel(u8),

    #[error("queue capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("window size {window} is smaller than the analysis minimum {min}")]
    WindowTooSmall { window: usize, min: usize },

    #[error("analysis interval must be greater than zero")]
    ZeroAnalysisInterval,

    #[error("invalid trusted network '{net}': {reason}")]
    InvalidTrustedNetwork { net: String, reason: String },

    #[error("invalid listen address '{0}'")]
    InvalidListenAddr(String),

    #[error("unknown capture source '{0}' (expected auto, counters or sim)")]
    UnknownSource(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CSV parsing errors for the offline batch analyzer
#[derive(Error, Debug)]
pub enum CsvError {
    #[error("missing or invalid header row")]
    MissingHeader,

    #[error("no valid records in input")]
    Empty,

    #[error("too few records for analysis: {have} (minimum {need})")]
    TooFewRecords { have: usize, need: usize },
}

/// HTTP surface errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("rate limit exceeded for {0}")]
    RateLimitExceeded(String),
}

/// Unified pipeline error type
#[derive(Error, Debug)]
pub enum NetMoodError {
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("csv error: {0}")]
    Csv(#[from] CsvError),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("export error: {0}")]
    Export(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for NetMoodError {
    fn from(e: serde_json::Error) -> Self {
        NetMoodError::Serialization(e.to_string())
    }
}

/// Result type alias for pipeline operations
pub type NetMoodResult<T> = Result<T, NetMoodError>;
