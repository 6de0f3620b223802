//! Runtime settings: defaults, optional TOML file, `NETMOOD_*` env overrides.
//!
//! The capture controller receives an already-validated `Settings`; all
//! loading and validation happens here at the edge.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyzer::MIN_ANALYSIS_SAMPLES;
use crate::errors::ConfigError;

/// Capture source selection. `Auto` runs the capability probe chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Auto,
    Counters,
    Sim,
}

impl Default for SourceKind {
    fn default() -> Self {
        SourceKind::Auto
    }
}

impl SourceKind {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SourceKind::Auto),
            "counters" => Ok(SourceKind::Counters),
            "sim" | "simulation" => Ok(SourceKind::Sim),
            other => Err(ConfigError::UnknownSource(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address anonymization aggressiveness, 1-5.
    pub privacy_level: u8,

    /// Field names replaced with the redaction placeholder in any record
    /// passed through `privacy::redact`, independent of the level.
    pub sensitive_fields: Vec<String>,

    /// Bounded event queue capacity between producer and consumer.
    pub queue_capacity: usize,

    /// Number of most-recent observations kept for windowed analysis.
    pub window_size: usize,

    /// Re-analyze the window every this many consumed observations.
    pub analysis_interval: usize,

    /// Capture source override; `auto` probes live -> counters -> sim.
    pub source: SourceKind,

    /// HTTP/WS listen address.
    pub listen: String,

    /// CIDR allowlist for non-loopback HTTP clients.
    pub trusted_networks: Vec<String>,

    /// Per-client request budget for the HTTP surface (requests/second).
    pub rate_limit_rps: u64,

    /// Directory receiving the shutdown CSV export.
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            privacy_level: 3,
            sensitive_fields: vec![
                "username".to_string(),
                "user_id".to_string(),
                "email".to_string(),
                "phone".to_string(),
                "name".to_string(),
            ],
            queue_capacity: 1000,
            window_size: 100,
            analysis_interval: 10,
            source: SourceKind::Auto,
            listen: "127.0.0.1:8765".to_string(),
            trusted_networks: vec!["192.168.0.0/16".to_string(), "10.0.0.0/8".to_string()],
            rate_limit_rps: 50,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the optional TOML file, then env
    /// overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `NETMOOD_*` environment overrides on top of current values.
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("NETMOOD_PRIVACY_LEVEL") {
            if let Ok(level) = val.trim().parse::<u8>() {
                self.privacy_level = level;
            }
        }

        if let Ok(val) = env::var("NETMOOD_QUEUE_CAPACITY") {
            if let Ok(cap) = val.trim().parse::<usize>() {
                self.queue_capacity = cap;
            }
        }

        if let Ok(val) = env::var("NETMOOD_WINDOW_SIZE") {
            if let Ok(n) = val.trim().parse::<usize>() {
                self.window_size = n;
            }
        }

        if let Ok(val) = env::var("NETMOOD_ANALYSIS_INTERVAL") {
            if let Ok(k) = val.trim().parse::<usize>() {
                self.analysis_interval = k;
            }
        }

        if let Ok(val) = env::var("NETMOOD_SOURCE") {
            self.source = SourceKind::parse(&val)?;
        }

        if let Ok(val) = env::var("NETMOOD_LISTEN") {
            self.listen = val.trim().to_string();
        }

        if let Ok(val) = env::var("NETMOOD_TRUSTED_NETWORKS") {
            self.trusted_networks = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(val) = env::var("NETMOOD_RATE_LIMIT_RPS") {
            if let Ok(rps) = val.trim().parse::<u64>() {
                self.rate_limit_rps = rps;
            }
        }

        if let Ok(val) = env::var("NETMOOD_EXPORT_DIR") {
            self.export_dir = PathBuf::from(val.trim());
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=5).contains(&self.privacy_level) {
            return Err(ConfigError::InvalidPrivacyLevel(self.privacy_level));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        if self.window_size < MIN_ANALYSIS_SAMPLES {
            return Err(ConfigError::WindowTooSmall {
                window: self.window_size,
                min: MIN_ANALYSIS_SAMPLES,
            });
        }

        if self.analysis_interval == 0 {
            return Err(ConfigError::ZeroAnalysisInterval);
        }

        if self.listen.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen.clone()));
        }

        for net in &self.trusted_networks {
            if let Err(e) = net.parse::<ipnet::IpNet>() {
                return Err(ConfigError::InvalidTrustedNetwork {
                    net: net.clone(),
                    reason: e.to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        // validate() guarantees this parses
        self.listen.parse().expect("validated listen address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.privacy_level, 3);
        assert_eq!(settings.queue_capacity, 1000);
        assert_eq!(settings.window_size, 100);
        assert_eq!(settings.analysis_interval, 10);
    }

    #[test]
    fn test_privacy_level_bounds() {
        let mut settings = Settings::default();
        settings.privacy_level = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidPrivacyLevel(0))
        ));
        settings.privacy_level = 6;
        assert!(settings.validate().is_err());
        settings.privacy_level = 5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_window_must_cover_analysis_minimum() {
        let mut settings = Settings::default();
        settings.window_size = 5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::WindowTooSmall { window: 5, .. })
        ));
    }

    #[test]
    fn test_bad_trusted_network_rejected() {
        let mut settings = Settings::default();
        settings.trusted_networks = vec!["not-a-cidr".to_string()];
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidTrustedNetwork { .. })
        ));
    }

    #[test]
    fn test_bad_listen_addr_rejected() {
        let mut settings = Settings::default();
        settings.listen = "localhost".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidListenAddr(_))
        ));
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!(SourceKind::parse("sim").unwrap(), SourceKind::Sim);
        assert_eq!(SourceKind::parse("Counters").unwrap(), SourceKind::Counters);
        assert_eq!(SourceKind::parse("auto").unwrap(), SourceKind::Auto);
        assert!(SourceKind::parse("pcap").is_err());
    }

    #[test]
    fn test_toml_partial_file() {
        let settings: Settings =
            toml::from_str("privacy_level = 5\nqueue_capacity = 64").unwrap();
        assert_eq!(settings.privacy_level, 5);
        assert_eq!(settings.queue_capacity, 64);
        // untouched fields keep their defaults
        assert_eq!(settings.window_size, 100);
    }
}
