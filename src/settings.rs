//! Runtime settings.
//!
//! Layered the usual way: built-in defaults, then an optional config file,
//! then `NETPULSE_*` environment overrides. Command-line flags are merged on
//! top by the binary.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::DEFAULT_HISTORY_CAP;
use crate::service::ServiceConfig;
use crate::source::METRICS_TOPIC;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Push topic to subscribe to.
    pub topic: String,
    /// Maximum retained snapshots.
    pub history_cap: usize,
    /// Bound on the initial pull and every refresh, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            topic: METRICS_TOPIC.to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            fetch_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings, merging an optional file and environment overrides
    /// over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("topic", defaults.topic)?
            .set_default("history_cap", defaults.history_cap as u64)?
            .set_default("fetch_timeout_secs", defaults.fetch_timeout_secs)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix("NETPULSE"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            topic: self.topic.clone(),
            history_cap: self.history_cap,
            fetch_timeout: self.fetch_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "topic = \"custom-topic\"\nhistory_cap = 50").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.topic, "custom-topic");
        assert_eq!(settings.history_cap, 50);
        // Untouched keys keep their defaults.
        assert_eq!(settings.fetch_timeout_secs, 10);
    }

    #[test]
    fn test_service_config_carries_settings() {
        let settings = Settings {
            topic: "t".to_string(),
            history_cap: 5,
            fetch_timeout_secs: 3,
        };
        let config = settings.service_config();
        assert_eq!(config.topic, "t");
        assert_eq!(config.history_cap, 5);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
    }
}
