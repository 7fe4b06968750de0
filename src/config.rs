//! Configuration management.
//!
//! [`Settings`] holds the tunable timing and channel parameters of the scan
//! coordination layer, deserialized from a TOML file via the `config` crate.
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration.

use crate::error::ScanError;
use config::Config;
use serde::Deserialize;
use std::time::Duration;

/// Tunable parameters for move controllers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level for the demo binary (trace, debug, info, warn, error).
    pub log_level: String,

    /// Upper bound on waiting for axes to reach the start position.
    #[serde(with = "humantime_serde")]
    pub prepare_timeout: Duration,

    /// Poll interval while waiting for axes to settle.
    #[serde(with = "humantime_serde")]
    pub settle_poll_interval: Duration,

    /// Capacity of the trigger-event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            prepare_timeout: Duration::from_secs(30),
            settle_poll_interval: Duration::from_millis(50),
            event_channel_capacity: 128,
        }
    }
}

impl Settings {
    /// Load settings from the named TOML file.
    pub fn from_file(path: &str) -> Result<Self, ScanError> {
        let loaded = Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;
        let settings: Settings = loaded.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check for values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.prepare_timeout.is_zero() {
            return Err(ScanError::InvalidSettings(
                "prepare_timeout must be positive".to_string(),
            ));
        }
        if self.settle_poll_interval.is_zero() {
            return Err(ScanError::InvalidSettings(
                "settle_poll_interval must be positive".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ScanError::InvalidSettings(
                "event_channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.prepare_timeout, Duration::from_secs(30));
        assert_eq!(settings.event_channel_capacity, 128);
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            log_level = "debug"
            prepare_timeout = "5s"
            settle_poll_interval = "10ms"
            event_channel_capacity = 16
            "#
        )
        .unwrap();

        let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.prepare_timeout, Duration::from_secs(5));
        assert_eq!(settings.settle_poll_interval, Duration::from_millis(10));
        assert_eq!(settings.event_channel_capacity, 16);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "event_channel_capacity = 8\n").unwrap();

        let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.event_channel_capacity, 8);
        assert_eq!(settings.prepare_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let settings = Settings {
            event_channel_capacity: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ScanError::InvalidSettings(_))
        ));
    }
}
