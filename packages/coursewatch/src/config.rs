//! Engine configuration: poll cadence, snapshot location, filter windows.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::ConfigError;
use crate::recency;

/// Configuration for the watch engine, loaded from the environment or
/// built in code. Every field has a usable default.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory holding the durable snapshot mirror, one subdirectory
    /// per resource kind
    pub snapshot_dir: PathBuf,
    pub announcement_interval: Duration,
    pub grade_interval: Duration,
    pub inbox_interval: Duration,
    /// Admission window for announcement publish and start dates
    pub announcement_window: chrono::Duration,
    pub bus_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("snapshots"),
            announcement_interval: Duration::from_secs(300),
            grade_interval: Duration::from_secs(300),
            inbox_interval: Duration::from_secs(300),
            announcement_window: recency::default_announcement_window(),
            bus_capacity: 1024,
        }
    }
}

impl WatchConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; malformed numbers are an
    /// error rather than a silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("snapshots")),
            announcement_interval: Duration::from_secs(env_u64("ANNOUNCEMENT_POLL_SECS", 300)?),
            grade_interval: Duration::from_secs(env_u64("GRADE_POLL_SECS", 300)?),
            inbox_interval: Duration::from_secs(env_u64("INBOX_POLL_SECS", 300)?),
            announcement_window: chrono::Duration::hours(
                env_u64("ANNOUNCEMENT_WINDOW_HOURS", 48)? as i64,
            ),
            bus_capacity: env_u64("EVENT_BUS_CAPACITY", 1024)? as usize,
        })
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Same poll period for all three watchers.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.announcement_interval = interval;
        self.grade_interval = interval;
        self.inbox_interval = interval;
        self
    }

    pub fn with_announcement_window(mut self, window: chrono::Duration) -> Self {
        self.announcement_window = window;
        self
    }
}

fn env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = WatchConfig::default();
        assert_eq!(config.snapshot_dir, PathBuf::from("snapshots"));
        assert_eq!(config.announcement_interval, Duration::from_secs(300));
        assert_eq!(config.announcement_window, chrono::Duration::hours(48));
        assert_eq!(config.bus_capacity, 1024);
    }

    #[test]
    fn builders_override_fields() {
        let config = WatchConfig::default()
            .with_snapshot_dir("/tmp/watch")
            .with_interval(Duration::from_secs(60))
            .with_announcement_window(chrono::Duration::hours(12));

        assert_eq!(config.snapshot_dir, PathBuf::from("/tmp/watch"));
        assert_eq!(config.grade_interval, Duration::from_secs(60));
        assert_eq!(config.announcement_window, chrono::Duration::hours(12));
    }

    #[test]
    fn malformed_number_is_rejected() {
        env::set_var("COURSEWATCH_TEST_BAD_NUMBER", "not-a-number");
        let result = env_u64("COURSEWATCH_TEST_BAD_NUMBER", 10);
        env::remove_var("COURSEWATCH_TEST_BAD_NUMBER");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber {
                var: "COURSEWATCH_TEST_BAD_NUMBER",
                ..
            })
        ));
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        env::remove_var("COURSEWATCH_TEST_UNSET");
        assert_eq!(env_u64("COURSEWATCH_TEST_UNSET", 42).unwrap(), 42);
    }
}
