//! Configuration loading from a TOML file with environment variable overrides.
//!
//! Looks for `sunhash.toml` in the working directory, or the file named by
//! `SUNHASH_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Decision cycle timing.
    pub scheduler: SchedulerConfig,
    /// Where the installation is.
    pub location: LocationConfig,
    /// Seed data loaded at startup.
    pub bootstrap: BootstrapConfig,
    /// Parameters of the simulated collaborators.
    pub simulation: SimulationConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between two runs over every enabled unit.
    pub interval_secs: u64,
    /// Bound on each collaborator call, in milliseconds.
    pub collaborator_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Local offset used by time-window rules.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// TOML file describing energy sources, miners, policies and units.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Production of a solar source without a nominal maximum, sun at the zenith.
    pub peak_production_watts: f64,
    /// Household load outside of the daily peaks.
    pub base_load_watts: f64,
    /// Battery state of charge when the daemon starts, in percent.
    pub initial_state_of_charge: f64,
    /// Status polls before a simulated miner confirms a start or stop.
    pub confirmation_polls: u32,
}

impl Config {
    /// Load configuration from `sunhash.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SUNHASH_CONFIG").unwrap_or_else(|_| "sunhash.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SUNHASH_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("SUNHASH_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("SUNHASH_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.scheduler.interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("SUNHASH_BOOTSTRAP") {
            self.bootstrap.path = Some(PathBuf::from(val));
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler.interval_secs must be non-zero".to_string(),
            ));
        }
        if self.scheduler.collaborator_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "scheduler.collaborator_timeout_ms must be non-zero".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            return Err(ConfigError::Validation(format!(
                "location.latitude {} is outside [-90, 90]",
                self.location.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            return Err(ConfigError::Validation(format!(
                "location.longitude {} is outside [-180, 180]",
                self.location.longitude
            )));
        }
        if self.location.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Validation(
                "location.utc_offset_minutes must be within a day".to_string(),
            ));
        }
        if self.simulation.peak_production_watts <= 0.0 {
            return Err(ConfigError::Validation(
                "simulation.peak_production_watts must be positive".to_string(),
            ));
        }
        if self.simulation.base_load_watts < 0.0 {
            return Err(ConfigError::Validation(
                "simulation.base_load_watts must not be negative".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.simulation.initial_state_of_charge) {
            return Err(ConfigError::Validation(
                "simulation.initial_state_of_charge must be within [0, 100]".to_string(),
            ));
        }
        Ok(())
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl LocationConfig {
    /// The configured offset, UTC when out of range.
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:sunhash.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,sqlx=warn".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            collaborator_timeout_ms: 5000,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 41.9028,
            longitude: 12.4964,
            utc_offset_minutes: 0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            peak_production_watts: 5000.0,
            base_load_watts: 400.0,
            initial_state_of_charge: 60.0,
            confirmation_polls: 1,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:sunhash.db?mode=rwc");
        assert_eq!(config.scheduler.interval(), Duration::from_secs(60));
        assert_eq!(config.scheduler.collaborator_timeout(), Duration::from_secs(5));
        assert!(config.bootstrap.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scheduler.interval_secs, 60);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [scheduler]
            interval_secs = 30
            collaborator_timeout_ms = 1500

            [location]
            latitude = 59.33
            longitude = 18.07
            utc_offset_minutes = 120

            [bootstrap]
            path = 'seed.toml'

            [simulation]
            peak_production_watts = 8000.0
            base_load_watts = 350.0
            initial_state_of_charge = 80.0
            confirmation_polls = 3
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.scheduler.interval(), Duration::from_secs(30));
        assert_eq!(config.scheduler.collaborator_timeout(), Duration::from_millis(1500));
        assert_eq!(
            config.location.utc_offset(),
            FixedOffset::east_opt(7200).unwrap()
        );
        assert_eq!(config.bootstrap.path, Some(PathBuf::from("seed.toml")));
        assert_eq!(config.simulation.confirmation_polls, 3);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [scheduler]
            interval_secs = 10
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.scheduler.interval_secs, 10);
        assert_eq!(config.scheduler.collaborator_timeout_ms, 5000);
        assert_eq!(config.database.url, "sqlite:sunhash.db?mode=rwc");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.scheduler.interval_secs, 60);
    }

    #[test]
    fn should_reject_zero_interval() {
        let mut config = Config::default();
        config.scheduler.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_out_of_range_latitude() {
        let mut config = Config::default();
        config.location.latitude = 95.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_offset_longer_than_a_day() {
        let mut config = Config::default();
        config.location.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_state_of_charge_above_full() {
        let mut config = Config::default();
        config.simulation.initial_state_of_charge = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
