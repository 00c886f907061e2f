//! Loading and validating `StageSafeConfig`.

use std::path::Path;

use tracing::debug;

use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    session::MAX_DURATION_CEILING_MINUTES,
};

use crate::settings::StageSafeConfig;

impl StageSafeConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `TrustError::Config` if the TOML is malformed, does not match
    /// the schema, or fails `validate`.
    pub fn from_toml_str(s: &str) -> TrustResult<Self> {
        let config: StageSafeConfig = toml::from_str(s).map_err(|e| TrustError::Config {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Read the file at `path` and parse it with `from_toml_str`.
    pub fn from_file(path: &Path) -> TrustResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TrustError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject bounds and intervals the core cannot run with.
    pub fn validate(&self) -> TrustResult<()> {
        let limits = &self.checkin;
        if limits.min_duration_minutes <= 0 {
            return Err(TrustError::Config {
                reason: format!(
                    "checkin.min_duration_minutes must be positive, got {}",
                    limits.min_duration_minutes
                ),
            });
        }
        if limits.min_duration_minutes > limits.max_duration_minutes {
            return Err(TrustError::Config {
                reason: format!(
                    "checkin.min_duration_minutes ({}) exceeds max_duration_minutes ({})",
                    limits.min_duration_minutes, limits.max_duration_minutes
                ),
            });
        }
        if limits.max_duration_minutes > MAX_DURATION_CEILING_MINUTES {
            return Err(TrustError::Config {
                reason: format!(
                    "checkin.max_duration_minutes ({}) exceeds the ceiling of {} minutes",
                    limits.max_duration_minutes, MAX_DURATION_CEILING_MINUTES
                ),
            });
        }
        if self.monitor.sweep_interval_ms == 0 {
            return Err(TrustError::Config {
                reason: "monitor.sweep_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
