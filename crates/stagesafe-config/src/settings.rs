//! Configuration schema.
//!
//! Every section and every field is optional; an empty document yields the
//! defaults.
//!
//! Example:
//! ```toml
//! [checkin]
//! min_duration_minutes = 15
//! max_duration_minutes = 720
//!
//! [monitor]
//! sweep_interval_ms = 5000
//!
//! [logging]
//! filter = "info,stagesafe_monitor=debug"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use stagesafe_contracts::session::DurationLimits;

/// Escalation monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between the start of consecutive sweeps. Also the worst-case
    /// lateness of an overdue alert.
    #[serde(default = "MonitorConfig::default_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl MonitorConfig {
    fn default_interval_ms() -> u64 {
        5_000
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: Self::default_interval_ms(),
        }
    }
}

/// Log filter used when `RUST_LOG` is not set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_filter")]
    pub filter: String,
}

impl LoggingConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

/// The top-level structure deserialized from a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSafeConfig {
    #[serde(default)]
    pub checkin: DurationLimits,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
