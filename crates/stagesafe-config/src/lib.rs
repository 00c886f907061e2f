//! # stagesafe-config
//!
//! TOML configuration for the StageSafe trust core.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use stagesafe_config::StageSafeConfig;
//!
//! let config = StageSafeConfig::from_file(Path::new("stagesafe.toml"))?;
//! let gateway = ReconciliationGateway::new(registry, alerts, clock, config.checkin);
//! ```

pub mod loader;
pub mod settings;

pub use settings::{LoggingConfig, MonitorConfig, StageSafeConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────
