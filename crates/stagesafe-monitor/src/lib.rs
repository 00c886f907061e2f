//! # stagesafe-monitor
//!
//! The escalation monitor: the server-side authority on whether a check-in
//! is overdue.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagesafe_monitor::EscalationMonitor;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let monitor = Arc::new(EscalationMonitor::new(gateway, registry, clock, config.monitor));
//! let handle = monitor.spawn(shutdown_rx);
//!
//! // On process shutdown:
//! shutdown_tx.send(true).ok();
//! handle.await?;
//! ```

pub mod monitor;
pub mod report;

pub use monitor::EscalationMonitor;
pub use report::SweepReport;

// ── Tests ─────────────────────────────────────────────────────────────────────
