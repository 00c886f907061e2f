//! The escalation monitor.
//!
//! One sweep reads the clock, asks the registry which active sessions are
//! past their deadline, and hands each to `ReconciliationGateway::mark_overdue`.
//! The due test compares absolute timestamps, so a skipped or failed sweep
//! only delays an alert until the next successful one; it never loses it.
//!
//! `run` drives sweeps from a tokio interval. Each sweep is awaited before
//! the next tick is taken, so sweeps never overlap.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use stagesafe_config::MonitorConfig;
use stagesafe_contracts::{error::TrustResult, session::Transition};
use stagesafe_core::{
    traits::{Clock, SessionRegistry},
    ReconciliationGateway,
};

use crate::report::SweepReport;

pub struct EscalationMonitor {
    gateway: Arc<ReconciliationGateway>,
    registry: Arc<dyn SessionRegistry>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
}

impl EscalationMonitor {
    /// `registry` is only read here; every write goes through `gateway`.
    pub fn new(
        gateway: Arc<ReconciliationGateway>,
        registry: Arc<dyn SessionRegistry>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            gateway,
            registry,
            clock,
            config,
        }
    }

    /// Run one full sweep.
    ///
    /// Per-session failures are counted in the report and do not stop the
    /// sweep. An error is returned only when the registry cannot be scanned
    /// at all; the caller retries on its next interval.
    pub fn sweep(&self) -> TrustResult<SweepReport> {
        let now = self.clock.now();
        let due = self.registry.due_sessions(now)?;
        let mut report = SweepReport::new(now, due.len());

        for session_id in &due {
            match self.gateway.mark_overdue(session_id) {
                Ok(Transition::Applied(_)) => report.escalated += 1,
                Ok(Transition::AlreadyTerminal(_)) => report.already_terminal += 1,
                Ok(Transition::NotDue(_)) => report.not_due += 1,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "failed to mark session overdue");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Sweep on every tick until `shutdown` becomes `true` or its sender is
    /// dropped. A sweep already in progress always finishes.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.sweep_interval_ms,
            "escalation monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let monitor = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || monitor.sweep()).await {
                Ok(Ok(report)) => log_report(&report),
                Ok(Err(e)) => warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "sweep failed, retrying next interval"
                ),
                Err(join_error) => error!(error = %join_error, "sweep task aborted"),
            }
        }

        info!("escalation monitor stopped");
    }

    /// Spawn `run` onto the current tokio runtime.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

fn log_report(report: &SweepReport) {
    if report.due == 0 {
        debug!(swept_at = %report.swept_at, "sweep found nothing due");
        return;
    }
    info!(
        swept_at = %report.swept_at,
        due = report.due,
        escalated = report.escalated,
        already_terminal = report.already_terminal,
        not_due = report.not_due,
        failed = report.failed,
        "sweep complete"
    );
}
