//! Watch: the background monitor on a live tokio runtime.
//!
//! Opens a batch of check-ins, checks out every third one, then jumps the
//! clock past the deadline while the monitor loop is running. The loop must
//! raise exactly one alert per remaining session and then stop cleanly when
//! the shutdown signal is sent.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::watch;

use stagesafe_config::{MonitorConfig, StageSafeConfig};
use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    session::{SessionId, SessionStatus},
};
use stagesafe_core::{clock::ManualClock, traits::Clock, ReconciliationGateway};
use stagesafe_monitor::EscalationMonitor;
use stagesafe_store::{AlertLedger, InMemorySessionRegistry};

use super::{ensure, section};

/// Upper bound for the demo's sweep interval so the run finishes quickly.
const MAX_DEMO_INTERVAL_MS: u64 = 50;

pub async fn run_scenario(
    config: &StageSafeConfig,
    sessions: usize,
    minutes: i64,
) -> TrustResult<()> {
    section("Watch: background escalation");

    if sessions == 0 {
        return Err(TrustError::validation("sessions", "at least one session is required"));
    }

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let registry = Arc::new(InMemorySessionRegistry::new());
    let ledger = Arc::new(AlertLedger::new());
    let gateway = Arc::new(ReconciliationGateway::new(
        registry.clone(),
        ledger.clone(),
        clock.clone(),
        config.checkin,
    ));
    let monitor_config = MonitorConfig {
        sweep_interval_ms: config.monitor.sweep_interval_ms.min(MAX_DEMO_INTERVAL_MS),
    };
    let monitor = Arc::new(EscalationMonitor::new(
        gateway.clone(),
        registry.clone(),
        clock.clone(),
        monitor_config.clone(),
    ));

    let mut ids = Vec::with_capacity(sessions);
    for n in 0..sessions {
        let id = SessionId::generate();
        gateway.start(id.clone(), &format!("Venue #{}", n + 1), minutes)?;
        ids.push(id);
    }
    for id in ids.iter().step_by(3) {
        gateway.check_out(id)?;
    }
    let expected = registry.count(SessionStatus::Active)?;
    println!(
        "  opened {} check-ins of {} min, {} checked out, {} left running",
        sessions,
        minutes,
        sessions - expected,
        expected
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = Arc::clone(&monitor).spawn(shutdown_rx);

    // Nothing is due yet; let a couple of sweeps run first.
    tokio::time::sleep(monitor_config.sweep_interval() * 2).await;
    ensure(ledger.is_empty()?, "no alert may fire before the deadline")?;

    clock.advance(Duration::minutes(minutes + 1));
    println!("  clock advanced to {} (past every deadline)", clock.now());

    let waited = tokio::time::timeout(StdDuration::from_secs(10), async {
        loop {
            match ledger.len() {
                Ok(n) if n >= expected => return Ok(()),
                Ok(_) => tokio::time::sleep(monitor_config.sweep_interval()).await,
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    shutdown_tx.send(true).map_err(|_| TrustError::StateMachine {
        reason: "monitor stopped before shutdown was requested".to_string(),
    })?;
    handle.await.map_err(|e| TrustError::StateMachine {
        reason: format!("monitor task failed: {}", e),
    })?;

    match waited {
        Ok(result) => result?,
        Err(_) => {
            return Err(TrustError::StateMachine {
                reason: format!("timed out waiting for {} alert(s)", expected),
            })
        }
    }

    // A few more sweeps would have run by now; none of them may re-alert.
    ensure(
        ledger.len()? == expected,
        format!("expected {} alerts, ledger holds {}", expected, ledger.len()?),
    )?;
    ensure(ledger.verify_integrity(), "alert ledger failed verification")?;

    for id in &ids {
        let session = gateway.read_session(id)?;
        if session.status == SessionStatus::Overdue {
            let alert = ledger.alerts_for(id)?;
            ensure(alert.len() == 1, format!("{} has {} alerts", id, alert.len()))?;
            println!(
                "  ALERT {} at {} (late by {}s)",
                session.venue_label,
                alert[0].detected_at.format("%H:%M:%S"),
                alert[0].lateness().num_seconds()
            );
        }
    }
    println!(
        "  monitor stopped; {} alert(s), ledger terminal hash {}",
        expected,
        ledger.export()?.terminal_hash
    );
    println!();
    Ok(())
}
