//! Check-in: the session lifecycle on a scripted clock.
//!
//! Walk-through:
//!   1. 30-minute check-in, checked out at 20; a sweep at 40 leaves it alone
//!   2. 60-minute check-in, swept at 59 (still active) and 61 (overdue, one alert)
//!   3. A client check-out and two monitor escalations race on an expired session
//!   4. A check-out arriving after escalation gets the overdue record back
//!   5. Heartbeats stamp liveness but never move the deadline
//!   6. Alert ledger integrity verified at the end

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    session::{SessionId, SessionStatus, Transition},
};
use stagesafe_core::{clock::ManualClock, traits::Clock, ReconciliationGateway};
use stagesafe_config::StageSafeConfig;
use stagesafe_monitor::EscalationMonitor;
use stagesafe_store::{AlertLedger, InMemorySessionRegistry};

use super::{ensure, section};

pub fn run_scenario(config: &StageSafeConfig) -> TrustResult<()> {
    section("Check-in: reconciliation on a scripted clock");

    let start = Utc
        .with_ymd_and_hms(2025, 6, 21, 21, 0, 0)
        .single()
        .ok_or_else(|| TrustError::validation("clock", "invalid scripted start time"))?;
    let clock = Arc::new(ManualClock::new(start));
    let registry = Arc::new(InMemorySessionRegistry::new());
    let ledger = Arc::new(AlertLedger::new());
    let gateway = Arc::new(ReconciliationGateway::new(
        registry.clone(),
        ledger.clone(),
        clock.clone(),
        config.checkin,
    ));
    let monitor = EscalationMonitor::new(
        gateway.clone(),
        registry.clone(),
        clock.clone(),
        config.monitor.clone(),
    );

    // 1. Check-out before the deadline.
    let early = SessionId::new("walk-home-early");
    gateway.start(early.clone(), "Velvet Lounge", 30)?;
    clock.advance(Duration::minutes(20));
    let closed = gateway.check_out(&early)?;
    ensure(closed.applied(), "first check-out should apply")?;
    clock.advance(Duration::minutes(20));
    let report = monitor.sweep()?;
    ensure(report.due == 0, "checked-out session must not be due")?;
    println!(
        "  [1] {} checked out at +20m; sweep at +40m found {} due",
        early, report.due
    );

    // 2. Deadline passes with no check-out.
    let late = SessionId::new("late-set");
    let session = gateway.start(late.clone(), "Basement Stage", 60)?;
    clock.advance(Duration::minutes(59));
    monitor.sweep()?;
    ensure(
        gateway.read_session(&late)?.status == SessionStatus::Active,
        "session should still be active one minute before its deadline",
    )?;
    clock.advance(Duration::minutes(2));
    let first = monitor.sweep()?;
    let second = monitor.sweep()?;
    ensure(
        first.escalated == 1 && second.escalated == 0,
        "overdue session must be escalated exactly once",
    )?;
    println!(
        "  [2] {} due at {}; active at +59m, overdue at +61m, second sweep escalated {}",
        late, session.expected_end, second.escalated
    );

    // 3. Client and monitor race on the same expired session.
    let raced = SessionId::new("photo-shoot");
    gateway.start(raced.clone(), "Pier 4 Studio", 15)?;
    clock.advance(Duration::minutes(16));
    let alerts_before = ledger.len()?;
    let outcomes: Vec<TrustResult<Transition>> = std::thread::scope(|scope| {
        let handles = vec![
            scope.spawn(|| gateway.check_out(&raced)),
            scope.spawn(|| gateway.mark_overdue(&raced)),
            scope.spawn(|| gateway.mark_overdue(&raced)),
        ];
        handles
            .into_iter()
            .map(|h| {
                h.join().map_err(|_| TrustError::StateMachine {
                    reason: "race participant panicked".to_string(),
                })?
            })
            .collect()
    });
    let mut winners = 0;
    for outcome in outcomes {
        if outcome?.applied() {
            winners += 1;
        }
    }
    let final_status = gateway.read_session(&raced)?.status;
    let new_alerts = ledger.len()? - alerts_before;
    ensure(winners == 1, format!("expected one winner, saw {winners}"))?;
    ensure(
        (final_status == SessionStatus::Overdue) == (new_alerts == 1),
        "an alert exists exactly when the monitor won",
    )?;
    println!(
        "  [3] race on {}: final status {}, {} alert(s) raised",
        raced, final_status, new_alerts
    );

    // 4. Late check-out after escalation.
    let retried = gateway.check_out(&late)?;
    ensure(
        !retried.applied() && retried.session().status == SessionStatus::Overdue,
        "late check-out must leave the overdue record intact",
    )?;
    println!("  [4] late check-out on {} returned status {}", late, retried.session().status);

    // 5. Heartbeats.
    let pinged = SessionId::new("long-rehearsal");
    let opened = gateway.start(pinged.clone(), "Hall B", 120)?;
    clock.advance(Duration::minutes(45));
    let after = gateway.heartbeat(&pinged)?;
    ensure(
        after.expected_end == opened.expected_end && after.last_heartbeat == Some(clock.now()),
        "heartbeat must stamp liveness without moving the deadline",
    )?;
    println!(
        "  [5] heartbeat on {} at +45m; deadline still {}",
        pinged, after.expected_end
    );

    // 6. Ledger.
    ensure(ledger.verify_integrity(), "alert ledger failed verification")?;
    let log = ledger.export()?;
    println!(
        "  [6] ledger holds {} alert(s); terminal hash {}",
        log.entries.len(),
        log.terminal_hash
    );
    println!(
        "      sessions: active={} checked_out={} overdue={}",
        registry.count(SessionStatus::Active)?,
        registry.count(SessionStatus::CheckedOut)?,
        registry.count(SessionStatus::Overdue)?,
    );
    println!();
    Ok(())
}
