//! The reconciliation gateway: the only writer of check-in session status.
//!
//! The client keeps its own countdown, but that countdown is advisory. The
//! server record changes only through this gateway:
//!
//!   start      → insert a new `Active` session
//!   check_out  → CAS `Active → CheckedOut`            (client)
//!   heartbeat  → CAS `Active → Active`, stamp liveness (client)
//!   mark_overdue → CAS `Active → Overdue`, emit alert (monitor only)
//!
//! Because both terminal transitions are conditioned on the session still
//! being `Active`, a check-out racing a timeout resolves to exactly one
//! winner; the loser observes the winner's record and changes nothing.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};

use stagesafe_contracts::{
    alert::OverdueAlert,
    error::{TrustError, TrustResult},
    session::{CheckInSession, DurationLimits, SessionId, SessionStatus, Transition},
};

use crate::traits::{AlertSink, Clock, SessionRegistry};

pub struct ReconciliationGateway {
    registry: Arc<dyn SessionRegistry>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    limits: DurationLimits,
}

impl ReconciliationGateway {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
        limits: DurationLimits,
    ) -> Self {
        Self {
            registry,
            alerts,
            clock,
            limits,
        }
    }

    pub fn limits(&self) -> DurationLimits {
        self.limits
    }

    /// Open a check-in ending `duration_minutes` from now.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty id or label, or a non-positive duration
    /// - `InvalidDuration` when outside the configured bounds
    /// - `DuplicateSession` when `session_id` is already registered
    pub fn start(
        &self,
        session_id: SessionId,
        venue_label: &str,
        duration_minutes: i64,
    ) -> TrustResult<CheckInSession> {
        if session_id.as_str().trim().is_empty() {
            return Err(TrustError::validation("session_id", "session id must not be empty"));
        }
        if venue_label.trim().is_empty() {
            return Err(TrustError::validation("venue_label", "venue label must not be empty"));
        }
        self.limits.check(duration_minutes)?;

        let now = self.clock.now();
        let expected_end = Duration::try_minutes(duration_minutes)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                TrustError::validation(
                    "duration_minutes",
                    format!("{duration_minutes} minutes overflows the deadline"),
                )
            })?;
        let session = CheckInSession::open(session_id, venue_label, now, expected_end)?;
        self.registry.insert(session.clone())?;

        info!(
            session_id = %session.session_id,
            venue = %session.venue_label,
            expected_end = %session.expected_end,
            "check-in started"
        );
        Ok(session)
    }

    /// Close a check-in on the client's behalf.
    ///
    /// Idempotent: if the session is already `CheckedOut` or `Overdue` the
    /// existing record comes back as `Transition::AlreadyTerminal`, so a
    /// client retrying after a dropped response is harmless.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown session.
    pub fn check_out(&self, session_id: &SessionId) -> TrustResult<Transition> {
        let now = self.clock.now();
        let outcome = self
            .registry
            .transition(session_id, SessionStatus::Active, &|session| CheckInSession {
                status: SessionStatus::CheckedOut,
                checked_out_at: Some(now),
                ..session.clone()
            })?;

        match &outcome {
            Transition::Applied(_) => info!(session_id = %session_id, "checked out"),
            Transition::AlreadyTerminal(existing) | Transition::NotDue(existing) => debug!(
                session_id = %session_id,
                status = %existing.status,
                "check-out on terminal session ignored"
            ),
        }
        Ok(outcome)
    }

    /// Record a liveness ping from the client.
    ///
    /// Stamps `last_heartbeat` on an active session. Never moves the
    /// deadline; on a terminal session the record is returned unchanged.
    pub fn heartbeat(&self, session_id: &SessionId) -> TrustResult<CheckInSession> {
        let now = self.clock.now();
        let outcome = self
            .registry
            .transition(session_id, SessionStatus::Active, &|session| CheckInSession {
                last_heartbeat: Some(now),
                ..session.clone()
            })?;
        Ok(outcome.into_session())
    }

    /// Transition an active session to `Overdue` and emit its alert.
    ///
    /// Reserved for the escalation monitor. The alert is emitted only by the
    /// call whose conditional update wins, so repeated or overlapping calls
    /// produce at most one alert per session. A failing sink is logged and
    /// not retried; the session stays `Overdue`.
    ///
    /// The deadline is re-checked inside the conditional update: a session
    /// whose `expected_end` has not passed comes back as
    /// `Transition::NotDue` and no alert is raised.
    pub fn mark_overdue(&self, session_id: &SessionId) -> TrustResult<Transition> {
        let now = self.clock.now();
        let outcome = self
            .registry
            .transition(session_id, SessionStatus::Active, &|session| {
                if !session.is_due(now) {
                    return session.clone();
                }
                CheckInSession {
                    status: SessionStatus::Overdue,
                    overdue_at: Some(now),
                    ..session.clone()
                }
            })?;

        let outcome = match outcome {
            Transition::Applied(session) if session.status != SessionStatus::Overdue => {
                warn!(
                    session_id = %session.session_id,
                    expected_end = %session.expected_end,
                    "escalation before deadline refused"
                );
                return Ok(Transition::NotDue(session));
            }
            other => other,
        };

        if let Transition::Applied(session) = &outcome {
            let alert = OverdueAlert::for_session(session, now);
            warn!(
                session_id = %session.session_id,
                venue = %session.venue_label,
                expected_end = %session.expected_end,
                lateness_secs = alert.lateness().num_seconds(),
                "check-in overdue, raising alert"
            );
            if let Err(e) = self.alerts.emit(&alert) {
                error!(
                    session_id = %session.session_id,
                    error = %e,
                    "alert sink rejected overdue alert"
                );
            }
        }
        Ok(outcome)
    }

    /// Current record for `session_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown session.
    pub fn read_session(&self, session_id: &SessionId) -> TrustResult<CheckInSession> {
        self.registry
            .get(session_id)?
            .ok_or_else(|| TrustError::NotFound {
                resource: "session".to_string(),
                id: session_id.to_string(),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::traits::SessionTransform;

    // ── Mocks ─────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MockRegistry {
        sessions: Mutex<HashMap<SessionId, CheckInSession>>,
    }

    impl SessionRegistry for MockRegistry {
        fn insert(&self, session: CheckInSession) -> TrustResult<()> {
            let mut map = self.sessions.lock().unwrap();
            if map.contains_key(&session.session_id) {
                return Err(TrustError::DuplicateSession {
                    session_id: session.session_id.to_string(),
                });
            }
            map.insert(session.session_id.clone(), session);
            Ok(())
        }

        fn get(&self, session_id: &SessionId) -> TrustResult<Option<CheckInSession>> {
            Ok(self.sessions.lock().unwrap().get(session_id).cloned())
        }

        fn transition(
            &self,
            session_id: &SessionId,
            expected: SessionStatus,
            transform: SessionTransform<'_>,
        ) -> TrustResult<Transition> {
            let mut map = self.sessions.lock().unwrap();
            let current = map.get(session_id).cloned().ok_or_else(|| TrustError::NotFound {
                resource: "session".to_string(),
                id: session_id.to_string(),
            })?;
            if current.status != expected {
                return Ok(Transition::AlreadyTerminal(current));
            }
            let next = transform(&current);
            map.insert(session_id.clone(), next.clone());
            Ok(Transition::Applied(next))
        }

        fn due_sessions(&self, now: DateTime<Utc>) -> TrustResult<Vec<SessionId>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.is_due(now))
                .map(|s| s.session_id.clone())
                .collect())
        }
    }

    /// Registry whose backend is unreachable.
    struct DownRegistry;

    impl SessionRegistry for DownRegistry {
        fn insert(&self, _session: CheckInSession) -> TrustResult<()> {
            Err(TrustError::storage("registry offline"))
        }

        fn get(&self, _session_id: &SessionId) -> TrustResult<Option<CheckInSession>> {
            Err(TrustError::storage("registry offline"))
        }

        fn transition(
            &self,
            _session_id: &SessionId,
            _expected: SessionStatus,
            _transform: SessionTransform<'_>,
        ) -> TrustResult<Transition> {
            Err(TrustError::storage("registry offline"))
        }

        fn due_sessions(&self, _now: DateTime<Utc>) -> TrustResult<Vec<SessionId>> {
            Err(TrustError::storage("registry offline"))
        }
    }

    #[derive(Default)]
    struct MockSink {
        alerts: Mutex<Vec<OverdueAlert>>,
        fail: bool,
    }

    impl AlertSink for MockSink {
        fn emit(&self, alert: &OverdueAlert) -> TrustResult<()> {
            if self.fail {
                return Err(TrustError::storage("pager offline"));
            }
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 21, 0, 0).unwrap()
    }

    struct Fixture {
        gateway: ReconciliationGateway,
        clock: Arc<ManualClock>,
        sink: Arc<MockSink>,
    }

    fn fixture_with_sink(sink: MockSink) -> Fixture {
        let clock = Arc::new(ManualClock::new(t0()));
        let sink = Arc::new(sink);
        let gateway = ReconciliationGateway::new(
            Arc::new(MockRegistry::default()),
            sink.clone(),
            clock.clone(),
            DurationLimits::default(),
        );
        Fixture {
            gateway,
            clock,
            sink,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_sink(MockSink::default())
    }

    fn sid(s: &str) -> SessionId {
        SessionId::new(s)
    }

    // ── start ─────────────────────────────────────────────────────────────────

    #[test]
    fn start_sets_deadline_from_duration() {
        let f = fixture();
        let s = f.gateway.start(sid("s1"), "The Basement", 60).unwrap();

        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.start_time, t0());
        assert_eq!(s.expected_end, t0() + Duration::minutes(60));
        assert_eq!(f.gateway.read_session(&sid("s1")).unwrap(), s);
    }

    #[test]
    fn start_rejects_duplicate_id() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        match f.gateway.start(sid("s1"), "B", 30) {
            Err(TrustError::DuplicateSession { session_id }) => assert_eq!(session_id, "s1"),
            other => panic!("expected DuplicateSession, got {:?}", other),
        }
        // The stored record is untouched.
        assert_eq!(f.gateway.read_session(&sid("s1")).unwrap().venue_label, "A");
    }

    #[test]
    fn start_enforces_duration_bounds() {
        let f = fixture();
        assert!(matches!(
            f.gateway.start(sid("short"), "A", 5),
            Err(TrustError::InvalidDuration { minutes: 5, .. })
        ));
        assert!(matches!(
            f.gateway.start(sid("long"), "A", 721),
            Err(TrustError::InvalidDuration { .. })
        ));
        assert!(matches!(
            f.gateway.start(sid("zero"), "A", 0),
            Err(TrustError::Validation { .. })
        ));
        assert!(f.gateway.read_session(&sid("short")).is_err());
    }

    #[test]
    fn start_rejects_blank_id_and_label() {
        let f = fixture();
        assert!(matches!(
            f.gateway.start(sid(""), "A", 30),
            Err(TrustError::Validation { .. })
        ));
        assert!(matches!(
            f.gateway.start(sid("s1"), "   ", 30),
            Err(TrustError::Validation { .. })
        ));
    }

    /// Bounds wider than the calendar must fail validation, not overflow.
    #[test]
    fn start_rejects_deadline_past_the_calendar() {
        let clock = Arc::new(ManualClock::new(t0()));
        let gateway = ReconciliationGateway::new(
            Arc::new(MockRegistry::default()),
            Arc::new(MockSink::default()),
            clock,
            DurationLimits {
                min_duration_minutes: 1,
                max_duration_minutes: i64::MAX,
            },
        );

        for minutes in [200_000_000_000, i64::MAX] {
            match gateway.start(sid("s1"), "Club", minutes) {
                Err(TrustError::Validation { field, .. }) => assert_eq!(field, "duration_minutes"),
                other => panic!("expected Validation, got {:?}", other),
            }
        }
        assert!(matches!(
            gateway.read_session(&sid("s1")),
            Err(TrustError::NotFound { .. })
        ));
    }

    // ── check_out ─────────────────────────────────────────────────────────────

    #[test]
    fn check_out_closes_active_session() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.clock.advance(Duration::minutes(20));

        let outcome = f.gateway.check_out(&sid("s1")).unwrap();
        assert!(outcome.applied());
        let s = outcome.into_session();
        assert_eq!(s.status, SessionStatus::CheckedOut);
        assert_eq!(s.checked_out_at, Some(t0() + Duration::minutes(20)));
    }

    /// A retried check-out returns the same terminal record.
    #[test]
    fn check_out_is_idempotent() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        let first = f.gateway.check_out(&sid("s1")).unwrap().into_session();

        f.clock.advance(Duration::minutes(1));
        let second = f.gateway.check_out(&sid("s1")).unwrap();
        assert!(!second.applied());
        assert_eq!(second.into_session(), first);
    }

    #[test]
    fn check_out_unknown_session_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.gateway.check_out(&sid("ghost")),
            Err(TrustError::NotFound { .. })
        ));
        assert!(matches!(
            f.gateway.read_session(&sid("ghost")),
            Err(TrustError::NotFound { .. })
        ));
    }

    /// A check-out arriving after the monitor won keeps the Overdue record.
    #[test]
    fn late_check_out_returns_overdue_record() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.clock.advance(Duration::minutes(31));
        f.gateway.mark_overdue(&sid("s1")).unwrap();

        let outcome = f.gateway.check_out(&sid("s1")).unwrap();
        assert!(!outcome.applied());
        let s = outcome.into_session();
        assert_eq!(s.status, SessionStatus::Overdue);
        assert!(s.checked_out_at.is_none());
    }

    // ── mark_overdue ──────────────────────────────────────────────────────────

    #[test]
    fn mark_overdue_emits_exactly_one_alert() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.clock.advance(Duration::minutes(31));

        assert!(f.gateway.mark_overdue(&sid("s1")).unwrap().applied());
        assert!(!f.gateway.mark_overdue(&sid("s1")).unwrap().applied());

        let alerts = f.sink.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].session_id, sid("s1"));
        assert_eq!(alerts[0].lateness(), Duration::minutes(1));
    }

    /// Escalating one second before the deadline is refused.
    #[test]
    fn mark_overdue_before_deadline_changes_nothing() {
        let f = fixture();
        let started = f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.clock.set(started.expected_end - Duration::seconds(1));

        let outcome = f.gateway.mark_overdue(&sid("s1")).unwrap();
        assert!(!outcome.applied());
        assert!(matches!(outcome, Transition::NotDue(_)));

        let s = f.gateway.read_session(&sid("s1")).unwrap();
        assert_eq!(s.status, SessionStatus::Active);
        assert!(s.overdue_at.is_none());
        assert!(f.sink.alerts.lock().unwrap().is_empty());

        // Once the deadline arrives the same call escalates.
        f.clock.set(started.expected_end);
        assert!(f.gateway.mark_overdue(&sid("s1")).unwrap().applied());
        assert_eq!(f.sink.alerts.lock().unwrap().len(), 1);
    }

    #[test]
    fn mark_overdue_leaves_checked_out_session_alone() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.gateway.check_out(&sid("s1")).unwrap();
        f.clock.advance(Duration::hours(2));

        let outcome = f.gateway.mark_overdue(&sid("s1")).unwrap();
        assert!(!outcome.applied());
        assert_eq!(outcome.session().status, SessionStatus::CheckedOut);
        assert!(f.sink.alerts.lock().unwrap().is_empty());
    }

    /// A failing sink never rolls the session back to Active.
    #[test]
    fn sink_failure_still_marks_overdue() {
        let f = fixture_with_sink(MockSink {
            fail: true,
            ..MockSink::default()
        });
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.clock.advance(Duration::minutes(45));

        let outcome = f.gateway.mark_overdue(&sid("s1")).unwrap();
        assert!(outcome.applied());
        assert_eq!(
            f.gateway.read_session(&sid("s1")).unwrap().status,
            SessionStatus::Overdue
        );
    }

    // ── heartbeat ─────────────────────────────────────────────────────────────

    #[test]
    fn heartbeat_stamps_liveness_without_moving_deadline() {
        let f = fixture();
        let started = f.gateway.start(sid("s1"), "A", 30).unwrap();
        f.clock.advance(Duration::minutes(10));

        let s = f.gateway.heartbeat(&sid("s1")).unwrap();
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.last_heartbeat, Some(t0() + Duration::minutes(10)));
        assert_eq!(s.expected_end, started.expected_end);

        f.clock.advance(Duration::minutes(25));
        f.gateway.mark_overdue(&sid("s1")).unwrap();
        let alerts = f.sink.alerts.lock().unwrap();
        assert_eq!(alerts[0].last_heartbeat, Some(t0() + Duration::minutes(10)));
    }

    #[test]
    fn heartbeat_on_terminal_session_changes_nothing() {
        let f = fixture();
        f.gateway.start(sid("s1"), "A", 30).unwrap();
        let closed = f.gateway.check_out(&sid("s1")).unwrap().into_session();

        f.clock.advance(Duration::minutes(5));
        assert_eq!(f.gateway.heartbeat(&sid("s1")).unwrap(), closed);
    }

    // ── storage failures ──────────────────────────────────────────────────────

    fn down_gateway() -> ReconciliationGateway {
        ReconciliationGateway::new(
            Arc::new(DownRegistry),
            Arc::new(MockSink::default()),
            Arc::new(ManualClock::new(t0())),
            DurationLimits::default(),
        )
    }

    /// Client-facing calls surface an unreachable registry as a transient error.
    #[test]
    fn storage_failure_is_surfaced_to_callers() {
        let gateway = down_gateway();

        let errors = [
            gateway.start(sid("s1"), "A", 30).unwrap_err(),
            gateway.check_out(&sid("s1")).unwrap_err(),
            gateway.heartbeat(&sid("s1")).unwrap_err(),
            gateway.read_session(&sid("s1")).unwrap_err(),
        ];
        for e in errors {
            assert!(matches!(e, TrustError::StorageUnavailable { .. }), "got {:?}", e);
            assert!(e.is_transient());
        }
    }
}
