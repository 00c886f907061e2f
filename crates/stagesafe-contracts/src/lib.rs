//! # stagesafe-contracts
//!
//! Shared types, schemas, and contracts for the StageSafe trust core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, input parsing and error types.

pub mod alert;
pub mod error;
pub mod session;
pub mod venue;

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use alert::OverdueAlert;
    use error::TrustError;
    use session::{CheckInSession, DurationLimits, SessionId, SessionStatus, Transition};
    use venue::{IncidentKind, Severity, VenueAggregate, VenueId};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap()
    }

    // ── Severity / IncidentKind ──────────────────────────────────────────────

    #[test]
    fn severity_weights_follow_fixed_table() {
        assert_eq!(Severity::Low.weight(), 1.0);
        assert_eq!(Severity::Medium.weight(), 2.0);
        assert_eq!(Severity::High.weight(), 3.0);
        assert_eq!(Severity::Critical.weight(), 5.0);
    }

    #[test]
    fn severity_parses_lowercase_and_rejects_unknown() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("low".parse::<Severity>().unwrap(), Severity::Low);

        match "catastrophic".parse::<Severity>() {
            Err(TrustError::Validation { field, reason }) => {
                assert_eq!(field, "severity");
                assert!(reason.contains("catastrophic"), "unexpected reason: {reason}");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn severity_serializes_as_lowercase_string() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let back: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, Severity::Medium);
    }

    #[test]
    fn incident_kind_round_trips_through_its_label() {
        for kind in IncidentKind::ALL {
            assert_eq!(kind.as_str().parse::<IncidentKind>().unwrap(), kind);
        }
        assert!("vibes".parse::<IncidentKind>().is_err());
    }

    // ── VenueAggregate ───────────────────────────────────────────────────────

    /// An unseen venue reads as all zeros and is not rated.
    #[test]
    fn empty_aggregate_is_all_zero() {
        let agg = VenueAggregate::empty(VenueId::new("v1"));
        assert!(!agg.is_rated());
        assert_eq!(agg.safety_mean, 0.0);
        assert_eq!(agg.fair_pay_mean, 0.0);
        assert_eq!(agg.respect_mean, 0.0);
        assert_eq!(agg.incident_count, 0);
        assert_eq!(agg.overall_mean(), 0.0);
        assert!(agg.updated_at.is_none());
    }

    #[test]
    fn overall_mean_averages_the_three_dimensions() {
        let mut agg = VenueAggregate::empty(VenueId::new("v1"));
        agg.rating_count = 2;
        agg.safety_mean = 4.0;
        agg.fair_pay_mean = 2.0;
        agg.respect_mean = 3.0;
        assert!((agg.overall_mean() - 3.0).abs() < 1e-12);
    }

    // ── CheckInSession ───────────────────────────────────────────────────────

    #[test]
    fn open_rejects_deadline_not_after_start() {
        let err = CheckInSession::open(SessionId::new("s1"), "Club", t0(), t0()).unwrap_err();
        assert!(matches!(err, TrustError::Validation { .. }));
    }

    #[test]
    fn open_session_is_active_and_due_only_at_deadline() {
        let end = t0() + Duration::minutes(30);
        let s = CheckInSession::open(SessionId::new("s1"), "Club", t0(), end).unwrap();

        assert_eq!(s.status, SessionStatus::Active);
        assert!(!s.is_due(end - Duration::seconds(1)));
        assert!(s.is_due(end));
        assert!(s.is_due(end + Duration::minutes(5)));
    }

    /// Terminal states can never move anywhere else.
    #[test]
    fn status_transitions_are_forward_only() {
        use SessionStatus::*;

        assert!(Active.can_become(Active));
        assert!(Active.can_become(CheckedOut));
        assert!(Active.can_become(Overdue));

        assert!(!CheckedOut.can_become(Active));
        assert!(!CheckedOut.can_become(Overdue));
        assert!(!Overdue.can_become(Active));
        assert!(!Overdue.can_become(CheckedOut));

        assert!(CheckedOut.is_terminal());
        assert!(Overdue.is_terminal());
        assert!(!Active.is_terminal());
    }

    #[test]
    fn transition_exposes_the_session_either_way() {
        let s = CheckInSession::open(
            SessionId::new("s1"),
            "Club",
            t0(),
            t0() + Duration::minutes(15),
        )
        .unwrap();

        let won = Transition::Applied(s.clone());
        let lost = Transition::AlreadyTerminal(s.clone());
        assert!(won.applied());
        assert!(!lost.applied());
        assert_eq!(won.session(), &s);
        assert_eq!(lost.into_session(), s);

        let refused = Transition::NotDue(s.clone());
        assert!(!refused.applied());
        assert_eq!(refused.session(), &s);
    }

    #[test]
    fn generated_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    // ── DurationLimits ───────────────────────────────────────────────────────

    #[test]
    fn duration_limits_default_to_quarter_hour_through_twelve_hours() {
        let limits = DurationLimits::default();
        assert!(limits.check(15).is_ok());
        assert!(limits.check(720).is_ok());

        assert!(matches!(
            limits.check(14),
            Err(TrustError::InvalidDuration { minutes: 14, min: 15, max: 720 })
        ));
        assert!(matches!(
            limits.check(721),
            Err(TrustError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn non_positive_duration_is_a_validation_error() {
        let limits = DurationLimits::default();
        assert!(matches!(limits.check(0), Err(TrustError::Validation { .. })));
        assert!(matches!(limits.check(-30), Err(TrustError::Validation { .. })));
    }

    // ── OverdueAlert / errors ────────────────────────────────────────────────

    #[test]
    fn alert_lateness_is_measured_from_the_deadline() {
        let end = t0() + Duration::minutes(60);
        let s = CheckInSession::open(SessionId::new("s1"), "Club", t0(), end).unwrap();

        let alert = OverdueAlert::for_session(&s, end + Duration::seconds(4));
        assert_eq!(alert.lateness(), Duration::seconds(4));
        assert_eq!(alert.venue_label, "Club");
    }

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(TrustError::storage("down").is_transient());
        assert!(!TrustError::validation("f", "bad").is_transient());
        assert!(!TrustError::DuplicateSession { session_id: "s".into() }.is_transient());
    }
}
