//! Core trait definitions for the StageSafe trust core.
//!
//! These four traits are the seams to everything the core does not own:
//!
//! - `AggregateStore`: durable per-venue statistics, updated under a key lock
//! - `SessionRegistry`: durable check-in records, updated by compare-and-swap
//! - `AlertSink`: where overdue alerts go once emitted
//! - `Clock`: the wall clock, swappable for tests
//!
//! The engine and gateway are the only callers that mutate either store.

use chrono::{DateTime, Utc};

use stagesafe_contracts::{
    alert::OverdueAlert,
    error::TrustResult,
    session::{CheckInSession, SessionId, SessionStatus, Transition},
    venue::{VenueAggregate, VenueId},
};

/// A pure read-modify-write step over one venue's aggregate.
pub type AggregateTransform<'a> = &'a dyn Fn(&VenueAggregate) -> VenueAggregate;

/// A pure rewrite of one session record, applied only if its status matches.
pub type SessionTransform<'a> = &'a dyn Fn(&CheckInSession) -> CheckInSession;

/// Keyed storage of per-venue running statistics.
pub trait AggregateStore: Send + Sync {
    /// Snapshot read. Returns `None` for a venue that was never written.
    ///
    /// Not linearized against concurrent updates; suitable for display.
    fn get(&self, venue_id: &VenueId) -> TrustResult<Option<VenueAggregate>>;

    /// Apply `transform` to the venue's aggregate under that venue's lock.
    ///
    /// An unseen venue is presented to `transform` as
    /// `VenueAggregate::empty`. Concurrent updates to the same venue are
    /// serialized, each seeing the previous result; updates to different
    /// venues must not wait on each other. Returns the stored result.
    fn update(
        &self,
        venue_id: &VenueId,
        transform: AggregateTransform<'_>,
    ) -> TrustResult<VenueAggregate>;
}

/// Keyed storage of check-in sessions.
pub trait SessionRegistry: Send + Sync {
    /// Register a new session. Fails with `DuplicateSession` if the id exists.
    fn insert(&self, session: CheckInSession) -> TrustResult<()>;

    /// Snapshot read of one session.
    fn get(&self, session_id: &SessionId) -> TrustResult<Option<CheckInSession>>;

    /// Compare-and-swap on status.
    ///
    /// Applies `transform` only when the stored status equals `expected`;
    /// otherwise returns `Transition::AlreadyTerminal` with the record as it
    /// stands. Fails with `NotFound` for an unknown id, and with
    /// `StateMachine` if `expected` is terminal or `transform` would move the
    /// status backwards.
    fn transition(
        &self,
        session_id: &SessionId,
        expected: SessionStatus,
        transform: SessionTransform<'_>,
    ) -> TrustResult<Transition>;

    /// Ids of sessions that are `Active` with `now >= expected_end`.
    fn due_sessions(&self, now: DateTime<Utc>) -> TrustResult<Vec<SessionId>>;
}

/// Destination for overdue alerts.
///
/// Called at most once per session; implementations must not assume a retry.
pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: &OverdueAlert) -> TrustResult<()>;
}

/// Abstracts time so deadlines can be tested deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
