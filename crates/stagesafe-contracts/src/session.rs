//! Safety check-in session types.
//!
//! A session is a timed promise: the user will check out before
//! `expected_end`. Status only ever moves forward, from `Active` to exactly
//! one of the two terminal states.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrustError, TrustResult};

/// Client-generated, globally unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh UUID v4 id, for clients that have no id scheme of their own.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    CheckedOut,
    Overdue,
}

impl SessionStatus {
    /// `CheckedOut` and `Overdue` are final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }

    /// Whether `self -> next` respects the forward-only lifecycle.
    ///
    /// `Active -> Active` is allowed so heartbeats can stamp an active record.
    pub fn can_become(self, next: SessionStatus) -> bool {
        match self {
            SessionStatus::Active => true,
            terminal => terminal == next,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Active => "active",
            SessionStatus::CheckedOut => "checked_out",
            SessionStatus::Overdue => "overdue",
        };
        f.write_str(label)
    }
}

/// The server-held record of one check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInSession {
    pub session_id: SessionId,
    /// Free text. No referential link to a venue aggregate.
    pub venue_label: String,
    pub start_time: DateTime<Utc>,
    pub expected_end: DateTime<Utc>,
    pub status: SessionStatus,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub overdue_at: Option<DateTime<Utc>>,
    /// Last advisory liveness ping from the client while active.
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl CheckInSession {
    /// Build a fresh `Active` session. Fails unless `expected_end > start_time`.
    pub fn open(
        session_id: SessionId,
        venue_label: impl Into<String>,
        start_time: DateTime<Utc>,
        expected_end: DateTime<Utc>,
    ) -> TrustResult<Self> {
        if expected_end <= start_time {
            return Err(TrustError::validation(
                "expected_end",
                "expected end must be after the start time",
            ));
        }
        Ok(Self {
            session_id,
            venue_label: venue_label.into(),
            start_time,
            expected_end,
            status: SessionStatus::Active,
            checked_out_at: None,
            overdue_at: None,
            last_heartbeat: None,
        })
    }

    /// True when the session is still active and its deadline has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && now >= self.expected_end
    }
}

/// Outcome of a conditional status update.
///
/// Losing a race is not an error: the loser receives the record the winner
/// left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The precondition held and the update was stored.
    Applied(CheckInSession),
    /// The session had already reached a terminal state; nothing changed.
    AlreadyTerminal(CheckInSession),
    /// The session is still active but its deadline has not passed; an
    /// escalation was refused and nothing changed.
    NotDue(CheckInSession),
}

impl Transition {
    pub fn applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn session(&self) -> &CheckInSession {
        match self {
            Transition::Applied(session)
            | Transition::AlreadyTerminal(session)
            | Transition::NotDue(session) => session,
        }
    }

    pub fn into_session(self) -> CheckInSession {
        match self {
            Transition::Applied(session)
            | Transition::AlreadyTerminal(session)
            | Transition::NotDue(session) => session,
        }
    }
}

/// Longest duration any configuration may allow: one week.
pub const MAX_DURATION_CEILING_MINUTES: i64 = 7 * 24 * 60;

/// Inclusive bounds on the duration a check-in may request, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationLimits {
    #[serde(default = "DurationLimits::default_min")]
    pub min_duration_minutes: i64,
    #[serde(default = "DurationLimits::default_max")]
    pub max_duration_minutes: i64,
}

impl DurationLimits {
    fn default_min() -> i64 {
        15
    }

    fn default_max() -> i64 {
        720
    }

    /// Reject non-positive durations as malformed and the rest as out of range.
    pub fn check(&self, minutes: i64) -> TrustResult<()> {
        if minutes <= 0 {
            return Err(TrustError::validation(
                "duration_minutes",
                format!("duration must be positive, got {minutes}"),
            ));
        }
        if minutes < self.min_duration_minutes || minutes > self.max_duration_minutes {
            return Err(TrustError::InvalidDuration {
                minutes,
                min: self.min_duration_minutes,
                max: self.max_duration_minutes,
            });
        }
        Ok(())
    }
}

impl Default for DurationLimits {
    fn default() -> Self {
        Self {
            min_duration_minutes: Self::default_min(),
            max_duration_minutes: Self::default_max(),
        }
    }
}
