//! The alert raised when a check-in is not closed in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{CheckInSession, SessionId};

/// Emitted exactly once per session, by the transition that marks it overdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueAlert {
    pub session_id: SessionId,
    pub venue_label: String,
    pub expected_end: DateTime<Utc>,
    /// When the monitor observed the deadline as passed.
    pub detected_at: DateTime<Utc>,
    /// Last time the client was heard from, if ever.
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl OverdueAlert {
    pub fn for_session(session: &CheckInSession, detected_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.session_id.clone(),
            venue_label: session.venue_label.clone(),
            expected_end: session.expected_end,
            detected_at,
            last_heartbeat: session.last_heartbeat,
        }
    }

    /// How far past the deadline detection happened, never negative.
    pub fn lateness(&self) -> chrono::Duration {
        (self.detected_at - self.expected_end).max(chrono::Duration::zero())
    }
}
