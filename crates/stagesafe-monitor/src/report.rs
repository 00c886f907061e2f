//! Sweep outcome summary.

use chrono::{DateTime, Utc};

/// What one sweep found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub swept_at: DateTime<Utc>,
    /// Active sessions past their deadline when the sweep started.
    pub due: usize,
    /// Sessions this sweep moved to `Overdue`, one alert each.
    pub escalated: usize,
    /// Due sessions that reached a terminal state before this sweep could.
    pub already_terminal: usize,
    /// Sessions the gateway found not yet due (the clock moved backwards).
    pub not_due: usize,
    pub failed: usize,
}

impl SweepReport {
    pub(crate) fn new(swept_at: DateTime<Utc>, due: usize) -> Self {
        Self {
            swept_at,
            due,
            escalated: 0,
            already_terminal: 0,
            not_due: 0,
            failed: 0,
        }
    }
}
