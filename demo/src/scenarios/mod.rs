//! Demo scenarios. Each exercises the real components against in-memory
//! stores and returns an error if an observed result is not the expected one.

pub mod checkin;
pub mod ratings;
pub mod watch;

use stagesafe_contracts::error::{TrustError, TrustResult};

/// Fail the scenario with `reason` unless `holds`.
pub(crate) fn ensure(holds: bool, reason: impl Into<String>) -> TrustResult<()> {
    if holds {
        Ok(())
    } else {
        Err(TrustError::StateMachine {
            reason: reason.into(),
        })
    }
}

pub(crate) fn section(title: &str) {
    println!("── {} {}", title, "─".repeat(70usize.saturating_sub(title.len())));
}
