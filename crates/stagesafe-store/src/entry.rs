//! Alert ledger entry and export types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagesafe_contracts::alert::OverdueAlert;

/// One emitted alert, linked to the previous entry by hash.
///
/// Changing any field, including those of the embedded alert, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntry {
    /// Position in the ledger, starting at 0.
    pub sequence: u64,
    pub alert: OverdueAlert,
    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,
    pub this_hash: String,
}

impl AlertEntry {
    /// The sentinel `prev_hash` of the first entry: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of the ledger for hand-off to an external audit store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLog {
    pub entries: Vec<AlertEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry; empty when nothing was emitted.
    pub terminal_hash: String,
}
