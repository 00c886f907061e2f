//! In-memory, hash-chained `AlertSink`.
//!
//! `AlertLedger` keeps every emitted `OverdueAlert` in append order behind a
//! `Mutex`. Use `export()` to hand the chain to an external audit store and
//! `verify_integrity()` to confirm nothing was altered in memory.

use std::sync::Mutex;

use chrono::Utc;
use tracing::info;

use stagesafe_contracts::{
    alert::OverdueAlert,
    error::{TrustError, TrustResult},
    session::SessionId,
};
use stagesafe_core::traits::AlertSink;

use crate::{
    chain::{hash_alert, verify_chain},
    entry::{AlertEntry, AlertLog},
};

pub(crate) struct LedgerState {
    pub(crate) entries: Vec<AlertEntry>,
    pub(crate) last_hash: String,
}

pub struct AlertLedger {
    pub(crate) state: Mutex<LedgerState>,
}

impl AlertLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                entries: Vec::new(),
                last_hash: AlertEntry::GENESIS_HASH.to_string(),
            }),
        }
    }

    /// Number of alerts emitted so far.
    pub fn len(&self) -> TrustResult<usize> {
        Ok(self.state.lock().map_err(TrustError::storage)?.entries.len())
    }

    pub fn is_empty(&self) -> TrustResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Alerts raised for `session_id`. At most one for a healthy core.
    pub fn alerts_for(&self, session_id: &SessionId) -> TrustResult<Vec<OverdueAlert>> {
        let state = self.state.lock().map_err(TrustError::storage)?;
        Ok(state
            .entries
            .iter()
            .filter(|e| &e.alert.session_id == session_id)
            .map(|e| e.alert.clone())
            .collect())
    }

    pub fn export(&self) -> TrustResult<AlertLog> {
        let state = self.state.lock().map_err(TrustError::storage)?;
        let terminal_hash = state
            .entries
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        Ok(AlertLog {
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            terminal_hash,
        })
    }

    /// True when the in-memory chain still verifies.
    pub fn verify_integrity(&self) -> bool {
        match self.state.lock() {
            Ok(state) => verify_chain(&state.entries),
            Err(_) => false,
        }
    }
}

impl Default for AlertLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for AlertLedger {
    fn emit(&self, alert: &OverdueAlert) -> TrustResult<()> {
        let mut state = self.state.lock().map_err(TrustError::storage)?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_alert(sequence, alert, &prev_hash)?;

        state.entries.push(AlertEntry {
            sequence,
            alert: alert.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;

        info!(
            session_id = %alert.session_id,
            sequence,
            "overdue alert recorded"
        );
        Ok(())
    }
}
