//! Hash-chain primitives for the alert ledger.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the alert (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use stagesafe_contracts::{
    alert::OverdueAlert,
    error::{TrustError, TrustResult},
};

use crate::entry::AlertEntry;

/// SHA-256 over one ledger entry's committed fields, as lowercase hex.
///
/// Fails only if the alert cannot be serialized, which a well-formed
/// `OverdueAlert` never does.
pub fn hash_alert(sequence: u64, alert: &OverdueAlert, prev_hash: &str) -> TrustResult<String> {
    let alert_json = serde_json::to_vec(alert).map_err(|e| TrustError::StorageUnavailable {
        reason: format!("alert could not be serialized: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&alert_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a chain of ledger entries.
///
/// Valid when every entry links to its predecessor (or `GENESIS_HASH`),
/// carries the next sequence number, and its `this_hash` matches the
/// recomputed value. An empty chain is valid.
pub fn verify_chain(entries: &[AlertEntry]) -> bool {
    let mut expected_prev = AlertEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }

        match hash_alert(entry.sequence, &entry.alert, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }

        expected_prev = entry.this_hash.clone();
    }

    true
}
