//! In-memory implementation of `SessionRegistry`.
//!
//! Same slot layout as the aggregate store: a `RwLock`ed map of per-session
//! mutexes. `transition` holds only the session's own mutex while it checks
//! the expected status and applies the transform, which is what makes the
//! status update a compare-and-swap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    session::{CheckInSession, SessionId, SessionStatus, Transition},
};
use stagesafe_core::traits::{SessionRegistry, SessionTransform};

type Slot = Arc<Mutex<CheckInSession>>;

/// Sessions are kept after reaching a terminal state; nothing here deletes.
#[derive(Default)]
pub struct InMemorySessionRegistry {
    slots: RwLock<HashMap<SessionId, Slot>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of sessions currently in `status`.
    pub fn count(&self, status: SessionStatus) -> TrustResult<usize> {
        let slots = self.slots.read().map_err(TrustError::storage)?;
        let mut count = 0;
        for slot in slots.values() {
            if slot.lock().map_err(TrustError::storage)?.status == status {
                count += 1;
            }
        }
        Ok(count)
    }

    fn slot(&self, session_id: &SessionId) -> TrustResult<Option<Slot>> {
        let slots = self.slots.read().map_err(TrustError::storage)?;
        Ok(slots.get(session_id).cloned())
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn insert(&self, session: CheckInSession) -> TrustResult<()> {
        let mut slots = self.slots.write().map_err(TrustError::storage)?;
        if slots.contains_key(&session.session_id) {
            return Err(TrustError::DuplicateSession {
                session_id: session.session_id.to_string(),
            });
        }
        slots.insert(session.session_id.clone(), Arc::new(Mutex::new(session)));
        Ok(())
    }

    fn get(&self, session_id: &SessionId) -> TrustResult<Option<CheckInSession>> {
        match self.slot(session_id)? {
            Some(slot) => Ok(Some(slot.lock().map_err(TrustError::storage)?.clone())),
            None => Ok(None),
        }
    }

    fn transition(
        &self,
        session_id: &SessionId,
        expected: SessionStatus,
        transform: SessionTransform<'_>,
    ) -> TrustResult<Transition> {
        let slot = self.slot(session_id)?.ok_or_else(|| TrustError::NotFound {
            resource: "session".to_string(),
            id: session_id.to_string(),
        })?;
        if expected.is_terminal() {
            return Err(TrustError::StateMachine {
                reason: format!(
                    "session '{}': terminal status {} cannot be updated",
                    session_id, expected
                ),
            });
        }
        let mut current = slot.lock().map_err(TrustError::storage)?;

        if current.status != expected {
            debug!(
                session_id = %session_id,
                expected = %expected,
                actual = %current.status,
                "conditional update skipped"
            );
            return Ok(Transition::AlreadyTerminal(current.clone()));
        }

        let next = transform(&current);
        if next.session_id != current.session_id || !current.status.can_become(next.status) {
            return Err(TrustError::StateMachine {
                reason: format!(
                    "session '{}' cannot move from {} to {}",
                    session_id, current.status, next.status
                ),
            });
        }

        *current = next.clone();
        Ok(Transition::Applied(next))
    }

    fn due_sessions(&self, now: DateTime<Utc>) -> TrustResult<Vec<SessionId>> {
        let slots = self.slots.read().map_err(TrustError::storage)?;
        let mut due = Vec::new();
        for (id, slot) in slots.iter() {
            if slot.lock().map_err(TrustError::storage)?.is_due(now) {
                due.push(id.clone());
            }
        }
        due.sort();
        Ok(due)
    }
}
