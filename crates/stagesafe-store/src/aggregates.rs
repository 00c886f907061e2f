//! In-memory implementation of `AggregateStore`.
//!
//! Each venue owns a slot: an `Arc<Mutex<Option<VenueAggregate>>>`. The
//! slot map sits behind an `RwLock` that is held only long enough to find
//! or create a slot, never while a transform runs. Updates to one venue
//! therefore serialize on that venue's mutex alone, and updates to other
//! venues proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    venue::{VenueAggregate, VenueId},
};
use stagesafe_core::traits::{AggregateStore, AggregateTransform};

type Slot = Arc<Mutex<Option<VenueAggregate>>>;

#[derive(Default)]
pub struct InMemoryAggregateStore {
    slots: RwLock<HashMap<VenueId, Slot>>,
}

impl InMemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of venues with at least one applied update.
    pub fn len(&self) -> TrustResult<usize> {
        let slots = self.slots.read().map_err(TrustError::storage)?;
        let mut count = 0;
        for slot in slots.values() {
            if slot.lock().map_err(TrustError::storage)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> TrustResult<bool> {
        Ok(self.len()? == 0)
    }

    fn existing_slot(&self, venue_id: &VenueId) -> TrustResult<Option<Slot>> {
        let slots = self.slots.read().map_err(TrustError::storage)?;
        Ok(slots.get(venue_id).cloned())
    }

    fn slot(&self, venue_id: &VenueId) -> TrustResult<Slot> {
        if let Some(slot) = self.existing_slot(venue_id)? {
            return Ok(slot);
        }
        let mut slots = self.slots.write().map_err(TrustError::storage)?;
        Ok(slots.entry(venue_id.clone()).or_default().clone())
    }
}

impl AggregateStore for InMemoryAggregateStore {
    fn get(&self, venue_id: &VenueId) -> TrustResult<Option<VenueAggregate>> {
        match self.existing_slot(venue_id)? {
            Some(slot) => Ok(slot.lock().map_err(TrustError::storage)?.clone()),
            None => Ok(None),
        }
    }

    fn update(
        &self,
        venue_id: &VenueId,
        transform: AggregateTransform<'_>,
    ) -> TrustResult<VenueAggregate> {
        let slot = self.slot(venue_id)?;
        let mut guard = slot.lock().map_err(TrustError::storage)?;

        let next = match guard.as_ref() {
            Some(current) => transform(current),
            None => transform(&VenueAggregate::empty(venue_id.clone())),
        };
        *guard = Some(next.clone());
        Ok(next)
    }
}
