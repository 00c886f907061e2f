//! The aggregation engine: folds ratings and incidents into venue aggregates.
//!
//! Every update is expressed as a pure function of the previous aggregate
//! and handed to `AggregateStore::update`, which runs it under the venue's
//! lock. Nothing is ever rejected for contention; contention is serialized.
//!
//!   validate → store.update(venue, fold) → stored aggregate
//!
//! Means use the online form `m' = m + (x - m) / (n + 1)` so they stay
//! bounded by the submitted values instead of growing a running sum.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    venue::{
        IncidentKind, IncidentReport, RatingScores, RatingSubmission, Severity, VenueAggregate,
        VenueId, MAX_SCORE, MIN_SCORE,
    },
};

use crate::traits::{AggregateStore, Clock};

/// Applies ratings and incidents to the aggregate store.
///
/// Cheap to share: wrap in an `Arc` and call from any number of workers.
pub struct AggregationEngine {
    store: Arc<dyn AggregateStore>,
    clock: Arc<dyn Clock>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn AggregateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Fold one rating into the venue's three running means.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty venue id or any score outside `1..=5`; the
    /// store is not touched in that case. `StorageUnavailable` is passed
    /// through from the store.
    pub fn apply_rating(
        &self,
        venue_id: &VenueId,
        safety: u8,
        fair_pay: u8,
        respect: u8,
    ) -> TrustResult<VenueAggregate> {
        validate_venue_id(venue_id)?;
        validate_score("safety", safety)?;
        validate_score("fair_pay", fair_pay)?;
        validate_score("respect", respect)?;

        let scores = RatingScores::new(safety, fair_pay, respect);
        let at = self.clock.now();
        let updated = self
            .store
            .update(venue_id, &|current| fold_rating(current, scores, at))?;

        debug!(
            venue_id = %venue_id,
            rating_count = updated.rating_count,
            safety_mean = updated.safety_mean,
            fair_pay_mean = updated.fair_pay_mean,
            respect_mean = updated.respect_mean,
            "rating applied"
        );
        Ok(updated)
    }

    /// `apply_rating` for a whole submission. The comment is ignored.
    pub fn apply_rating_submission(
        &self,
        submission: &RatingSubmission,
    ) -> TrustResult<VenueAggregate> {
        let RatingScores {
            safety,
            fair_pay,
            respect,
        } = submission.scores;
        self.apply_rating(&submission.venue_id, safety, fair_pay, respect)
    }

    /// Count one incident and add its severity weight.
    pub fn apply_incident(
        &self,
        venue_id: &VenueId,
        severity: Severity,
    ) -> TrustResult<VenueAggregate> {
        self.record_incident(venue_id, severity, None)
    }

    /// Like `apply_incident`, and also tallies the report's incident type.
    pub fn apply_incident_report(&self, report: &IncidentReport) -> TrustResult<VenueAggregate> {
        self.record_incident(&report.venue_id, report.severity, Some(report.kind))
    }

    /// Current aggregate for `venue_id`, or the zero aggregate if never written.
    pub fn read_aggregate(&self, venue_id: &VenueId) -> TrustResult<VenueAggregate> {
        validate_venue_id(venue_id)?;
        Ok(self
            .store
            .get(venue_id)?
            .unwrap_or_else(|| VenueAggregate::empty(venue_id.clone())))
    }

    fn record_incident(
        &self,
        venue_id: &VenueId,
        severity: Severity,
        kind: Option<IncidentKind>,
    ) -> TrustResult<VenueAggregate> {
        validate_venue_id(venue_id)?;

        let at = self.clock.now();
        let updated = self
            .store
            .update(venue_id, &|current| fold_incident(current, severity, kind, at))?;

        debug!(
            venue_id = %venue_id,
            severity = %severity,
            incident_count = updated.incident_count,
            incident_severity_weight = updated.incident_severity_weight,
            "incident applied"
        );
        Ok(updated)
    }
}

/// The aggregate after one more rating. Pure.
pub fn fold_rating(
    current: &VenueAggregate,
    scores: RatingScores,
    at: DateTime<Utc>,
) -> VenueAggregate {
    let n = current.rating_count;
    VenueAggregate {
        safety_mean: online_mean(current.safety_mean, n, scores.safety),
        fair_pay_mean: online_mean(current.fair_pay_mean, n, scores.fair_pay),
        respect_mean: online_mean(current.respect_mean, n, scores.respect),
        rating_count: n + 1,
        updated_at: Some(at),
        ..current.clone()
    }
}

/// The aggregate after one more incident. Pure.
pub fn fold_incident(
    current: &VenueAggregate,
    severity: Severity,
    kind: Option<IncidentKind>,
    at: DateTime<Utc>,
) -> VenueAggregate {
    let mut next = current.clone();
    next.incident_count += 1;
    next.incident_severity_weight += severity.weight();
    if let Some(kind) = kind {
        *next.incidents_by_kind.entry(kind).or_insert(0) += 1;
    }
    next.updated_at = Some(at);
    next
}

/// `mean + (value - mean) / (count + 1)`, clamped to the score range.
///
/// The clamp only ever absorbs rounding error: mathematically the result
/// lies between the old mean and `value`.
fn online_mean(mean: f64, count: u64, value: u8) -> f64 {
    let value = f64::from(value);
    let next = mean + (value - mean) / (count as f64 + 1.0);
    next.clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE))
}

fn validate_score(field: &str, score: u8) -> TrustResult<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(TrustError::validation(
            field,
            format!("score {score} is outside {MIN_SCORE}..={MAX_SCORE}"),
        ));
    }
    Ok(())
}

fn validate_venue_id(venue_id: &VenueId) -> TrustResult<()> {
    if venue_id.as_str().trim().is_empty() {
        return Err(TrustError::validation("venue_id", "venue id must not be empty"));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
