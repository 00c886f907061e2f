//! Venue aggregate and the ephemeral submissions that feed it.
//!
//! `RatingSubmission` and `IncidentReport` are never stored individually by
//! the core; only their effect on a `VenueAggregate` survives.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrustError;

/// Opaque identifier of a venue, owned by the surrounding directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(pub String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowest accepted score on every rating dimension.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted score on every rating dimension.
pub const MAX_SCORE: u8 = 5;

/// The three rating dimensions submitted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScores {
    pub safety: u8,
    pub fair_pay: u8,
    pub respect: u8,
}

impl RatingScores {
    pub fn new(safety: u8, fair_pay: u8, respect: u8) -> Self {
        Self {
            safety,
            fair_pay,
            respect,
        }
    }
}

/// A single anonymous rating as received from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub venue_id: VenueId,
    pub scores: RatingScores,
    /// Free text shown by the directory. The core never reads it.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Incident severity with its fixed weight.
///
/// Serialized and parsed as lowercase strings (`"low"`, `"critical"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Weight added to `incident_severity_weight`: {low:1, medium:2, high:3, critical:5}.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
            Severity::Critical => 5.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| TrustError::validation("severity", format!("unknown severity '{s}'")))
    }
}

/// Category of an incident report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Harassment,
    UnsafeConditions,
    Nonpayment,
    Discrimination,
    Other,
}

impl IncidentKind {
    pub const ALL: [IncidentKind; 5] = [
        IncidentKind::Harassment,
        IncidentKind::UnsafeConditions,
        IncidentKind::Nonpayment,
        IncidentKind::Discrimination,
        IncidentKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IncidentKind::Harassment => "harassment",
            IncidentKind::UnsafeConditions => "unsafe_conditions",
            IncidentKind::Nonpayment => "nonpayment",
            IncidentKind::Discrimination => "discrimination",
            IncidentKind::Other => "other",
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentKind {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                TrustError::validation("incident_kind", format!("unknown incident type '{s}'"))
            })
    }
}

/// A single incident report as received from the directory.
///
/// The description is kept by the directory; the core only counts and weighs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    pub venue_id: VenueId,
    pub kind: IncidentKind,
    pub severity: Severity,
    pub description: String,
    pub occurred_on: NaiveDate,
}

/// Running statistics for one venue.
///
/// Every mean is the arithmetic mean of exactly `rating_count` values in
/// `[1, 5]`; all three are zero while `rating_count == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueAggregate {
    pub venue_id: VenueId,
    pub safety_mean: f64,
    pub fair_pay_mean: f64,
    pub respect_mean: f64,
    pub rating_count: u64,
    pub incident_count: u64,
    pub incident_severity_weight: f64,
    /// Tally of typed incident reports. Severity-only submissions are not listed.
    #[serde(default)]
    pub incidents_by_kind: BTreeMap<IncidentKind, u64>,
    /// Time of the last applied update, `None` for the zero aggregate.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VenueAggregate {
    /// The aggregate an unseen venue reads as.
    pub fn empty(venue_id: VenueId) -> Self {
        Self {
            venue_id,
            safety_mean: 0.0,
            fair_pay_mean: 0.0,
            respect_mean: 0.0,
            rating_count: 0,
            incident_count: 0,
            incident_severity_weight: 0.0,
            incidents_by_kind: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.rating_count > 0
    }

    /// Mean of the three dimension means, or 0 for an unrated venue.
    pub fn overall_mean(&self) -> f64 {
        if !self.is_rated() {
            return 0.0;
        }
        (self.safety_mean + self.fair_pay_mean + self.respect_mean) / 3.0
    }
}
