//! Ratings: concurrent submissions to a handful of venues.
//!
//! Eight writer threads submit ratings and incident reports to three venues
//! at once. Each venue's aggregate is then compared with the arithmetic mean
//! of everything that was submitted to it; a lost update would show up as a
//! short `rating_count` or a drifted mean.

use std::sync::Arc;

use stagesafe_contracts::{
    error::{TrustError, TrustResult},
    venue::{
        IncidentKind, IncidentReport, RatingScores, RatingSubmission, Severity, VenueAggregate,
        VenueId,
    },
};
use stagesafe_core::{clock::SystemClock, AggregationEngine};
use stagesafe_store::InMemoryAggregateStore;

use super::{ensure, section};

const WRITERS: usize = 8;
const RATINGS_PER_WRITER: usize = 150;
const VENUES: [&str; 3] = ["the-blue-door", "warehouse-9", "harbor-club"];

/// Deterministic scores so the expected means can be recomputed afterwards.
fn scores_for(writer: usize, n: usize) -> RatingScores {
    let pick = |salt: usize| ((writer * 7 + n * 3 + salt) % 5 + 1) as u8;
    RatingScores::new(pick(0), pick(2), pick(4))
}

fn venue_for(writer: usize, n: usize) -> VenueId {
    VenueId::new(VENUES[(writer + n) % VENUES.len()])
}

pub fn run_scenario() -> TrustResult<()> {
    section("Ratings: concurrent aggregation");

    let store = Arc::new(InMemoryAggregateStore::new());
    let engine = AggregationEngine::new(store.clone(), Arc::new(SystemClock));
    ensure(store.is_empty()?, "a fresh store holds no venues")?;

    std::thread::scope(|scope| -> TrustResult<()> {
        let handles: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let engine = &engine;
                scope.spawn(move || -> TrustResult<()> {
                    for n in 0..RATINGS_PER_WRITER {
                        let submission = RatingSubmission {
                            venue_id: venue_for(writer, n),
                            scores: scores_for(writer, n),
                            comment: None,
                        };
                        engine.apply_rating_submission(&submission)?;

                        if n % 25 == 0 {
                            let severity = Severity::ALL[(writer + n) % Severity::ALL.len()];
                            let kind = IncidentKind::ALL[writer % IncidentKind::ALL.len()];
                            engine.apply_incident_report(&IncidentReport {
                                venue_id: submission.venue_id.clone(),
                                kind,
                                severity,
                                description: format!("writer {writer} report {n}"),
                                occurred_on: chrono::Utc::now().date_naive(),
                            })?;
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.join().map_err(|_| TrustError::StateMachine {
                reason: "rating writer thread panicked".to_string(),
            })??;
        }
        Ok(())
    })?;

    for venue in VENUES {
        let venue_id = VenueId::new(venue);
        let aggregate = engine.read_aggregate(&venue_id)?;
        print_aggregate(&aggregate);
        check_against_submissions(&aggregate)?;
    }

    let unseen = engine.read_aggregate(&VenueId::new("never-rated"))?;
    ensure(
        !unseen.is_rated() && unseen.incident_count == 0,
        "unrated venue should read as the zero aggregate",
    )?;
    ensure(
        store.len()? == VENUES.len(),
        format!("expected {} stored venues, found {}", VENUES.len(), store.len()?),
    )?;
    println!(
        "  never-rated: no ratings, reported as zero aggregate; {} venues stored",
        store.len()?
    );
    println!();
    Ok(())
}

fn check_against_submissions(aggregate: &VenueAggregate) -> TrustResult<()> {
    let mut count = 0u64;
    let mut sums = [0f64; 3];
    for writer in 0..WRITERS {
        for n in 0..RATINGS_PER_WRITER {
            if venue_for(writer, n) != aggregate.venue_id {
                continue;
            }
            let s = scores_for(writer, n);
            sums[0] += f64::from(s.safety);
            sums[1] += f64::from(s.fair_pay);
            sums[2] += f64::from(s.respect);
            count += 1;
        }
    }

    ensure(
        aggregate.rating_count == count,
        format!(
            "{}: expected {} ratings, aggregate holds {}",
            aggregate.venue_id, count, aggregate.rating_count
        ),
    )?;

    let means = [aggregate.safety_mean, aggregate.fair_pay_mean, aggregate.respect_mean];
    for (mean, sum) in means.iter().zip(sums) {
        let expected = sum / count as f64;
        ensure(
            (mean - expected).abs() < 1e-9,
            format!("{}: mean {} drifted from {}", aggregate.venue_id, mean, expected),
        )?;
    }
    Ok(())
}

fn print_aggregate(aggregate: &VenueAggregate) {
    println!(
        "  {:<14} ratings={:<4} safety={:.3} fair_pay={:.3} respect={:.3} overall={:.3}",
        aggregate.venue_id.as_str(),
        aggregate.rating_count,
        aggregate.safety_mean,
        aggregate.fair_pay_mean,
        aggregate.respect_mean,
        aggregate.overall_mean(),
    );
    let kinds: Vec<String> = aggregate
        .incidents_by_kind
        .iter()
        .map(|(kind, n)| format!("{}={}", kind.as_str(), n))
        .collect();
    println!(
        "  {:<14} incidents={} severity_weight={} [{}]",
        "",
        aggregate.incident_count,
        aggregate.incident_severity_weight,
        kinds.join(", "),
    );
}
