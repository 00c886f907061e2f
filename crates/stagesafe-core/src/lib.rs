//! # stagesafe-core
//!
//! The trust core of StageSafe.
//!
//! This crate provides:
//! - The storage and clock seams (`AggregateStore`, `SessionRegistry`, `AlertSink`, `Clock`)
//! - The `AggregationEngine`, which folds ratings and incidents into venue aggregates
//! - The `ReconciliationGateway`, the single writer of check-in session status
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagesafe_core::{AggregationEngine, ReconciliationGateway, clock::SystemClock};
//!
//! let engine = AggregationEngine::new(aggregate_store, Arc::new(SystemClock));
//! engine.apply_rating(&VenueId::new("v1"), 5, 4, 5)?;
//! ```

pub mod clock;
pub mod engine;
pub mod gateway;
pub mod traits;

pub use engine::AggregationEngine;
pub use gateway::ReconciliationGateway;
