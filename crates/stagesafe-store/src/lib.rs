//! # stagesafe-store
//!
//! In-memory backends for the StageSafe trust core.
//!
//! - `InMemoryAggregateStore`: per-venue locked aggregates
//! - `InMemorySessionRegistry`: per-session locked records with CAS on status
//! - `AlertLedger`: append-only, SHA-256 hash-chained record of every overdue
//!   alert, so a missing or altered alert is detectable after the fact
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagesafe_store::{AlertLedger, InMemoryAggregateStore, InMemorySessionRegistry};
//!
//! let ledger = Arc::new(AlertLedger::new());
//! let gateway = ReconciliationGateway::new(
//!     Arc::new(InMemorySessionRegistry::new()),
//!     ledger.clone(),
//!     Arc::new(SystemClock),
//!     DurationLimits::default(),
//! );
//! assert!(ledger.verify_integrity());
//! ```

pub mod aggregates;
pub mod chain;
pub mod entry;
pub mod ledger;
pub mod registry;

pub use aggregates::InMemoryAggregateStore;
pub use chain::{hash_alert, verify_chain};
pub use entry::{AlertEntry, AlertLog};
pub use ledger::AlertLedger;
pub use registry::InMemorySessionRegistry;

// ── Tests ─────────────────────────────────────────────────────────────────────
