#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Memory consolidation: a statistical digest of the event log is handed to
//! the language model, which returns a handful of durable business rules
//! appended to the knowledge base.

/// Statistical digest of the event log.
#[path = "../digest.rs"]
pub mod digest;

/// The consolidation run.
#[path = "../runtime.rs"]
pub mod runtime;

pub use digest::StatsDigest;
pub use runtime::{ConsolidationOutcome, Consolidator, ConsolidatorError, MIN_EVENTS};
