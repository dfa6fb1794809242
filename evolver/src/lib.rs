#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Self-evolution layer: window performance evaluation, the composite
//! health score with its anti-gaming ladder, and LLM-driven strategy
//! mutation promoted atomically through the config store.

/// Mutation prompt assembly and strict payload parsing.
#[path = "../mutation.rs"]
pub mod mutation;

/// Window performance evaluation and the health ladder.
#[path = "../performance.rs"]
pub mod performance;

/// The evolution cycle.
#[path = "../runtime.rs"]
pub mod runtime;

/// Telemetry sinks for the evolution layer.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use mutation::MutationPayload;
pub use performance::{Alert, PerformanceReport, HEALTH_TARGET, WINDOW_DAYS};
pub use runtime::{EvolutionOutcome, Evolver, EvolverError};
pub use telemetry::{EvolverTelemetry, EvolverTelemetryBuilder};
