#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Decision layer: value-of-information routing, market perception,
//! triangle arbitration, and the propose-critique-synthesise engine.

/// Growth-versus-safety arbitration.
#[path = "../arbitration.rs"]
pub mod arbitration;

/// Three-step recursive decision engine.
#[path = "../engine.rs"]
pub mod engine;

/// Decision domain models.
#[path = "../model.rs"]
pub mod model;

/// Fence-tolerant JSON extraction for model output.
#[path = "../parser.rs"]
pub mod parser;

/// Market snapshot computation.
#[path = "../perception.rs"]
pub mod perception;

/// Prompt assembly and template substitution.
#[path = "../prompt.rs"]
pub mod prompt;

/// Fast-path versus slow-path arbitration.
#[path = "../router.rs"]
pub mod router;

/// Telemetry sinks for the decision layer.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use arbitration::Arbitration;
pub use engine::{DecisionEngine, DecisionError};
pub use model::{Decision, DecisionKind, DecisionParams, LoopTrace, MarketSnapshot, TrendDirection};
pub use router::{MetacognitiveRouter, RouteContext, RouteVerdict};
pub use telemetry::{DecisionTelemetry, DecisionTelemetryBuilder};
