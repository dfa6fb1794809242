#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Execution layer: the confidence safety valve, contract validation, and
//! dispatch through external collaborator bridges, plus the business cycle
//! that stitches router, engine, valve, and record-keeping together.

/// External collaborator bridges for price and copy updates.
#[path = "../bridges.rs"]
pub mod bridges;

/// End-to-end business cycle.
#[path = "../cycle.rs"]
pub mod cycle;

/// Execution records and safety statistics.
#[path = "../record.rs"]
pub mod record;

/// Telemetry sinks for the execution layer.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Confidence valve and contract checks.
#[path = "../valve.rs"]
pub mod valve;

pub use bridges::{BridgeCall, CopyTarget, CopyUpdater, DryRunBridge, Platform, PriceUpdater};
pub use cycle::{BusinessCycle, CycleOutcome, ExecutorError};
pub use record::{ExecutionRecord, SafetyStats};
pub use telemetry::{ExecutorTelemetry, ExecutorTelemetryBuilder};
pub use valve::{ValveVerdict, CONTENT_LIMIT, PRICE_CEILING};
