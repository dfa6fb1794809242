#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Persisted stores shared by the decision, evolution, and consolidation
//! cycles: the append-only event log, the marketing ledger, the versioned
//! strategy config, the knowledge base, and JSON-lines audit trails.

/// Versioned strategy configuration with backup-then-replace promotion.
#[path = "../config.rs"]
pub mod config;

/// Append-only sales event log (CSV).
#[path = "../events.rs"]
pub mod events;

/// Knowledge base: append-only wisdom file with consumer-side truncation.
#[path = "../knowledge.rs"]
pub mod knowledge;

/// Data directory layout and store errors.
#[path = "../layout.rs"]
pub mod layout;

/// Marketing ledger: platform fees, ad spend, fixed costs.
#[path = "../marketing.rs"]
pub mod marketing;

/// Generic JSON-lines appender for audit trails.
#[path = "../trace.rs"]
pub mod trace;

pub use config::{
    ConfigDocument, ConfigMeta, ConfigStore, EvolutionEntry, EvolutionTrigger, RiskTolerance,
    StrategyMode, StrategyParameters,
};
pub use events::{EventKind, EventLogStore, SaleEvent};
pub use knowledge::KnowledgeStore;
pub use layout::{DataRoot, StoreError};
pub use marketing::{roas, AdSpendEntry, FeeRate, MarketingLedger, MarketingStore};
pub use trace::JsonlFile;
