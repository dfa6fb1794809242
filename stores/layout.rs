use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    /// Document failed to parse.
    #[error("store parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A required document is missing.
    #[error("missing store document: {0}")]
    Missing(PathBuf),
}

/// Resolves the persisted state layout under a configured root directory.
#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    /// Creates a layout rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Event log CSV.
    #[must_use]
    pub fn sales_history(&self) -> PathBuf {
        self.root.join("data").join("sales_history.csv")
    }

    /// Marketing ledger JSON (fees, ad spend, fixed costs).
    #[must_use]
    pub fn marketing_spend(&self) -> PathBuf {
        self.root.join("data").join("marketing_spend.json")
    }

    /// Knowledge base Markdown.
    #[must_use]
    pub fn knowledge_base(&self) -> PathBuf {
        self.root.join("data").join("knowledge_base.md")
    }

    /// Append-only decision trace.
    #[must_use]
    pub fn decision_log(&self) -> PathBuf {
        self.root.join("data").join("decision_log.jsonl")
    }

    /// Append-only action history.
    #[must_use]
    pub fn action_history(&self) -> PathBuf {
        self.root.join("data").join("action_history.jsonl")
    }

    /// Current strategy config document.
    #[must_use]
    pub fn config(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Rolling config backups written before every promotion.
    #[must_use]
    pub fn evolution_backups(&self) -> PathBuf {
        self.root.join("evolution_backups")
    }

    /// Core log file for structured telemetry.
    #[must_use]
    pub fn core_log(&self) -> PathBuf {
        self.root.join("logs").join("core.log.jsonl")
    }

    /// Durable bus event trail.
    #[must_use]
    pub fn event_trail(&self) -> PathBuf {
        self.root.join("logs").join("events.jsonl")
    }
}
