use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use thiserror::Error;
use tracing::instrument;
use vela_gateway::{LanguageGateway, FALLBACK_COMPLETION};
use vela_stores::{DataRoot, EventLogStore, KnowledgeStore, StoreError};

use crate::digest::{self, StatsDigest};

/// Events required before consolidation is worth a model call.
pub const MIN_EVENTS: usize = 10;

/// Errors crossing the consolidator boundary.
#[derive(Debug, Error)]
pub enum ConsolidatorError {
    /// A persisted store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Prompt serialisation failed.
    #[error("prompt assembly failed: {0}")]
    Prompt(#[from] serde_json::Error),
    /// The consolidation log could not be written.
    #[error("log failure: {0}")]
    Log(#[from] anyhow::Error),
}

/// How one consolidation run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    /// Too few events; nothing written.
    TooFewEvents {
        /// Events currently in the log.
        have: usize,
    },
    /// The model produced no usable insight; nothing written.
    NoInsight,
    /// One block was appended to the knowledge base.
    Written,
}

/// Distils the event log into durable business rules.
pub struct Consolidator {
    events: EventLogStore,
    knowledge: KnowledgeStore,
    gateway: Arc<dyn LanguageGateway>,
    logger: Option<JsonLogger>,
}

impl Consolidator {
    /// Creates a consolidator over the standard data layout.
    #[must_use]
    pub fn new(root: &DataRoot, gateway: Arc<dyn LanguageGateway>) -> Self {
        Self {
            events: EventLogStore::new(root.sales_history()),
            knowledge: KnowledgeStore::new(root.knowledge_base()),
            gateway,
            logger: None,
        }
    }

    /// Attaches a JSON log sink.
    #[must_use]
    pub fn with_logger(mut self, logger: JsonLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs one consolidation. With `force`, the event floor is waived.
    #[instrument(skip(self))]
    pub async fn consolidate(&self, force: bool) -> Result<ConsolidationOutcome, ConsolidatorError> {
        let all_events = self.events.read_all()?;
        if all_events.len() < MIN_EVENTS && !force {
            self.log(
                LogLevel::Info,
                "too few events to consolidate",
                json!({"have": all_events.len(), "need": MIN_EVENTS}),
            )?;
            return Ok(ConsolidationOutcome::TooFewEvents {
                have: all_events.len(),
            });
        }

        let digest = digest::digest(&all_events);
        let reply = match self
            .gateway
            .complete(&system_prompt(), &user_prompt(&digest)?)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "consolidation call failed");
                return Ok(ConsolidationOutcome::NoInsight);
            }
        };
        // An unreachable provider degrades to the synthesis fallback, which
        // is not wisdom worth keeping.
        if reply.trim().is_empty() || reply.trim() == FALLBACK_COMPLETION.trim() {
            self.log(LogLevel::Warn, "no usable insight returned", json!({}))?;
            return Ok(ConsolidationOutcome::NoInsight);
        }

        let block = format!(
            "\n---\n\n### Consolidated on {}\n\n{}\n",
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
            reply.trim()
        );
        self.knowledge.append_block(&block)?;
        self.log(
            LogLevel::Info,
            "knowledge consolidated",
            json!({"events": digest.total_events, "bytes": block.len()}),
        )?;
        Ok(ConsolidationOutcome::Written)
    }

    fn log(&self, level: LogLevel, message: &str, fields: serde_json::Value) -> anyhow::Result<()> {
        if let Some(logger) = &self.logger {
            logger.log(&LogRecord::new("consolidator", level, message).with_fields(fields))?;
        }
        Ok(())
    }
}

fn system_prompt() -> String {
    "You are a business analyst distilling raw sales statistics into durable \
     operating rules. Reply with 2 to 4 concise Markdown bullets. Each bullet \
     must state one actionable rule grounded in the numbers, not a restatement \
     of them."
        .to_owned()
}

fn user_prompt(digest: &StatsDigest) -> Result<String, serde_json::Error> {
    Ok(format!(
        "Sales statistics:\n{}\n\nEmit the bullets.",
        serde_json::to_string_pretty(digest)?
    ))
}
