use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;
use tracing::instrument;
use vela_gateway::{LanguageGateway, FALLBACK_COMPLETION};
use vela_stores::{
    marketing::{self, DEFAULT_DAILY_AD_ESTIMATE},
    ConfigStore, DataRoot, EventLogStore, KnowledgeStore, MarketingStore, StoreError,
};

use crate::{
    arbitration::Arbitration,
    model::{Decision, LoopTrace},
    parser, perception, prompt,
    telemetry::DecisionTelemetry,
};

/// Errors crossing the decision-engine boundary.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// A persisted store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A telemetry sink failed.
    #[error("telemetry failure: {0}")]
    Telemetry(#[from] anyhow::Error),
}

/// The three-step decision engine: perceive, arbitrate, deliberate.
///
/// Stateless between calls; every cycle re-reads the stores so a config
/// promoted by the evolver takes effect on the next decision.
pub struct DecisionEngine {
    events: EventLogStore,
    marketing: MarketingStore,
    config: ConfigStore,
    knowledge: KnowledgeStore,
    gateway: Arc<dyn LanguageGateway>,
    telemetry: DecisionTelemetry,
}

impl DecisionEngine {
    /// Creates an engine over the standard data layout.
    #[must_use]
    pub fn new(root: &DataRoot, gateway: Arc<dyn LanguageGateway>, telemetry: DecisionTelemetry) -> Self {
        Self {
            events: EventLogStore::new(root.sales_history()),
            marketing: MarketingStore::new(root.marketing_spend()),
            config: ConfigStore::new(root.config(), root.evolution_backups()),
            knowledge: KnowledgeStore::new(root.knowledge_base()),
            gateway,
            telemetry,
        }
    }

    /// Runs one decision cycle.
    ///
    /// Returns `Ok(None)` only when the synthesiser output could not be
    /// parsed; every other path yields a decision, including the synthetic
    /// PASS when arbitration vetoes deliberation.
    #[instrument(skip(self), fields(trigger = trigger))]
    pub async fn decide(&self, trigger: &str) -> Result<Option<Decision>, DecisionError> {
        let document = self.config.load_or_init()?;
        let events = self.events.read_all()?;
        let now = Utc::now();
        let snapshot = perception::market_snapshot(&events, now);

        if !snapshot.data_available {
            let decision = Decision::hold(
                0.0,
                "No sales history yet; holding position.",
                snapshot,
                trigger,
            );
            self.telemetry.log(
                LogLevel::Info,
                "no data; holding",
                json!({"trigger": trigger}),
            )?;
            return Ok(Some(decision));
        }

        let ledger = self.marketing.load()?;
        let ad_spend = ledger.ad_spend(now, 1, DEFAULT_DAILY_AD_ESTIMATE);
        let roas = marketing::roas(snapshot.revenue_24h, ad_spend);
        let risk = document.strategy_parameters.risk_tolerance;
        let arbitration = Arbitration::weigh(&snapshot, roas, risk);
        self.telemetry.log(
            LogLevel::Info,
            "arbitration weighed",
            json!({
                "final_score": arbitration.final_score,
                "market_opportunity": arbitration.market_opportunity,
                "roas": arbitration.roas,
            }),
        )?;

        if !arbitration.approved() {
            let decision = Decision::pass("vetoed by triangle arbitration", snapshot, trigger);
            self.telemetry.event(
                "decision.vetoed",
                json!({"final_score": arbitration.final_score, "trigger": trigger}),
            )?;
            return Ok(Some(decision));
        }

        let knowledge = self.knowledge.tail(prompt::KNOWLEDGE_BUDGET)?;
        let params = &document.strategy_parameters;

        let proposal = self
            .complete(
                &prompt::proposer_system(&document.system_prompt_template, params, &knowledge),
                &prompt::proposer_user(trigger, &snapshot),
            )
            .await;
        let critique = self
            .complete(&prompt::critic_system(), &prompt::critic_user(&proposal))
            .await;
        let synthesis = self
            .complete(
                &prompt::synthesiser_system(),
                &prompt::synthesiser_user(&proposal, &critique),
            )
            .await;

        let Some(payload) = parser::parse_synthesis(&synthesis) else {
            self.telemetry.log(
                LogLevel::Warn,
                "synthesis unparseable; no decision",
                json!({"trigger": trigger, "raw_bytes": synthesis.len()}),
            )?;
            return Ok(None);
        };

        let decision = Decision {
            id: uuid::Uuid::new_v4(),
            kind: payload.kind,
            params: payload.parameters,
            confidence: payload.confidence,
            reasoning: payload.reasoning,
            risks_mitigated: payload.risks_mitigated,
            loop_trace: LoopTrace {
                proposal_bytes: proposal.len(),
                critique_bytes: critique.len(),
                steps_completed: 3,
            },
            snapshot,
            generated_at: now,
            trigger: trigger.to_owned(),
        };
        self.telemetry.event(
            "decision.synthesised",
            json!({
                "id": decision.id,
                "kind": decision.kind.as_str(),
                "confidence": decision.confidence,
            }),
        )?;
        Ok(Some(decision))
    }

    /// One gateway call with the unreachable-provider fallback applied.
    async fn complete(&self, system: &str, user: &str) -> String {
        match self.gateway.complete(system, user).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "gateway call failed; using fallback");
                FALLBACK_COMPLETION.to_owned()
            }
        }
    }
}
