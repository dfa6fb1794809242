use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use chrono::Utc;
use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;
use tracing::instrument;
use vela_gateway::LanguageGateway;
use vela_stores::{
    ConfigStore, DataRoot, EventLogStore, EvolutionTrigger, MarketingStore, StoreError,
};

use crate::{
    mutation,
    performance::{self, PerformanceReport},
    telemetry::EvolverTelemetry,
};

/// Errors crossing the evolver boundary.
#[derive(Debug, Error)]
pub enum EvolverError {
    /// A persisted store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Prompt serialisation failed.
    #[error("prompt assembly failed: {0}")]
    Prompt(#[from] serde_json::Error),
    /// A telemetry sink failed.
    #[error("telemetry failure: {0}")]
    Telemetry(#[from] anyhow::Error),
}

/// How one evolution cycle ended.
#[derive(Debug)]
pub enum EvolutionOutcome {
    /// Health is fine; nothing changed.
    Healthy(PerformanceReport),
    /// Mutation was attempted but the model reply did not parse; no state
    /// changed.
    Aborted(PerformanceReport),
    /// A new strategy was promoted.
    Promoted {
        /// Report that triggered the mutation.
        report: PerformanceReport,
        /// Evolution counter after promotion.
        new_counter: u64,
    },
}

/// The recursive self-improvement core: evaluate, mutate, promote.
pub struct Evolver {
    events: EventLogStore,
    marketing: MarketingStore,
    config: ConfigStore,
    gateway: Arc<dyn LanguageGateway>,
    telemetry: EvolverTelemetry,
    consecutive_failures: AtomicU32,
}

impl Evolver {
    /// Creates an evolver over the standard data layout.
    #[must_use]
    pub fn new(
        root: &DataRoot,
        gateway: Arc<dyn LanguageGateway>,
        telemetry: EvolverTelemetry,
    ) -> Self {
        Self {
            events: EventLogStore::new(root.sales_history()),
            marketing: MarketingStore::new(root.marketing_spend()),
            config: ConfigStore::new(root.config(), root.evolution_backups()),
            gateway,
            telemetry,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Mutation attempts in a row that ended with an unparseable reply.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Runs one evolution cycle. With `force`, mutation is attempted even
    /// when the health score says the strategy is fine.
    #[instrument(skip(self))]
    pub async fn evolve(&self, force: bool) -> Result<EvolutionOutcome, EvolverError> {
        let document = self.config.load_or_init()?;
        let all_events = self.events.read_all()?;
        let ledger = self.marketing.load()?;
        let report = performance::evaluate(
            &all_events,
            &ledger,
            &document.strategy_parameters,
            &document.evolution_log,
            Utc::now(),
        );
        self.telemetry.log(
            LogLevel::Info,
            "performance evaluated",
            json!({
                "health_score": report.health_score,
                "net_profit": report.net_profit,
                "roas": report.roas,
                "alerts": report.alerts,
            }),
        )?;

        if !force && !report.should_evolve() {
            return Ok(EvolutionOutcome::Healthy(report));
        }

        let user = mutation::mutation_user(
            &report,
            &document.strategy_parameters,
            &document.evolution_log,
        )?;
        let reply = match self
            .gateway
            .complete(&mutation::mutation_system(), &user)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "mutation call failed");
                String::new()
            }
        };

        let Some(payload) = mutation::parse_mutation(&reply) else {
            let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
            self.telemetry.log(
                LogLevel::Warn,
                "mutation reply unparseable; aborting",
                json!({"consecutive_failures": failures}),
            )?;
            return Ok(EvolutionOutcome::Aborted(report));
        };
        self.consecutive_failures.store(0, Ordering::Relaxed);

        let (new_params, reasoning) = payload.into_parameters();
        let trigger = EvolutionTrigger {
            revenue: report.revenue,
            trend: format!("{:+.1}%", report.trend_pct),
            health_score: report.health_score,
        };
        let new_counter = self.config.promote(new_params, reasoning, trigger)?;
        self.telemetry.event(
            "strategy.promoted",
            json!({"new_counter": new_counter, "health_score": report.health_score}),
        )?;
        Ok(EvolutionOutcome::Promoted {
            report,
            new_counter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;
    use vela_gateway::{FallbackGateway, ScriptedGateway};
    use vela_stores::{
        AdSpendEntry, EventKind, MarketingLedger, SaleEvent, StrategyMode,
    };

    fn telemetry() -> EvolverTelemetry {
        EvolverTelemetry::builder("evolver").build().unwrap()
    }

    fn seeded_root(dir: &std::path::Path, sale_minor: i64, count: usize, ad: f64) -> DataRoot {
        let root = DataRoot::new(dir);
        std::fs::create_dir_all(root.root().join("data")).unwrap();
        let store = EventLogStore::new(root.sales_history());
        for i in 0..count {
            store
                .append(&SaleEvent {
                    timestamp: Utc::now() - Duration::days((i % 6) as i64)
                        - Duration::minutes(5),
                    platform: "gumroad".into(),
                    kind: EventKind::Sale,
                    order_id: format!("ord-{i}"),
                    product_name: "Guide".into(),
                    amount_minor: sale_minor,
                    currency: "USD".into(),
                    buyer: "b@example.com".into(),
                })
                .unwrap();
        }
        let mut ledger = MarketingLedger::default();
        ledger.daily_ad_spend.push(AdSpendEntry {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            spend: ad,
        });
        MarketingStore::new(root.marketing_spend())
            .save(&ledger)
            .unwrap();
        root
    }

    #[tokio::test]
    async fn critical_burn_promotes_a_new_config() {
        let dir = tempdir().unwrap();
        // $200 revenue against $300 ad spend.
        let root = seeded_root(dir.path(), 2000, 10, 300.0);
        let gateway = Arc::new(ScriptedGateway::new(vec![
            r#"{"mode": "profit_maximization", "tone": "lean", "risk_tolerance": "low", "price_step": 0.03, "reasoning": "stop the burn"}"#.to_owned(),
        ]));
        let evolver = Evolver::new(&root, gateway, telemetry());
        let outcome = evolver.evolve(false).await.unwrap();
        let EvolutionOutcome::Promoted { report, new_counter } = outcome else {
            panic!("expected a promotion");
        };
        assert!((report.health_score - -100.0).abs() < f64::EPSILON);
        assert_eq!(new_counter, 1);

        let config = ConfigStore::new(root.config(), root.evolution_backups());
        let doc = config.load().unwrap();
        assert_eq!(doc.meta.evolution_counter, 1);
        assert_eq!(doc.strategy_parameters.mode, StrategyMode::ProfitMaximization);
        assert_eq!(doc.evolution_log.len(), 1);
        let backups: Vec<_> = std::fs::read_dir(root.evolution_backups())
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[tokio::test]
    async fn healthy_strategy_is_left_alone() {
        let dir = tempdir().unwrap();
        // 50 sales at $40 against $400 ad spend.
        let root = seeded_root(dir.path(), 4000, 50, 400.0);
        let evolver = Evolver::new(&root, Arc::new(FallbackGateway), telemetry());
        let outcome = evolver.evolve(false).await.unwrap();
        assert!(matches!(outcome, EvolutionOutcome::Healthy(_)));
        let config = ConfigStore::new(root.config(), root.evolution_backups());
        assert_eq!(config.load().unwrap().meta.evolution_counter, 0);
    }

    #[tokio::test]
    async fn unparseable_mutation_aborts_without_state_change() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path(), 2000, 10, 300.0);
        // FallbackGateway returns a HOLD synthesis payload, which lacks the
        // four mutable fields.
        let evolver = Evolver::new(&root, Arc::new(FallbackGateway), telemetry());
        let outcome = evolver.evolve(false).await.unwrap();
        assert!(matches!(outcome, EvolutionOutcome::Aborted(_)));
        assert_eq!(evolver.consecutive_failures(), 1);
        let config = ConfigStore::new(root.config(), root.evolution_backups());
        assert_eq!(config.load().unwrap().meta.evolution_counter, 0);
        assert!(!root.evolution_backups().exists());
    }

    #[tokio::test]
    async fn force_mutates_a_healthy_strategy() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path(), 4000, 50, 400.0);
        let gateway = Arc::new(ScriptedGateway::new(vec![
            r#"{"mode": "volume_growth", "tone": "energetic", "risk_tolerance": "high", "price_step": 0.08, "reasoning": "operator-forced refresh"}"#.to_owned(),
        ]));
        let evolver = Evolver::new(&root, gateway, telemetry());
        let outcome = evolver.evolve(true).await.unwrap();
        assert!(matches!(outcome, EvolutionOutcome::Promoted { .. }));
    }
}
