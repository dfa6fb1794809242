use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;
use tracing::instrument;
use vela_decision::{
    engine::DecisionError, perception, Decision, DecisionEngine, DecisionKind, MetacognitiveRouter,
    RouteContext, RouteVerdict,
};
use vela_stores::{
    events, ConfigStore, DataRoot, EventLogStore, JsonlFile, StoreError, StrategyParameters,
};

use crate::{
    bridges::{CopyTarget, CopyUpdater, Platform, PriceUpdater},
    record::ExecutionRecord,
    telemetry::ExecutorTelemetry,
    valve::{self, ValveVerdict},
};

/// Orders needed before the router trusts the data completely.
const FULL_QUALITY_ORDERS: usize = 50;

/// Errors crossing the execution boundary.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A persisted store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The decision engine failed.
    #[error(transparent)]
    Decision(#[from] DecisionError),
    /// A telemetry sink failed.
    #[error("telemetry failure: {0}")]
    Telemetry(#[from] anyhow::Error),
}

/// How one business cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The router judged deliberation not worth its cost.
    Skipped,
    /// The engine deliberated but the synthesis was unparseable.
    NoDecision,
    /// A decision was gated and recorded.
    Settled(ExecutionRecord),
}

/// One full business cycle: route, decide, gate, dispatch, record.
pub struct BusinessCycle {
    engine: DecisionEngine,
    router: MetacognitiveRouter,
    events: EventLogStore,
    config: ConfigStore,
    decision_trace: JsonlFile,
    action_history: JsonlFile,
    prices: Arc<dyn PriceUpdater>,
    copy: Arc<dyn CopyUpdater>,
    telemetry: ExecutorTelemetry,
}

impl BusinessCycle {
    /// Creates a cycle over the standard data layout.
    #[must_use]
    pub fn new(
        root: &DataRoot,
        engine: DecisionEngine,
        prices: Arc<dyn PriceUpdater>,
        copy: Arc<dyn CopyUpdater>,
        telemetry: ExecutorTelemetry,
    ) -> Self {
        Self {
            engine,
            router: MetacognitiveRouter::default(),
            events: EventLogStore::new(root.sales_history()),
            config: ConfigStore::new(root.config(), root.evolution_backups()),
            decision_trace: JsonlFile::new(root.decision_log()),
            action_history: JsonlFile::new(root.action_history()),
            prices,
            copy,
            telemetry,
        }
    }

    /// Replaces the default router, mainly for tests.
    #[must_use]
    pub fn with_router(mut self, router: MetacognitiveRouter) -> Self {
        self.router = router;
        self
    }

    /// Runs one cycle end to end.
    #[instrument(skip(self), fields(trigger = trigger))]
    pub async fn run(&self, trigger: &str) -> Result<CycleOutcome, ExecutorError> {
        let all_events = self.events.read_all()?;
        let now = Utc::now();
        let snapshot = perception::market_snapshot(&all_events, now);
        let window = events::between(&all_events, now - chrono::Duration::hours(24), now);
        #[allow(clippy::cast_precision_loss)]
        let context = RouteContext {
            potential_revenue: events::revenue_minor(&window) as f64 / 100.0,
            data_quality: (snapshot.total_orders as f64 / FULL_QUALITY_ORDERS as f64).min(1.0),
        };

        let decision = match self.router.route(context) {
            RouteVerdict::Skip => {
                self.telemetry.log(
                    LogLevel::Info,
                    "cycle skipped by router",
                    json!({"trigger": trigger}),
                )?;
                return Ok(CycleOutcome::Skipped);
            }
            RouteVerdict::FastExecute { confidence } => Decision::hold(
                confidence,
                "Fast path: stakes too low to deliberate; holding position.",
                snapshot,
                trigger,
            ),
            RouteVerdict::Deliberate => match self.engine.decide(trigger).await? {
                Some(decision) => decision,
                None => return Ok(CycleOutcome::NoDecision),
            },
        };

        self.decision_trace.append(&decision)?;
        let params = self.config.load_or_init()?.strategy_parameters;
        let record = self.settle(&decision, &params).await?;
        self.action_history.append(&record)?;
        self.telemetry.event(
            "action.recorded",
            json!({
                "decision_id": record.decision_id,
                "action": record.action,
                "executed": record.executed,
                "blocked_by_safety": record.blocked_by_safety,
            }),
        )?;
        Ok(CycleOutcome::Settled(record))
    }

    /// Gates and, when allowed, dispatches a decision.
    async fn settle(
        &self,
        decision: &Decision,
        params: &StrategyParameters,
    ) -> Result<ExecutionRecord, ExecutorError> {
        if matches!(decision.kind, DecisionKind::Pass | DecisionKind::Hold) {
            return Ok(ExecutionRecord::inaction(decision));
        }

        if let ValveVerdict::Blocked { reason } =
            valve::gate(decision.confidence, params.risk_tolerance)
        {
            self.telemetry.log(
                LogLevel::Warn,
                "valve blocked action",
                json!({"decision_id": decision.id, "reason": reason}),
            )?;
            return Ok(ExecutionRecord::blocked(decision, reason));
        }

        let record = match decision.kind {
            DecisionKind::UpdatePrice => self.dispatch_price(decision, params).await,
            DecisionKind::ModifyCopy => self.dispatch_copy(decision).await,
            DecisionKind::Pass | DecisionKind::Hold => ExecutionRecord::inaction(decision),
        };
        Ok(record)
    }

    async fn dispatch_price(
        &self,
        decision: &Decision,
        params: &StrategyParameters,
    ) -> ExecutionRecord {
        let (platform, product_id) = match required_target(decision) {
            Ok(pair) => pair,
            Err(reason) => return ExecutionRecord::failed(decision, reason),
        };
        let Some(new_price) = decision.params.new_price else {
            return ExecutionRecord::failed(decision, "missing parameter: new_price");
        };
        let last_known = match self.prices.current_price(platform, product_id).await {
            Ok(price) => price,
            Err(err) => {
                tracing::warn!(error = %err, "current-price lookup failed");
                None
            }
        };
        if let Err(violation) = valve::validate_price(new_price, last_known, params.price_step) {
            return ExecutionRecord::failed(decision, violation.to_string());
        }
        match self.prices.update_price(platform, product_id, new_price).await {
            Ok(()) => ExecutionRecord::executed(decision),
            Err(err) => ExecutionRecord::failed(decision, format!("price update failed: {err}")),
        }
    }

    async fn dispatch_copy(&self, decision: &Decision) -> ExecutionRecord {
        let (platform, product_id) = match required_target(decision) {
            Ok(pair) => pair,
            Err(reason) => return ExecutionRecord::failed(decision, reason),
        };
        let target = match decision.params.target.as_deref() {
            Some(raw) => match raw.parse::<CopyTarget>() {
                Ok(target) => target,
                Err(err) => return ExecutionRecord::failed(decision, err.to_string()),
            },
            None => return ExecutionRecord::failed(decision, "missing parameter: target"),
        };
        let Some(content) = decision.params.content.as_deref() else {
            return ExecutionRecord::failed(decision, "missing parameter: content");
        };
        if let Err(violation) = valve::validate_copy(content) {
            return ExecutionRecord::failed(decision, violation.to_string());
        }
        match self
            .copy
            .update_copy(platform, product_id, target, content)
            .await
        {
            Ok(()) => ExecutionRecord::executed(decision),
            Err(err) => ExecutionRecord::failed(decision, format!("copy update failed: {err}")),
        }
    }
}

/// Pulls the platform and product id a side effect needs.
fn required_target(decision: &Decision) -> Result<(Platform, &str), String> {
    let platform = match decision.params.platform.as_deref() {
        Some(raw) => raw
            .parse::<Platform>()
            .map_err(|err| err.to_string())?,
        None => return Err("missing parameter: platform".to_owned()),
    };
    let product_id = decision
        .params
        .product_id
        .as_deref()
        .ok_or_else(|| "missing parameter: product_id".to_owned())?;
    Ok((platform, product_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;
    use vela_decision::DecisionTelemetry;
    use vela_gateway::{LanguageGateway, ScriptedGateway};
    use vela_stores::{
        AdSpendEntry, EventKind, MarketingLedger, MarketingStore, SaleEvent,
    };

    use crate::bridges::{BridgeCall, DryRunBridge};
    use crate::record::SafetyStats;

    fn seeded_root(dir: &std::path::Path) -> DataRoot {
        let root = DataRoot::new(dir);
        std::fs::create_dir_all(root.root().join("data")).unwrap();
        let store = EventLogStore::new(root.sales_history());
        // Strong 24h economics so arbitration approves deliberation.
        for i in 0..10 {
            store
                .append(&SaleEvent {
                    timestamp: Utc::now() - Duration::hours(i % 12),
                    platform: "gumroad".into(),
                    kind: EventKind::Sale,
                    order_id: format!("ord-{i}"),
                    product_name: "Guide".into(),
                    amount_minor: 5000,
                    currency: "USD".into(),
                    buyer: "b@example.com".into(),
                })
                .unwrap();
        }
        let mut ledger = MarketingLedger::default();
        ledger.daily_ad_spend.push(AdSpendEntry {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            spend: 100.0,
        });
        MarketingStore::new(root.marketing_spend())
            .save(&ledger)
            .unwrap();
        root
    }

    fn cycle_with(
        root: &DataRoot,
        gateway: Arc<dyn LanguageGateway>,
        bridge: Arc<DryRunBridge>,
    ) -> BusinessCycle {
        let engine = DecisionEngine::new(
            root,
            gateway,
            DecisionTelemetry::builder("decision_engine").build().unwrap(),
        );
        BusinessCycle::new(
            root,
            engine,
            Arc::clone(&bridge) as Arc<dyn PriceUpdater>,
            bridge as Arc<dyn CopyUpdater>,
            ExecutorTelemetry::builder("executor").build().unwrap(),
        )
    }

    fn synthesis(confidence: f64) -> String {
        format!(
            r#"{{"kind": "UPDATE_PRICE", "parameters": {{"platform": "gumroad", "product_id": "guide", "new_price": 21.0}}, "confidence": {confidence}, "reasoning": "demand supports it", "risks_mitigated": []}}"#
        )
    }

    fn scripted(confidence: f64) -> Arc<ScriptedGateway> {
        Arc::new(ScriptedGateway::new(vec![
            "Raise the price slightly.".to_owned(),
            "1. Elasticity (high). 2. Refunds (medium). 3. Mismatch (low).".to_owned(),
            synthesis(confidence),
        ]))
    }

    #[tokio::test]
    async fn confident_price_update_is_dispatched() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path());
        let bridge = Arc::new(DryRunBridge::priced_at(20.0));
        let cycle = cycle_with(&root, scripted(0.9), Arc::clone(&bridge));
        let outcome = cycle.run("scheduled").await.unwrap();
        let CycleOutcome::Settled(record) = outcome else {
            panic!("expected a settled cycle");
        };
        assert!(record.executed);
        assert!(!record.blocked_by_safety);
        assert_eq!(
            bridge.calls(),
            vec![BridgeCall::Price {
                platform: Platform::Gumroad,
                product_id: "guide".into(),
                new_price: 21.0,
            }]
        );
    }

    #[tokio::test]
    async fn low_confidence_is_blocked_with_exact_reason() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path());
        let bridge = Arc::new(DryRunBridge::priced_at(20.0));
        let cycle = cycle_with(&root, scripted(0.55), Arc::clone(&bridge));
        let CycleOutcome::Settled(record) = cycle.run("scheduled").await.unwrap() else {
            panic!("expected a settled cycle");
        };
        assert!(record.blocked_by_safety);
        assert_eq!(record.reason, "Confidence 55% below threshold 70%");
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn price_step_violation_fails_locally() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path());
        // Current price $15: a move to $21 is a 40% jump against a 5% step.
        let bridge = Arc::new(DryRunBridge::priced_at(15.0));
        let cycle = cycle_with(&root, scripted(0.9), Arc::clone(&bridge));
        let CycleOutcome::Settled(record) = cycle.run("scheduled").await.unwrap() else {
            panic!("expected a settled cycle");
        };
        assert!(!record.executed);
        assert!(!record.blocked_by_safety);
        assert!(record.reason.contains("exceeds step"));
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn scripted_cycles_are_idempotent_up_to_timestamps() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path());
        let transcript = vec![
            "Raise the price slightly.".to_owned(),
            "1. Elasticity (high). 2. Refunds (medium). 3. Mismatch (low).".to_owned(),
            synthesis(0.9),
        ];
        let mut records = Vec::new();
        for _ in 0..2 {
            let bridge = Arc::new(DryRunBridge::priced_at(20.0));
            let cycle = cycle_with(
                &root,
                Arc::new(ScriptedGateway::new(transcript.clone())),
                bridge,
            );
            let CycleOutcome::Settled(record) = cycle.run("scheduled").await.unwrap() else {
                panic!("expected a settled cycle");
            };
            records.push(record);
        }
        assert_eq!(records[0].action, records[1].action);
        assert_eq!(records[0].executed, records[1].executed);
        assert!((records[0].confidence - records[1].confidence).abs() < f64::EPSILON);
        let history = JsonlFile::new(root.action_history());
        let stats = SafetyStats::from_history(&history).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.executed, 2);
    }

    #[tokio::test]
    async fn inaction_is_recorded_as_success() {
        let dir = tempdir().unwrap();
        let root = seeded_root(dir.path());
        let bridge = Arc::new(DryRunBridge::new());
        let gateway = Arc::new(ScriptedGateway::new(vec![
            "Hold.".to_owned(),
            "None.".to_owned(),
            r#"{"kind": "HOLD", "parameters": {}, "confidence": 0.3, "reasoning": "wait"}"#.to_owned(),
        ]));
        let cycle = cycle_with(&root, gateway, Arc::clone(&bridge));
        let CycleOutcome::Settled(record) = cycle.run("scheduled").await.unwrap() else {
            panic!("expected a settled cycle");
        };
        assert!(record.executed);
        assert_eq!(record.action, "HOLD");
        assert!(bridge.calls().is_empty());
    }
}
