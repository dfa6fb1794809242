use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action selected by the decision layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    /// Change a product price.
    UpdatePrice,
    /// Rewrite product copy.
    ModifyCopy,
    /// Deliberate inaction chosen by the synthesiser.
    Hold,
    /// Synthetic veto emitted by arbitration; never produced by the model.
    Pass,
}

impl DecisionKind {
    /// Wire name, e.g. `UPDATE_PRICE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdatePrice => "UPDATE_PRICE",
            Self::ModifyCopy => "MODIFY_COPY",
            Self::Hold => "HOLD",
            Self::Pass => "PASS",
        }
    }
}

/// Kind-specific decision parameters as emitted by the synthesiser.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecisionParams {
    /// Target platform tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Product identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// New price in dollars, for price updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_price: Option<f64>,
    /// Copy target (`description`, `title`, `name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Replacement copy content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Revenue trend over the two most recent equal-length windows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// More than +5% against the previous window.
    Growing,
    /// Within ±5%.
    Stable,
    /// Below −5%.
    Declining,
    /// No previous window to compare against.
    New,
}

impl TrendDirection {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Growing => "growing",
            Self::Stable => "stable",
            Self::Declining => "declining",
            Self::New => "new",
        }
    }
}

/// KPI snapshot computed during the perceive step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Proxy conversion rate (orders against estimated traffic).
    pub conversion_rate: f64,
    /// All-time net revenue in dollars.
    pub total_revenue: f64,
    /// All-time order count.
    pub total_orders: usize,
    /// Net revenue over the last 24 hours, in dollars.
    pub revenue_24h: f64,
    /// Orders over the last 24 hours.
    pub orders_24h: usize,
    /// Trend direction.
    pub trend: TrendDirection,
    /// Percent change against the previous window.
    pub trend_pct: f64,
    /// Whether any events were available at all.
    pub data_available: bool,
}

/// Byte counts from the three-step loop, kept for traceability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoopTrace {
    /// Length of the raw proposal text.
    pub proposal_bytes: usize,
    /// Length of the raw critique text.
    pub critique_bytes: usize,
    /// Stages that produced output.
    pub steps_completed: u8,
}

/// Immutable outcome of one decision cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier.
    pub id: Uuid,
    /// Selected action.
    pub kind: DecisionKind,
    /// Kind-specific parameters.
    pub params: DecisionParams,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f64,
    /// Final rationale.
    pub reasoning: String,
    /// Mitigations adopted from the critique.
    pub risks_mitigated: Vec<String>,
    /// Three-step loop trace.
    pub loop_trace: LoopTrace,
    /// Market snapshot at decision time.
    pub snapshot: MarketSnapshot,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Trigger tag that started the cycle.
    pub trigger: String,
}

impl Decision {
    /// Builds a HOLD decision with the given confidence.
    #[must_use]
    pub fn hold(
        confidence: f64,
        reasoning: impl Into<String>,
        snapshot: MarketSnapshot,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: DecisionKind::Hold,
            params: DecisionParams::default(),
            confidence,
            reasoning: reasoning.into(),
            risks_mitigated: Vec::new(),
            loop_trace: LoopTrace::default(),
            snapshot,
            generated_at: Utc::now(),
            trigger: trigger.into(),
        }
    }

    /// Builds the synthetic arbitration-veto PASS decision.
    #[must_use]
    pub fn pass(
        reasoning: impl Into<String>,
        snapshot: MarketSnapshot,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: DecisionKind::Pass,
            params: DecisionParams::default(),
            confidence: 1.0,
            reasoning: reasoning.into(),
            risks_mitigated: Vec::new(),
            loop_trace: LoopTrace::default(),
            snapshot,
            generated_at: Utc::now(),
            trigger: trigger.into(),
        }
    }
}
