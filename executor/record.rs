use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vela_decision::Decision;
use vela_stores::{JsonlFile, StoreError};

/// One line of the action history, the audit trail of every gated decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Decision this record settles.
    pub decision_id: Uuid,
    /// Action kind, e.g. `UPDATE_PRICE`.
    pub action: String,
    /// Whether a side effect was dispatched successfully.
    pub executed: bool,
    /// Whether the confidence valve blocked the action.
    pub blocked_by_safety: bool,
    /// Block or failure reason; empty on success.
    #[serde(default)]
    pub reason: String,
    /// Confidence the decision carried.
    pub confidence: f64,
    /// Settlement time.
    pub completed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    fn base(decision: &Decision) -> Self {
        Self {
            decision_id: decision.id,
            action: decision.kind.as_str().to_owned(),
            executed: false,
            blocked_by_safety: false,
            reason: String::new(),
            confidence: decision.confidence,
            completed_at: Utc::now(),
        }
    }

    /// A dispatched side effect.
    #[must_use]
    pub fn executed(decision: &Decision) -> Self {
        Self {
            executed: true,
            ..Self::base(decision)
        }
    }

    /// Strategic inaction (PASS or HOLD), recorded as successful.
    #[must_use]
    pub fn inaction(decision: &Decision) -> Self {
        Self {
            executed: true,
            ..Self::base(decision)
        }
    }

    /// An action the confidence valve refused.
    #[must_use]
    pub fn blocked(decision: &Decision, reason: impl Into<String>) -> Self {
        Self {
            blocked_by_safety: true,
            reason: reason.into(),
            ..Self::base(decision)
        }
    }

    /// A local failure: contract violation or collaborator error.
    #[must_use]
    pub fn failed(decision: &Decision, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::base(decision)
        }
    }
}

/// Aggregate safety statistics over the action history.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SafetyStats {
    /// Total records.
    pub total: usize,
    /// Records with a dispatched or inaction success.
    pub executed: usize,
    /// Records blocked by the valve.
    pub blocked_by_safety: usize,
    /// Records that failed locally.
    pub failed: usize,
    /// Strategic inactions (HOLD or PASS) within `executed`.
    pub holds: usize,
}

impl SafetyStats {
    /// Summarises a slice of records.
    #[must_use]
    pub fn summarise(records: &[ExecutionRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            if record.blocked_by_safety {
                stats.blocked_by_safety += 1;
            } else if record.executed {
                stats.executed += 1;
                if record.action == "HOLD" || record.action == "PASS" {
                    stats.holds += 1;
                }
            } else {
                stats.failed += 1;
            }
        }
        stats
    }

    /// Reads and summarises an action-history file.
    pub fn from_history(history: &JsonlFile) -> Result<Self, StoreError> {
        Ok(Self::summarise(&history.read_all::<ExecutionRecord>()?))
    }

    /// Fraction of records the valve blocked, 0 when empty.
    #[must_use]
    pub fn block_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.blocked_by_safety as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_decision::{Decision, MarketSnapshot, TrendDirection};

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            conversion_rate: 0.01,
            total_revenue: 100.0,
            total_orders: 5,
            revenue_24h: 40.0,
            orders_24h: 2,
            trend: TrendDirection::Stable,
            trend_pct: 1.0,
            data_available: true,
        }
    }

    #[test]
    fn stats_partition_records() {
        let hold = Decision::hold(0.5, "wait", snapshot(), "test");
        let records = vec![
            ExecutionRecord::inaction(&hold),
            ExecutionRecord::blocked(&hold, "Confidence 50% below threshold 70%"),
            ExecutionRecord::failed(&hold, "price $0.00 outside (0, 10000]"),
        ];
        let stats = SafetyStats::summarise(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.holds, 1);
        assert_eq!(stats.blocked_by_safety, 1);
        assert_eq!(stats.failed, 1);
        assert!((stats.block_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn records_round_trip_through_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonlFile::new(dir.path().join("action_history.jsonl"));
        let hold = Decision::hold(0.9, "steady", snapshot(), "test");
        history.append(&ExecutionRecord::inaction(&hold)).unwrap();
        let stats = SafetyStats::from_history(&history).unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.executed, 1);
    }
}
