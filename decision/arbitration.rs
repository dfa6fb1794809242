use serde::Serialize;
use vela_stores::RiskTolerance;

use crate::model::{MarketSnapshot, TrendDirection};

/// Veto line: scores at or below this skip the deliberation loop entirely.
pub const VETO_FLOOR: f64 = 0.6;

/// Outcome of weighing the growth objective against the safety objective.
#[derive(Debug, Clone, Serialize)]
pub struct Arbitration {
    /// Growth-side input derived from the market snapshot.
    pub market_opportunity: f64,
    /// Raw return on ad spend over the window.
    pub roas: f64,
    /// ROAS normalised into `[0, 1]`.
    pub roas_score: f64,
    /// `(growth, safety)` weights applied.
    pub weights: (f64, f64),
    /// Weighted final score.
    pub final_score: f64,
}

impl Arbitration {
    /// Weighs market opportunity against ad-spend efficiency.
    #[must_use]
    pub fn weigh(snapshot: &MarketSnapshot, roas: f64, risk: RiskTolerance) -> Self {
        let market_opportunity = market_opportunity(snapshot);
        let roas_score = (roas / 2.0).min(1.0);
        let weights = risk.arbitration_weights();
        let final_score = weights.0 * market_opportunity + weights.1 * roas_score;
        Self {
            market_opportunity,
            roas,
            roas_score,
            weights,
            final_score,
        }
    }

    /// Whether the decision loop may proceed to deliberation.
    #[must_use]
    pub fn approved(&self) -> bool {
        self.final_score > VETO_FLOOR
    }
}

/// Growth-side heuristic: how much room the current trend leaves for action.
#[must_use]
pub const fn market_opportunity(snapshot: &MarketSnapshot) -> f64 {
    match snapshot.trend {
        TrendDirection::Growing => 0.9,
        TrendDirection::New => 0.8,
        TrendDirection::Stable => 0.6,
        TrendDirection::Declining => 0.35,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(trend: TrendDirection) -> MarketSnapshot {
        MarketSnapshot {
            conversion_rate: 0.01,
            total_revenue: 200.0,
            total_orders: 10,
            revenue_24h: 200.0,
            orders_24h: 10,
            trend,
            trend_pct: 0.0,
            data_available: true,
        }
    }

    #[test]
    fn poor_roas_on_new_market_is_vetoed() {
        // $200 revenue against $300 ad spend.
        let arb = Arbitration::weigh(&snapshot(TrendDirection::New), 200.0 / 300.0, RiskTolerance::Medium);
        assert!((arb.roas_score - 1.0 / 3.0).abs() < 1e-9);
        assert!((arb.final_score - (0.3 * 0.8 + 0.7 / 3.0)).abs() < 1e-9);
        assert!(!arb.approved());
    }

    #[test]
    fn strong_roas_on_growth_is_approved() {
        let arb = Arbitration::weigh(&snapshot(TrendDirection::Growing), 5.0, RiskTolerance::Medium);
        assert!((arb.roas_score - 1.0).abs() < 1e-9);
        assert!(arb.approved());
    }

    #[test]
    fn aggressive_weights_favour_growth() {
        let arb = Arbitration::weigh(&snapshot(TrendDirection::Growing), 0.1, RiskTolerance::Aggressive);
        // 0.7 * 0.9 + 0.3 * 0.05 = 0.645 > 0.6.
        assert!(arb.approved());
        let same_but_cautious =
            Arbitration::weigh(&snapshot(TrendDirection::Growing), 0.1, RiskTolerance::Low);
        assert!(!same_but_cautious.approved());
    }

    #[test]
    fn exact_floor_is_vetoed() {
        // Stable market, roas_score 0.6: 0.3 * 0.6 + 0.7 * 0.6 = 0.6 exactly.
        let arb = Arbitration::weigh(&snapshot(TrendDirection::Stable), 1.2, RiskTolerance::Medium);
        assert!((arb.final_score - 0.6).abs() < 1e-9);
        assert!(!arb.approved());
    }
}
