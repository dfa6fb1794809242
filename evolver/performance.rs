use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use vela_stores::{
    events::{self, SaleEvent},
    marketing::{self, DEFAULT_DAILY_AD_ESTIMATE},
    EventKind, EvolutionEntry, MarketingLedger, StrategyParameters,
};

/// Evaluation window in days.
pub const WINDOW_DAYS: i64 = 7;

/// Health score below which evolution triggers even without alerts.
pub const HEALTH_TARGET: f64 = 50.0;

/// Revenue decline against the previous window that raises SEVERE_DECLINE.
const DECLINE_ALERT_PCT: f64 = -20.0;

/// Evolution-log entries considered by the novelty score.
const NOVELTY_LOOKBACK: usize = 10;

/// Named degradation conditions, checked in ladder order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alert {
    /// Ad spend is burning with ROAS below break-even.
    CriticalBurn,
    /// The window lost money outright.
    CriticalLoss,
    /// ROAS positive but below the efficiency bar.
    LowRoas,
    /// Margin below 20%.
    LowMarginPenalty,
    /// Revenue fell more than 20% against the previous window.
    SevereDecline,
}

impl Alert {
    /// Wire name, e.g. `CRITICAL_BURN`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CriticalBurn => "CRITICAL_BURN",
            Self::CriticalLoss => "CRITICAL_LOSS",
            Self::LowRoas => "LOW_ROAS",
            Self::LowMarginPenalty => "LOW_MARGIN_PENALTY",
            Self::SevereDecline => "SEVERE_DECLINE",
        }
    }
}

/// Fully costed view of one evaluation window.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// Window length in days.
    pub window_days: i64,
    /// Window revenue in dollars (sales minus refunds).
    pub revenue: f64,
    /// Sale count in the window.
    pub orders: usize,
    /// Platform transaction fees in dollars.
    pub tx_costs: f64,
    /// Ad spend in dollars.
    pub ad_spend: f64,
    /// Prorated fixed costs in dollars.
    pub fixed_costs: f64,
    /// Sum of all cost lines.
    pub total_costs: f64,
    /// Revenue minus total costs.
    pub net_profit: f64,
    /// Net profit over revenue, 0 when there is no revenue.
    pub margin: f64,
    /// Return on ad spend, saturated at 10 when spend is zero.
    pub roas: f64,
    /// Strategy-diversity score in `(0, 1]`.
    pub novelty: f64,
    /// Revenue change against the previous window, in percent.
    pub trend_pct: f64,
    /// Active degradation alerts.
    pub alerts: Vec<Alert>,
    /// Composite health score.
    pub health_score: f64,
}

impl PerformanceReport {
    /// Whether the evolver should mutate the strategy.
    #[must_use]
    pub fn should_evolve(&self) -> bool {
        self.health_score < HEALTH_TARGET
            || self.alerts.iter().any(|alert| {
                matches!(
                    alert,
                    Alert::CriticalBurn
                        | Alert::CriticalLoss
                        | Alert::LowMarginPenalty
                        | Alert::SevereDecline
                )
            })
    }
}

/// Evaluates the trailing window ending at `now`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn evaluate(
    all_events: &[SaleEvent],
    ledger: &MarketingLedger,
    params: &StrategyParameters,
    evolution_log: &[EvolutionEntry],
    now: DateTime<Utc>,
) -> PerformanceReport {
    let window = events::between(all_events, now - Duration::days(WINDOW_DAYS), now);
    let previous = events::between(
        all_events,
        now - Duration::days(2 * WINDOW_DAYS),
        now - Duration::days(WINDOW_DAYS),
    );

    let revenue = events::revenue_minor(&window) as f64 / 100.0;
    let orders = window.iter().filter(|e| e.kind == EventKind::Sale).count();

    let tx_costs_minor: i64 = window
        .iter()
        .filter(|e| e.kind == EventKind::Sale)
        .map(|e| ledger.fee_for(&e.platform).fee_minor(e.amount_minor))
        .sum();
    let tx_costs = tx_costs_minor as f64 / 100.0;
    let ad_spend = ledger.ad_spend(now, WINDOW_DAYS, DEFAULT_DAILY_AD_ESTIMATE);
    let fixed_costs = ledger.monthly_fixed_total() * WINDOW_DAYS as f64 / 30.0;
    let total_costs = tx_costs + ad_spend + fixed_costs;

    let net_profit = revenue - total_costs;
    let margin = if revenue > 0.0 {
        net_profit / revenue
    } else {
        0.0
    };
    let roas = marketing::roas(revenue, ad_spend);
    let novelty = novelty_score(params, evolution_log);

    let previous_revenue = events::revenue_minor(&previous) as f64 / 100.0;
    let trend_pct = if previous_revenue > 0.0 {
        (revenue - previous_revenue) / previous_revenue * 100.0
    } else {
        0.0
    };

    let (health_score, mut alerts) = health_ladder(net_profit, margin, roas, ad_spend, novelty);
    if trend_pct < DECLINE_ALERT_PCT {
        alerts.push(Alert::SevereDecline);
    }

    PerformanceReport {
        window_days: WINDOW_DAYS,
        revenue,
        orders,
        tx_costs,
        ad_spend,
        fixed_costs,
        total_costs,
        net_profit,
        margin,
        roas,
        novelty,
        trend_pct,
        alerts,
        health_score,
    }
}

/// Anti-gaming health ladder; the first matching clause wins.
fn health_ladder(
    net_profit: f64,
    margin: f64,
    roas: f64,
    ad_spend: f64,
    novelty: f64,
) -> (f64, Vec<Alert>) {
    if roas < 1.0 && ad_spend > 0.0 {
        return (-100.0, vec![Alert::CriticalBurn]);
    }
    if net_profit < 0.0 {
        return (-100.0, vec![Alert::CriticalLoss]);
    }
    if roas < 2.0 && ad_spend > 0.0 {
        return (0.5 * net_profit, vec![Alert::LowRoas]);
    }
    if margin < 0.20 {
        return (0.3 * net_profit, vec![Alert::LowMarginPenalty]);
    }
    let mut score = 0.8 * net_profit + 20.0 * novelty;
    if roas > 3.0 {
        score *= 1.2;
    }
    (score, Vec::new())
}

/// Inverse repetition of the current `(tone, mode)` pair in the recent
/// evolution log. Fresh pairs score 1; each repetition halves, thirds, and
/// so on.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn novelty_score(params: &StrategyParameters, evolution_log: &[EvolutionEntry]) -> f64 {
    let recent = evolution_log
        .iter()
        .rev()
        .take(NOVELTY_LOOKBACK);
    let matches = recent
        .filter(|entry| {
            entry.new_params.tone == params.tone && entry.new_params.mode == params.mode
        })
        .count();
    1.0 / (matches + 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_stores::{AdSpendEntry, RiskTolerance, StrategyMode};

    fn sale(days_ago: i64, amount_minor: i64, order_id: &str) -> SaleEvent {
        SaleEvent {
            timestamp: Utc::now() - Duration::days(days_ago) - Duration::minutes(5),
            platform: "gumroad".into(),
            kind: EventKind::Sale,
            order_id: order_id.into(),
            product_name: "Guide".into(),
            amount_minor,
            currency: "USD".into(),
            buyer: "b@example.com".into(),
        }
    }

    fn ledger(window_ad_spend: f64, monthly_fixed: f64) -> MarketingLedger {
        let mut ledger = MarketingLedger::default();
        ledger.daily_ad_spend.push(AdSpendEntry {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            spend: window_ad_spend,
        });
        if monthly_fixed > 0.0 {
            ledger.monthly_fixed_costs.insert("tools".into(), monthly_fixed);
        }
        ledger
    }

    #[test]
    fn burning_ad_spend_is_critical() {
        // $200 revenue against $300 ad spend: roas < 1.
        let events: Vec<SaleEvent> =
            (0..10).map(|i| sale(i % 6, 2000, &format!("o{i}"))).collect();
        let report = evaluate(
            &events,
            &ledger(300.0, 0.0),
            &StrategyParameters::default(),
            &[],
            Utc::now(),
        );
        assert_eq!(report.alerts, vec![Alert::CriticalBurn]);
        assert!((report.health_score - -100.0).abs() < f64::EPSILON);
        assert!(report.should_evolve());
    }

    #[test]
    fn healthy_window_scores_high_and_stays_put() {
        // 50 sales, $2000 revenue, $400 ad spend, $60/month fixed.
        let events: Vec<SaleEvent> =
            (0..50).map(|i| sale(i % 6, 4000, &format!("o{i}"))).collect();
        let report = evaluate(
            &events,
            &ledger(400.0, 60.0),
            &StrategyParameters::default(),
            &[],
            Utc::now(),
        );
        assert!((report.tx_costs - 215.0).abs() < 1e-9);
        assert!((report.fixed_costs - 14.0).abs() < 1e-9);
        assert!((report.net_profit - 1371.0).abs() < 1e-9);
        assert!((report.roas - 5.0).abs() < 1e-9);
        assert!(report.alerts.is_empty());
        // (0.8 * 1371 + 20 * 1.0) * 1.2
        assert!((report.health_score - 1340.16).abs() < 1e-6);
        assert!(!report.should_evolve());
    }

    #[test]
    fn zero_ad_spend_saturates_roas() {
        let events = vec![sale(1, 50_000, "o1")];
        let mut empty = MarketingLedger::default();
        // One explicit zero entry so the default estimate does not kick in.
        empty.daily_ad_spend.push(AdSpendEntry {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            spend: 0.0,
        });
        let report = evaluate(
            &events,
            &empty,
            &StrategyParameters::default(),
            &[],
            Utc::now(),
        );
        assert!((report.roas - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn novelty_decreases_with_repetition() {
        let params = StrategyParameters::default();
        let entry = |tone: &str, mode: StrategyMode| EvolutionEntry {
            timestamp: Utc::now(),
            trigger: vela_stores::EvolutionTrigger {
                revenue: 0.0,
                trend: "stable".into(),
                health_score: 0.0,
            },
            old_params: params.clone(),
            new_params: StrategyParameters {
                mode,
                tone: tone.into(),
                risk_tolerance: RiskTolerance::Medium,
                price_step: 0.05,
            },
            reasoning: String::new(),
        };
        let same = entry(&params.tone, params.mode);
        let different = entry("playful", StrategyMode::VolumeGrowth);
        assert!((novelty_score(&params, &[]) - 1.0).abs() < f64::EPSILON);
        assert!((novelty_score(&params, &[same.clone()]) - 0.5).abs() < f64::EPSILON);
        assert!(
            (novelty_score(&params, &[same.clone(), different, same]) - 1.0 / 3.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn severe_decline_raises_the_alert() {
        // $500 in the previous window, $100 in the current one.
        let mut events: Vec<SaleEvent> =
            (0..5).map(|i| sale(9, 10_000, &format!("p{i}"))).collect();
        events.push(sale(1, 10_000, "c0"));
        let report = evaluate(
            &events,
            &MarketingLedger::default(),
            &StrategyParameters::default(),
            &[],
            Utc::now(),
        );
        assert!(report.trend_pct < -20.0);
        assert!(report.alerts.contains(&Alert::SevereDecline));
        assert!(report.should_evolve());
    }
}
