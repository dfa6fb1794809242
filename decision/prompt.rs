use vela_stores::StrategyParameters;

use crate::model::MarketSnapshot;

/// Knowledge injected into the proposal prompt is capped at this many
/// characters, keeping token spend bounded as the store grows.
pub const KNOWLEDGE_BUDGET: usize = 1_500;

/// Fills `{placeholder}` slots in a strategy template.
///
/// Unknown placeholders are left literal so a mutated template with a typo
/// degrades to odd prose instead of a panic or an error.
#[must_use]
pub fn fill_template(template: &str, params: &StrategyParameters) -> String {
    template
        .replace("{mode}", params.mode.as_str())
        .replace("{tone}", &params.tone)
        .replace("{risk_tolerance}", params.risk_tolerance.as_str())
        .replace("{price_step}", &format!("{:.2}", params.price_step))
}

/// System prompt for the proposal step: strategy persona plus accumulated
/// wisdom.
#[must_use]
pub fn proposer_system(template: &str, params: &StrategyParameters, knowledge: &str) -> String {
    format!(
        "{}\n\nLessons learned from past operations:\n{}",
        fill_template(template, params),
        knowledge
    )
}

/// User prompt shared by the proposal step: trigger tag and market state.
#[must_use]
pub fn proposer_user(trigger: &str, snapshot: &MarketSnapshot) -> String {
    format!(
        "Trigger: {trigger}\n\nCurrent market state:\n\
         - total revenue: ${:.2} across {} orders\n\
         - last 24h: ${:.2} across {} orders\n\
         - trend: {} ({:+.1}% vs previous window)\n\
         - conversion rate: {:.2}%\n\n\
         Propose exactly one concrete business action (a price change, a copy \
         change, or holding position) with your reasoning.",
        snapshot.total_revenue,
        snapshot.total_orders,
        snapshot.revenue_24h,
        snapshot.orders_24h,
        snapshot.trend.as_str(),
        snapshot.trend_pct,
        snapshot.conversion_rate * 100.0,
    )
}

/// System prompt for the critique step.
#[must_use]
pub fn critic_system() -> String {
    "You are a ruthless business risk auditor. You receive a proposed action \
     and must list exactly three concrete ways it could fail, each with a \
     severity of low, medium, or high. Be specific about mechanisms, not \
     generic about risk."
        .to_owned()
}

/// User prompt for the critique step.
#[must_use]
pub fn critic_user(proposal: &str) -> String {
    format!("Proposed action:\n{proposal}\n\nList the three failure modes.")
}

/// System prompt for the synthesis step.
#[must_use]
pub fn synthesiser_system() -> String {
    "You are the final decision maker. Given a proposal and its critique, \
     emit a single JSON object and nothing else:\n\
     {\"kind\": \"UPDATE_PRICE\" | \"MODIFY_COPY\" | \"HOLD\", \
     \"parameters\": {...}, \"confidence\": 0.0-1.0, \
     \"reasoning\": \"...\", \"risks_mitigated\": [\"...\"]}\n\
     For UPDATE_PRICE include platform, product_id, and new_price. For \
     MODIFY_COPY include platform, product_id, target, and content. Lower \
     your confidence for every critique point you cannot mitigate."
        .to_owned()
}

/// User prompt for the synthesis step.
#[must_use]
pub fn synthesiser_user(proposal: &str, critique: &str) -> String {
    format!("Proposal:\n{proposal}\n\nCritique:\n{critique}\n\nEmit the decision JSON.")
}
