use serde::Deserialize;
use vela_stores::{EvolutionEntry, RiskTolerance, StrategyMode, StrategyParameters};

use crate::performance::PerformanceReport;

/// Evolution-log entries quoted back to the model.
const HISTORY_IN_PROMPT: usize = 5;

/// Strategy mutation the model is required to emit: all four mutable fields,
/// plus its rationale. A reply missing any field fails to parse and the
/// cycle aborts with no state change.
#[derive(Debug, Clone, Deserialize)]
pub struct MutationPayload {
    /// New strategy mode.
    pub mode: StrategyMode,
    /// New prompt tone.
    pub tone: String,
    /// New risk tolerance.
    pub risk_tolerance: RiskTolerance,
    /// New maximum fractional price move.
    pub price_step: f64,
    /// Free-text rationale, persisted in the evolution log.
    #[serde(default)]
    pub reasoning: String,
}

impl MutationPayload {
    /// The parameters this mutation promotes, clamped to legal ranges.
    #[must_use]
    pub fn into_parameters(self) -> (StrategyParameters, String) {
        let params = StrategyParameters {
            mode: self.mode,
            tone: self.tone,
            risk_tolerance: self.risk_tolerance,
            price_step: self.price_step,
        }
        .clamped();
        (params, self.reasoning)
    }
}

/// System prompt for the mutation call.
#[must_use]
pub fn mutation_system() -> String {
    "You are the self-improvement module of an autonomous commerce system. \
     Given a performance report, the current strategy parameters, and recent \
     strategy history, emit a single JSON object and nothing else:\n\
     {\"mode\": \"balanced\" | \"volume_growth\" | \"premium_positioning\" | \
     \"profit_maximization\" | \"market_penetration\", \"tone\": \"...\", \
     \"risk_tolerance\": \"low\" | \"medium\" | \"high\" | \"aggressive\", \
     \"price_step\": 0.01-0.20, \"reasoning\": \"...\"}\n\
     Do not repeat a (tone, mode) pair from the recent history unless the \
     report clearly supports it."
        .to_owned()
}

/// User prompt for the mutation call.
pub fn mutation_user(
    report: &PerformanceReport,
    current: &StrategyParameters,
    evolution_log: &[EvolutionEntry],
) -> Result<String, serde_json::Error> {
    let recent: Vec<_> = evolution_log
        .iter()
        .rev()
        .take(HISTORY_IN_PROMPT)
        .map(|entry| {
            serde_json::json!({
                "timestamp": entry.timestamp,
                "mode": entry.new_params.mode,
                "tone": entry.new_params.tone,
                "reasoning": entry.reasoning,
            })
        })
        .collect();
    Ok(format!(
        "Performance report:\n{}\n\nCurrent parameters:\n{}\n\nRecent mutations (newest first):\n{}\n\nEmit the mutation JSON.",
        serde_json::to_string_pretty(report)?,
        serde_json::to_string_pretty(current)?,
        serde_json::to_string_pretty(&recent)?,
    ))
}

/// Strips a Markdown fence and trims to the outermost braces.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    match (inner.find('{'), inner.rfind('}')) {
        (Some(start), Some(end)) if end > start => &inner[start..=end],
        _ => inner,
    }
}

/// Parses a mutation reply, strictly.
#[must_use]
pub fn parse_mutation(raw: &str) -> Option<MutationPayload> {
    serde_json::from_str(extract_json(raw)).ok()
}
