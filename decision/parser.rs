use serde::Deserialize;

use crate::model::{DecisionKind, DecisionParams};

/// Structured payload the synthesiser is asked to emit.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisPayload {
    /// Selected action kind.
    #[serde(alias = "decision")]
    pub kind: DecisionKind,
    /// Kind-specific parameters.
    #[serde(default)]
    pub parameters: DecisionParams,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-form justification.
    #[serde(default)]
    pub reasoning: String,
    /// Critique points the synthesiser claims to have addressed.
    #[serde(default)]
    pub risks_mitigated: Vec<String>,
}

/// Strips a Markdown code fence if the model wrapped its JSON in one, then
/// trims to the outermost braces.
#[must_use]
pub fn extract_json(raw: &str) -> &str {
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

/// Parses the synthesiser output.
///
/// Returns `None` for malformed JSON, an out-of-vocabulary kind, or a model
/// trying to claim the arbitration-only `PASS` kind. Confidence is clamped
/// into `[0, 1]`.
#[must_use]
pub fn parse_synthesis(raw: &str) -> Option<SynthesisPayload> {
    let mut payload: SynthesisPayload = serde_json::from_str(extract_json(raw)).ok()?;
    if payload.kind == DecisionKind::Pass {
        return None;
    }
    payload.confidence = payload.confidence.clamp(0.0, 1.0);
    Some(payload)
}
