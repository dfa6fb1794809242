use thiserror::Error;
use vela_stores::RiskTolerance;

/// Highest price any decision may set, in dollars.
pub const PRICE_CEILING: f64 = 10_000.0;

/// Longest copy content any decision may push, in characters.
pub const CONTENT_LIMIT: usize = 50_000;

/// Outcome of the confidence valve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValveVerdict {
    /// Confidence met the policy threshold; dispatch may proceed.
    Pass,
    /// Confidence fell short; nothing is dispatched.
    Blocked {
        /// Human-readable block reason, persisted to the action history.
        reason: String,
    },
}

/// Gates a decision's self-reported confidence against the policy threshold.
///
/// The threshold is inclusive: an aggressive-tolerance decision at exactly
/// 0.60 passes.
#[must_use]
pub fn gate(confidence: f64, risk: RiskTolerance) -> ValveVerdict {
    let threshold = risk.confidence_threshold();
    if confidence >= threshold {
        ValveVerdict::Pass
    } else {
        ValveVerdict::Blocked {
            reason: format!(
                "Confidence {:.0}% below threshold {:.0}%",
                confidence * 100.0,
                threshold * 100.0
            ),
        }
    }
}

/// A decision that passed the valve but breaks an execution contract.
///
/// Contract violations abort the single action locally; the cycle continues
/// and nothing is retried.
#[derive(Debug, Error, PartialEq)]
pub enum ContractViolation {
    /// Price outside `(0, 10000]`.
    #[error("price ${0:.2} outside (0, {PRICE_CEILING}]")]
    PriceOutOfRange(f64),
    /// Fractional move from the last known price exceeded the strategy step.
    #[error("price move {observed:.5} exceeds step {allowed:.5}")]
    PriceStepExceeded {
        /// Observed fractional move.
        observed: f64,
        /// Maximum fractional move allowed by the strategy.
        allowed: f64,
    },
    /// Copy content longer than the platform limit.
    #[error("content length {0} exceeds {CONTENT_LIMIT} characters")]
    ContentTooLong(usize),
    /// A required decision parameter is absent.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
}

/// Validates a price update against the absolute range and the strategy's
/// maximum fractional move.
pub fn validate_price(
    new_price: f64,
    last_known: Option<f64>,
    price_step: f64,
) -> Result<(), ContractViolation> {
    if !(new_price > 0.0 && new_price <= PRICE_CEILING) {
        return Err(ContractViolation::PriceOutOfRange(new_price));
    }
    if let Some(current) = last_known {
        if current > 0.0 {
            let observed = ((new_price - current) / current).abs();
            if observed > price_step {
                return Err(ContractViolation::PriceStepExceeded {
                    observed,
                    allowed: price_step,
                });
            }
        }
    }
    Ok(())
}

/// Validates copy content length.
pub fn validate_copy(content: &str) -> Result<(), ContractViolation> {
    let len = content.chars().count();
    if len > CONTENT_LIMIT {
        return Err(ContractViolation::ContentTooLong(len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_at_the_boundary() {
        assert_eq!(gate(0.60, RiskTolerance::Aggressive), ValveVerdict::Pass);
        assert_eq!(gate(0.70, RiskTolerance::Medium), ValveVerdict::Pass);
    }

    #[test]
    fn block_reason_uses_whole_percentages() {
        let verdict = gate(0.55, RiskTolerance::Medium);
        assert_eq!(
            verdict,
            ValveVerdict::Blocked {
                reason: "Confidence 55% below threshold 70%".into()
            }
        );
    }

    #[test]
    fn price_range_is_half_open() {
        assert!(validate_price(0.01, None, 0.05).is_ok());
        assert!(validate_price(10_000.0, None, 0.05).is_ok());
        assert!(validate_price(0.0, None, 0.05).is_err());
        assert!(validate_price(10_000.01, None, 0.05).is_err());
    }

    #[test]
    fn hairline_step_violation_is_caught() {
        // 5.001% move against a 5% step.
        let result = validate_price(21.0002, Some(20.0), 0.05);
        assert!(matches!(
            result,
            Err(ContractViolation::PriceStepExceeded { .. })
        ));
        // Exactly 5% is allowed.
        assert!(validate_price(21.0, Some(20.0), 0.05).is_ok());
    }

    #[test]
    fn unknown_current_price_skips_the_step_check() {
        assert!(validate_price(9_999.0, None, 0.01).is_ok());
    }

    #[test]
    fn copy_limit_counts_characters() {
        assert!(validate_copy(&"a".repeat(CONTENT_LIMIT)).is_ok());
        assert!(validate_copy(&"a".repeat(CONTENT_LIMIT + 1)).is_err());
    }
}
