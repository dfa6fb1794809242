use serde::{Deserialize, Serialize};

/// Context for a routing verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteContext {
    /// Revenue at stake for this decision request, in dollars.
    pub potential_revenue: f64,
    /// Quality of the available data in `[0, 1]`.
    pub data_quality: f64,
}

/// Outcome of value-of-information arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RouteVerdict {
    /// Stakes or confidence justify the cheap heuristic path.
    FastExecute {
        /// Simulated fast-path confidence.
        confidence: f64,
    },
    /// Expected gain from slow reasoning exceeds its cost.
    Deliberate,
    /// Not worth acting or reasoning about at all.
    Skip,
}

/// Pure, deterministic fast-versus-slow arbitration.
///
/// Keeps operational cost bounded: never spend more on thinking than the
/// decision is worth.
#[derive(Debug, Clone, Copy)]
pub struct MetacognitiveRouter {
    /// Below this revenue the fast lane is forced, in dollars.
    low_stakes_floor: f64,
    /// Fast-path confidence required to skip deliberation.
    fast_confidence_gate: f64,
    /// Estimated cost of one deliberation cycle, in dollars.
    deliberation_cost: f64,
}

impl MetacognitiveRouter {
    /// Creates a router with explicit thresholds.
    #[must_use]
    pub const fn new(low_stakes_floor: f64, fast_confidence_gate: f64, deliberation_cost: f64) -> Self {
        Self {
            low_stakes_floor,
            fast_confidence_gate,
            deliberation_cost,
        }
    }

    /// Simulated fast-path confidence for a context.
    #[must_use]
    pub fn fast_confidence(&self, context: RouteContext) -> f64 {
        (context.data_quality * 1.5).min(0.99)
    }

    /// Routes one decision request.
    #[must_use]
    pub fn route(&self, context: RouteContext) -> RouteVerdict {
        let confidence = self.fast_confidence(context);
        if context.potential_revenue < self.low_stakes_floor {
            return RouteVerdict::FastExecute { confidence };
        }
        if confidence >= self.fast_confidence_gate {
            return RouteVerdict::FastExecute { confidence };
        }
        // Deliberation is assumed to improve a 20%-margin outcome by 10%.
        let expected_gain = context.potential_revenue * 0.2 * 0.10;
        if expected_gain > self.deliberation_cost {
            RouteVerdict::Deliberate
        } else {
            RouteVerdict::Skip
        }
    }
}

impl Default for MetacognitiveRouter {
    fn default() -> Self {
        Self::new(50.0, 0.85, 0.50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_stakes_force_fast_lane() {
        let router = MetacognitiveRouter::default();
        let verdict = router.route(RouteContext {
            potential_revenue: 12.0,
            data_quality: 0.1,
        });
        assert!(matches!(verdict, RouteVerdict::FastExecute { .. }));
    }

    #[test]
    fn empty_history_yields_zero_confidence_fast_path() {
        let router = MetacognitiveRouter::default();
        let context = RouteContext {
            potential_revenue: 0.0,
            data_quality: 0.0,
        };
        assert!(matches!(
            router.route(context),
            RouteVerdict::FastExecute { confidence } if confidence == 0.0
        ));
    }

    #[test]
    fn confident_fast_path_bypasses_deliberation() {
        let router = MetacognitiveRouter::default();
        let verdict = router.route(RouteContext {
            potential_revenue: 500.0,
            data_quality: 0.9,
        });
        // 0.9 * 1.5 caps at 0.99, above the 0.85 gate.
        assert!(matches!(
            verdict,
            RouteVerdict::FastExecute { confidence } if (confidence - 0.99).abs() < 1e-9
        ));
    }

    #[test]
    fn high_stakes_low_confidence_deliberates() {
        let router = MetacognitiveRouter::default();
        let verdict = router.route(RouteContext {
            potential_revenue: 500.0,
            data_quality: 0.4,
        });
        // Gain 500 * 0.2 * 0.10 = $10 > $0.50.
        assert_eq!(verdict, RouteVerdict::Deliberate);
    }

    #[test]
    fn marginal_gain_below_cost_skips() {
        // Gain 51 * 0.2 * 0.10 = $1.02; with a $2 thinking cost the router
        // refuses to reason and defaults to safety.
        let expensive = MetacognitiveRouter::new(50.0, 0.85, 2.0);
        let verdict = expensive.route(RouteContext {
            potential_revenue: 51.0,
            data_quality: 0.05,
        });
        assert_eq!(verdict, RouteVerdict::Skip);
    }
}
