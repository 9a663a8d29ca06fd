//! Aggregation of the invention-success and invention-failure branches.
//!
//! A household that attempts an invention succeeds with objective probability
//! `π`. An ambiguity-averse household does not trust `π` fully: it considers
//! every success probability in the α-contamination interval
//! `[(1 - α)π, (1 - α)π + α]` and evaluates the gamble under the worst one.
//! With `α = 0` the interval collapses to `{π}` and the aggregate is the plain
//! expectation, which is why that case is a separate variant.

use serde::{Deserialize, Serialize};

/// Strategy used to combine continuation values of the two invention outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InventionAggregator {
    /// Expected value under the objective success probability.
    Expectation { pi: f64 },
    /// Minimum expected value over the α-contamination belief interval around `pi`.
    Ambiguous { pi: f64, alpha: f64 },
}

impl InventionAggregator {
    /// Selects the aggregator implied by the ambiguity-aversion parameter.
    pub fn new(pi: f64, alpha: f64) -> Self {
        if alpha == 0.0 {
            Self::Expectation { pi }
        } else {
            Self::Ambiguous { pi, alpha }
        }
    }

    /// Admissible success probabilities `(low, high)`.
    pub fn belief_interval(&self) -> (f64, f64) {
        match *self {
            Self::Expectation { pi } => (pi, pi),
            Self::Ambiguous { pi, alpha } => {
                let low = (1.0 - alpha) * pi;
                (low, low + alpha)
            }
        }
    }

    /// Combines the value after a successful invention with the value after a failed one.
    #[inline]
    pub fn aggregate(&self, success: f64, failure: f64) -> f64 {
        match *self {
            Self::Expectation { pi } => pi * success + (1.0 - pi) * failure,
            Self::Ambiguous { .. } => {
                // Linear in the belief, so the minimum sits at an endpoint.
                let (low, high) = self.belief_interval();
                let at_low = low * success + (1.0 - low) * failure;
                let at_high = high * success + (1.0 - high) * failure;
                at_low.min(at_high)
            }
        }
    }
}
