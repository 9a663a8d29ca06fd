//! Value function iteration configuration and diagnostics.

use serde::{Deserialize, Serialize};

/// Configuration for the fixed-point iteration over `(V1, V2)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Supremum norm tolerance applied to both value functions.
    pub tolerance: f64,
    /// Maximum number of Bellman iterations before giving up.
    pub max_iterations: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 1_000,
        }
    }
}

impl SolverOptions {
    /// Override the sup-norm tolerance while preserving other defaults.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration cap; at least one iteration is always performed.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }
}

/// Terminal state of a solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Both value functions moved less than the tolerance in the last iteration.
    Converged,
    /// The iteration cap was hit first; the arrays hold the last iterate.
    MaxIterationsReached,
}

/// Diagnostics returned alongside the solved value functions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    /// Number of iterations performed.
    pub iterations: usize,
    /// Largest sup-norm change of `V1` or `V2` in the final iteration.
    pub residual: f64,
    pub status: SolveStatus,
}

impl SolveSummary {
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}
