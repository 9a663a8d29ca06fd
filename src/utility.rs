//! Period utility functions evaluated on consumption.

use crate::error::{KnightianError, Result};

/// A period utility function `u(c)`.
///
/// Implementations must be pure and finite for every consumption level at or
/// above the model's consumption floor. Any `Fn(f64) -> f64 + Send + Sync`
/// closure is a `Utility`.
pub trait Utility: Send + Sync {
    /// Evaluates `u(c)`.
    fn utility(&self, consumption: f64) -> f64;
}

impl<F> Utility for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn utility(&self, consumption: f64) -> f64 {
        self(consumption)
    }
}

/// Logarithmic utility `ln(c)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogUtility;

impl Utility for LogUtility {
    fn utility(&self, consumption: f64) -> f64 {
        consumption.ln()
    }
}

/// Constant relative risk aversion utility `c^(1-γ) / (1-γ)`.
#[derive(Clone, Copy, Debug)]
pub struct Crra {
    gamma: f64,
}

impl Crra {
    /// Creates a CRRA utility with relative risk aversion `gamma > 0`.
    pub fn new(gamma: f64) -> Result<Self> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(KnightianError::invalid_parameter(
                "gamma",
                gamma,
                "risk aversion must be positive and finite",
            ));
        }
        Ok(Self { gamma })
    }
}

impl Utility for Crra {
    fn utility(&self, consumption: f64) -> f64 {
        if (self.gamma - 1.0).abs() < f64::EPSILON {
            consumption.ln()
        } else {
            consumption.powf(1.0 - self.gamma) / (1.0 - self.gamma)
        }
    }
}
