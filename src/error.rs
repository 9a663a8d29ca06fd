use thiserror::Error;

/// Unified error type for `knightian` operations.
#[derive(Debug, Error)]
pub enum KnightianError {
    /// Raised when provided grids, distributions or tensors have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, often implied by a state grid.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a bounded scalar parameter lies outside its domain.
    #[error("parameter `{name}` = {value} is invalid: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Raised when a probability entry is negative, above one or not finite.
    #[error("distribution `{name}` has invalid entry {value} at index {index}: {reason}")]
    InvalidDistribution {
        name: &'static str,
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Raised when a distribution (or one row of a transition matrix) does not sum to one.
    #[error("distribution `{name}` must sum to one, row {row} sums to {sum}")]
    InvalidDistributionSum {
        name: &'static str,
        row: usize,
        sum: f64,
    },

    /// Raised when a state or action grid has no nodes.
    #[error("grid `{name}` must contain at least one node")]
    EmptyGrid { name: &'static str },

    /// Raised when a grid is not strictly ascending.
    #[error("grid `{name}` must be strictly ascending; violation at index {index}")]
    UnsortedGrid { name: &'static str, index: usize },

    /// Raised when numerical routines produce NaN.
    #[error("encountered NaN during {context}")]
    NumericalError { context: &'static str },
}

impl KnightianError {
    /// Helper to format a [`DimensionMismatch`](KnightianError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to format an [`InvalidParameter`](KnightianError::InvalidParameter) error.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// True for every error that signals a value outside its admissible domain.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. }
                | Self::InvalidDistribution { .. }
                | Self::InvalidDistributionSum { .. }
        )
    }

    /// True when a distribution or tensor shape disagrees with its grid.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, KnightianError>;
