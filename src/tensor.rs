//! Dense arrays backing the value functions and precomputed inputs.
//!
//! All arrays are standard-layout `ndarray` buffers allocated once per solve.

use ndarray::{Array3, Array4, ArrayBase, Data, Dimension, Zip};

use crate::error::{KnightianError, Result};

/// Real-valued rank-3 array (value functions, next-period wealth).
pub type Tensor3 = Array3<f64>;
/// Real-valued rank-4 array (utility grid, action values, joint transition).
pub type Tensor4 = Array4<f64>;
/// Rank-3 array of action indices (policies).
pub type IndexTensor3 = Array3<usize>;

/// Fails with [`KnightianError::DimensionMismatch`] unless both shapes agree.
pub fn check_same_shape(context: &'static str, expected: &[usize], found: &[usize]) -> Result<()> {
    if expected.len() != found.len() {
        return Err(KnightianError::dimension_mismatch(
            context,
            expected.len(),
            found.len(),
        ));
    }
    for (want, got) in expected.iter().zip(found) {
        if want != got {
            return Err(KnightianError::dimension_mismatch(context, *want, *got));
        }
    }
    Ok(())
}

/// Sup-norm distance `max |a - b|` between two equally shaped arrays.
pub fn max_abs_diff<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    check_same_shape("sup-norm comparison", a.shape(), b.shape())?;
    let gap = Zip::from(a).and(b).fold(0.0_f64, |gap, x, y| {
        let diff = (x - y).abs();
        if gap.is_nan() || diff.is_nan() {
            f64::NAN
        } else {
            gap.max(diff)
        }
    });
    if gap.is_nan() {
        return Err(KnightianError::NumericalError {
            context: "sup-norm comparison",
        });
    }
    Ok(gap)
}

/// True when every element is finite.
pub fn all_finite<S, D>(array: &ArrayBase<S, D>) -> bool
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    array.iter().all(|value| value.is_finite())
}
