//! Piecewise-linear interpolation on ascending one-dimensional grids.
//!
//! Queries outside `[xs[0], xs[n - 1]]` are clamped to the boundary node, so a
//! continuation value never extrapolates past the values actually solved for.

use ndarray::ArrayView1;

/// Index `i` of the bracketing interval `[xs[i], xs[i + 1]]` for `x`.
///
/// Assumes `xs` is strictly ascending with at least two nodes and
/// `xs[0] <= x <= xs[n - 1]`.
#[inline]
fn bracket(xs: &[f64], x: f64) -> usize {
    let upper = xs.partition_point(|node| *node <= x);
    upper.saturating_sub(1).min(xs.len() - 2)
}

/// Evaluates the linear interpolant of `(xs, ys)` at `x`.
///
/// `xs` must be strictly ascending and `ys.len() == xs.len()`.
#[inline]
pub fn interp_linear(xs: &[f64], ys: ArrayView1<'_, f64>, x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n == 1 || x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let i = bracket(xs, x);
    let weight = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + weight * (ys[i + 1] - ys[i])
}

/// Grid node closest to `x`; ties resolve to the lower node.
pub fn nearest_index(xs: &[f64], x: f64) -> usize {
    let n = xs.len();
    if n == 1 || x <= xs[0] {
        return 0;
    }
    if x >= xs[n - 1] {
        return n - 1;
    }
    let i = bracket(xs, x);
    if x - xs[i] <= xs[i + 1] - x {
        i
    } else {
        i + 1
    }
}
