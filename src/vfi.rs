//! Value function iteration for the two-stage Bellman system.
//!
//! One iteration performs two half-updates in sequence:
//!
//! 1. `V2(ζ, k̃, ι)` is recomputed from the current `V1` by maximizing over
//!    borrowing `b`. Continuation values interpolate `V1` along wealth at the
//!    realized next-period wealth, integrate over `(δ, ζ', ι')` with the joint
//!    transition, and combine the invention outcomes with the model's
//!    [`InventionAggregator`] in every ι slice except the labor-income one
//!    (index 0), which only ever receives the no-invention wealth.
//! 2. `V1(ι, ζ, w)` is recomputed from the new `V2` by maximizing
//!    `u(c) + β·V2(ζ, k̃, ι)` over net investment `k̃`. The action grid is the
//!    state grid of `V2`, so no interpolation is required.
//!
//! Each half-update is a parallel sweep over independent state cells. Ties in
//! the arg-max resolve to the lowest action index.

use log::{debug, info, warn};
use ndarray::parallel::prelude::*;
use ndarray::{s, ArrayView1, Axis, Zip};

use crate::ambiguity::InventionAggregator;
use crate::error::{KnightianError, Result};
use crate::grids::{create_next_w, create_p, create_uc_grid, initialize_values_and_policies};
use crate::interpolation::interp_linear;
use crate::model::KnightianModel;
use crate::solving::{SolveStatus, SolveSummary, SolverOptions};
use crate::tensor::{all_finite, check_same_shape, max_abs_diff, IndexTensor3, Tensor3, Tensor4};

/// Arrays computed once per solve and read by every iteration.
#[derive(Clone, Debug)]
pub struct Precomputed {
    /// Utility over `(ι, ζ, w, k̃)`.
    pub uc: Tensor4,
    /// Next-period wealth without an invention, over `(δ, k̃, b)`.
    pub next_w: Tensor3,
    /// Next-period wealth after a successful invention, over `(δ, k̃, b)`.
    pub next_w_star: Tensor3,
    /// Joint transition over `(δ, ζ, ζ', ι')`.
    pub p: Tensor4,
}

impl Precomputed {
    /// Fails with [`KnightianError::NumericalError`] if the utility grid is not finite.
    pub fn new(model: &KnightianModel) -> Result<Self> {
        let uc = create_uc_grid(model.utility(), model.grids(), model.wage(), model.min_c());
        if !all_finite(&uc) {
            return Err(KnightianError::NumericalError {
                context: "utility grid",
            });
        }
        let (next_w, next_w_star) = create_next_w(
            model.r(),
            model.delta_vals(),
            model.k_tilde_vals(),
            model.b_vals(),
            model.gross_return(),
            model.gamma_star(),
        );
        let p = create_p(model.p_delta(), model.p_zeta(), model.p_iota());
        Ok(Self {
            uc,
            next_w,
            next_w_star,
            p,
        })
    }
}

/// Solved value functions, policies and diagnostics.
#[derive(Clone, Debug)]
pub struct Solution {
    /// Worker-side value function over `(ι, ζ, w)`.
    pub v1: Tensor3,
    /// Investment-side value function over `(ζ, k̃, ι)`.
    pub v2: Tensor3,
    /// Index into `b_vals` of the optimal borrowing, over `(ζ, k̃, ι)`.
    pub b_policy: IndexTensor3,
    /// Index into `k_tilde_vals` of the optimal net investment, over `(ι, ζ, w)`.
    pub k_tilde_policy: IndexTensor3,
    /// Action values of the final iteration, over `(ζ, k̃, b, ι)`.
    pub b_av: Tensor4,
    /// Action values of the final iteration, over `(ι, ζ, w, k̃)`.
    pub k_tilde_av: Tensor4,
    pub summary: SolveSummary,
}

impl Solution {
    /// Optimal borrowing levels rather than grid indices.
    pub fn b_policy_values(&self, model: &KnightianModel) -> Tensor3 {
        let b_vals = model.b_vals();
        self.b_policy.mapv(|index| b_vals[index])
    }

    /// Optimal net investment levels rather than grid indices.
    pub fn k_tilde_policy_values(&self, model: &KnightianModel) -> Tensor3 {
        let k_vals = model.k_tilde_vals();
        self.k_tilde_policy.mapv(|index| k_vals[index])
    }
}

/// First maximizer of `values`.
fn argmax<'a, I>(values: I, context: &'static str) -> Result<(usize, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut best_index = 0usize;
    let mut best_value = f64::NEG_INFINITY;
    for (index, value) in values.into_iter().enumerate() {
        if value.is_nan() {
            return Err(KnightianError::NumericalError { context });
        }
        if index == 0 || *value > best_value {
            best_index = index;
            best_value = *value;
        }
    }
    Ok((best_index, best_value))
}

/// Expected `V1` at next-period wealth from origin productivity `ζ`.
///
/// `wealth[δ]` is the realized next wealth under shock `δ`.
fn expected_v1(
    model: &KnightianModel,
    p: &Tensor4,
    v1: &Tensor3,
    zeta: usize,
    wealth: ArrayView1<'_, f64>,
) -> f64 {
    let w_vals = model.w_vals().as_slice();
    let (n_iota, n_zeta, _) = v1.dim();

    let mut expectation = 0.0;
    for (delta, next_wealth) in wealth.iter().enumerate() {
        for zeta_next in 0..n_zeta {
            for iota_next in 0..n_iota {
                let probability = p[[delta, zeta, zeta_next, iota_next]];
                if probability == 0.0 {
                    continue;
                }
                let row = v1.slice(s![iota_next, zeta_next, ..]);
                expectation += probability * interp_linear(w_vals, row, *next_wealth);
            }
        }
    }
    expectation
}

/// Recomputes `V2`, its borrowing action values and the borrowing policy from `v1`.
pub fn update_v2(
    model: &KnightianModel,
    pre: &Precomputed,
    v1: &Tensor3,
    b_av: &mut Tensor4,
    v2: &mut Tensor3,
    b_policy: &mut IndexTensor3,
) -> Result<()> {
    let (_, _, n_b, n_iota) = b_av.dim();
    let aggregator: InventionAggregator = model.aggregator();

    b_av.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(v2.axis_iter_mut(Axis(0)))
        .zip(b_policy.axis_iter_mut(Axis(0)))
        .enumerate()
        .try_for_each(|(zeta, ((mut zeta_av, mut zeta_values), mut zeta_policy))| {
            zeta_av
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(zeta_values.axis_iter_mut(Axis(0)))
                .zip(zeta_policy.axis_iter_mut(Axis(0)))
                .enumerate()
                .try_for_each(|(k, ((mut action_values, mut values), mut policy))| -> Result<()> {
                    for b in 0..n_b {
                        let failure =
                            expected_v1(model, &pre.p, v1, zeta, pre.next_w.slice(s![.., k, b]));
                        let success = if n_iota > 1 {
                            expected_v1(model, &pre.p, v1, zeta, pre.next_w_star.slice(s![.., k, b]))
                        } else {
                            failure
                        };
                        for iota in 0..n_iota {
                            action_values[[b, iota]] = if iota == 0 {
                                failure
                            } else {
                                aggregator.aggregate(success, failure)
                            };
                        }
                    }

                    for iota in 0..n_iota {
                        let (best, value) =
                            argmax(action_values.column(iota), "borrowing choice")?;
                        values[iota] = value;
                        policy[iota] = best;
                    }
                    Ok(())
                })
        })
}

/// Recomputes `V1`, its investment action values and the investment policy from `v2`.
pub fn update_v1(
    model: &KnightianModel,
    pre: &Precomputed,
    v2: &Tensor3,
    k_tilde_av: &mut Tensor4,
    v1: &mut Tensor3,
    k_tilde_policy: &mut IndexTensor3,
) -> Result<()> {
    let beta = model.beta();

    k_tilde_av
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(v1.axis_iter_mut(Axis(0)))
        .zip(k_tilde_policy.axis_iter_mut(Axis(0)))
        .enumerate()
        .try_for_each(|(iota, ((mut iota_av, mut iota_values), mut iota_policy))| {
            iota_av
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(iota_values.axis_iter_mut(Axis(0)))
                .zip(iota_policy.axis_iter_mut(Axis(0)))
                .enumerate()
                .try_for_each(|(zeta, ((mut zeta_av, mut values), mut policy))| -> Result<()> {
                    let uc = pre.uc.slice(s![iota, zeta, .., ..]);
                    let continuation = v2.slice(s![zeta, .., iota]);

                    for (w, mut row) in zeta_av.outer_iter_mut().enumerate() {
                        Zip::from(&mut row)
                            .and(uc.row(w))
                            .and(&continuation)
                            .for_each(|slot, &utility, &future| *slot = utility + beta * future);
                        let (best, value) = argmax(row.iter(), "net investment choice")?;
                        values[w] = value;
                        policy[w] = best;
                    }
                    Ok(())
                })
        })
}

/// Runs value function iteration until both value functions settle or the cap is hit.
///
/// `initial` replaces the all-zero starting guess for `(V1, V2)`.
pub fn solve_dp_vi(
    model: &KnightianModel,
    options: &SolverOptions,
    initial: Option<(&Tensor3, &Tensor3)>,
) -> Result<Solution> {
    let pre = Precomputed::new(model)?;
    let grids = model.grids();
    let mut arrays = initialize_values_and_policies(grids, model.b_vals());
    let mut b_policy = IndexTensor3::zeros(grids.v2_shape());
    let mut k_tilde_policy = IndexTensor3::zeros(grids.v1_shape());

    if let Some((v1_guess, v2_guess)) = initial {
        check_same_shape("initial V1", arrays.v1.shape(), v1_guess.shape())?;
        check_same_shape("initial V2", arrays.v2.shape(), v2_guess.shape())?;
        arrays.v1.assign(v1_guess);
        arrays.v2.assign(v2_guess);
    }
    arrays.v1_store.assign(&arrays.v1);
    arrays.v2_store.assign(&arrays.v2);

    let max_iterations = options.max_iterations.max(1);
    let mut iterations = 0usize;
    let mut residual = f64::INFINITY;
    let mut status = SolveStatus::MaxIterationsReached;

    while iterations < max_iterations {
        update_v2(
            model,
            &pre,
            &arrays.v1,
            &mut arrays.b_av,
            &mut arrays.v2,
            &mut b_policy,
        )?;
        update_v1(
            model,
            &pre,
            &arrays.v2,
            &mut arrays.k_tilde_av,
            &mut arrays.v1,
            &mut k_tilde_policy,
        )?;

        let v1_gap = max_abs_diff(&arrays.v1, &arrays.v1_store)?;
        let v2_gap = max_abs_diff(&arrays.v2, &arrays.v2_store)?;
        residual = v1_gap.max(v2_gap);
        iterations += 1;
        debug!("iteration {iterations}: V1 gap {v1_gap:e}, V2 gap {v2_gap:e}");

        if v1_gap < options.tolerance && v2_gap < options.tolerance {
            status = SolveStatus::Converged;
            break;
        }
        arrays.v1_store.assign(&arrays.v1);
        arrays.v2_store.assign(&arrays.v2);
    }

    match status {
        SolveStatus::Converged => {
            info!("value function iteration converged after {iterations} iterations (residual {residual:e})")
        }
        SolveStatus::MaxIterationsReached => {
            warn!("value function iteration stopped at the cap of {iterations} iterations (residual {residual:e})")
        }
    }

    Ok(Solution {
        v1: arrays.v1,
        v2: arrays.v2,
        b_policy,
        k_tilde_policy,
        b_av: arrays.b_av,
        k_tilde_av: arrays.k_tilde_av,
        summary: SolveSummary {
            iterations,
            residual,
            status,
        },
    })
}
