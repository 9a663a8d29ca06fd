//! Static inputs of the value function iteration.
//!
//! Everything in this module is computed once per solve, before the first
//! Bellman update, and is read-only afterwards:
//!
//! - zero-initialized value functions and action-value scratch arrays,
//! - the utility of every (ι, ζ, w, k̃) combination,
//! - realized next-period wealth for every (δ, k̃, b) combination, and
//! - the joint transition tensor over (δ, ζ, ζ', ι').

use nalgebra::{DMatrix, DVector};

use crate::tensor::{Tensor3, Tensor4};
use crate::utility::Utility;

/// Default lower bound on consumption before the utility function is evaluated.
pub const DEFAULT_MIN_C: f64 = 1e-20;

/// `n` evenly spaced nodes from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> DVector<f64> {
    match n {
        0 => DVector::zeros(0),
        1 => DVector::from_element(1, start),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            DVector::from_fn(n, |i, _| start + step * i as f64)
        }
    }
}

/// Approximation nodes of the state variables.
#[derive(Clone, Debug)]
pub struct StateGrids {
    /// Wealth nodes `w`.
    pub w_vals: DVector<f64>,
    /// Idiosyncratic productivity nodes `ζ`.
    pub zeta_vals: DVector<f64>,
    /// Invention-state nodes `ι`; index 0 is the labor-income state.
    pub iota_vals: DVector<f64>,
    /// Net investment nodes `k̃`, a state of `V2` and an action of `V1`.
    pub k_tilde_vals: DVector<f64>,
}

impl StateGrids {
    /// Bundles the grids in the order `w, ζ, ι, k̃`.
    pub fn new(
        w_vals: DVector<f64>,
        zeta_vals: DVector<f64>,
        iota_vals: DVector<f64>,
        k_tilde_vals: DVector<f64>,
    ) -> Self {
        Self {
            w_vals,
            zeta_vals,
            iota_vals,
            k_tilde_vals,
        }
    }

    /// Shape `(|ι|, |ζ|, |w|)` of `V1`.
    pub fn v1_shape(&self) -> [usize; 3] {
        [self.iota_vals.len(), self.zeta_vals.len(), self.w_vals.len()]
    }

    /// Shape `(|ζ|, |k̃|, |ι|)` of `V2`.
    pub fn v2_shape(&self) -> [usize; 3] {
        [
            self.zeta_vals.len(),
            self.k_tilde_vals.len(),
            self.iota_vals.len(),
        ]
    }
}

/// Value functions, their previous iterates, and the action-value scratch arrays.
#[derive(Clone, Debug)]
pub struct ValueArrays {
    /// Worker-side value function over `(ι, ζ, w)`.
    pub v1: Tensor3,
    pub v1_store: Tensor3,
    /// Investment-side value function over `(ζ, k̃, ι)`.
    pub v2: Tensor3,
    pub v2_store: Tensor3,
    /// Value of each borrowing level over `(ζ, k̃, b, ι)`.
    pub b_av: Tensor4,
    /// Value of each net investment level over `(ι, ζ, w, k̃)`.
    pub k_tilde_av: Tensor4,
}

/// Allocates all-zero value functions and action-value arrays.
pub fn initialize_values_and_policies(grids: &StateGrids, b_vals: &DVector<f64>) -> ValueArrays {
    let v1_shape = grids.v1_shape();
    let v2_shape = grids.v2_shape();
    let [n_zeta, n_k, n_iota] = v2_shape;
    let n_w = grids.w_vals.len();

    ValueArrays {
        v1: Tensor3::zeros(v1_shape),
        v1_store: Tensor3::zeros(v1_shape),
        v2: Tensor3::zeros(v2_shape),
        v2_store: Tensor3::zeros(v2_shape),
        b_av: Tensor4::zeros([n_zeta, n_k, b_vals.len(), n_iota]),
        k_tilde_av: Tensor4::zeros([n_iota, n_zeta, n_w, n_k]),
    }
}

/// Evaluates `u` at consumption `w - k̃ (+ ζ·wage when ι index is 0)`, floored at `min_c`.
///
/// Output shape is `(|ι|, |ζ|, |w|, |k̃|)`.
pub fn create_uc_grid<U: Utility + ?Sized>(
    u: &U,
    grids: &StateGrids,
    wage: f64,
    min_c: f64,
) -> Tensor4 {
    let shape = [
        grids.iota_vals.len(),
        grids.zeta_vals.len(),
        grids.w_vals.len(),
        grids.k_tilde_vals.len(),
    ];
    let mut uc = Tensor4::from_shape_fn(shape, |(iota, zeta, w, k)| {
        let mut consumption = grids.w_vals[w] - grids.k_tilde_vals[k];
        if iota == 0 {
            consumption += grids.zeta_vals[zeta] * wage;
        }
        consumption.max(min_c)
    });
    uc.mapv_inplace(|consumption| u.utility(consumption));
    uc
}

/// Next-period wealth without (`next_w`) and with (`next_w_star`) a successful invention.
///
/// `next_w[δ, k̃, b] = (1 + r)·δ·k̃ + (R − (1 + r)·δ)·b` and
/// `next_w_star = next_w + Γ*`, both of shape `(|δ|, |k̃|, |b|)`.
pub fn create_next_w(
    r: f64,
    delta_vals: &DVector<f64>,
    k_tilde_vals: &DVector<f64>,
    b_vals: &DVector<f64>,
    gross_return: f64,
    gamma_star: f64,
) -> (Tensor3, Tensor3) {
    let shape = [delta_vals.len(), k_tilde_vals.len(), b_vals.len()];
    let next_w = Tensor3::from_shape_fn(shape, |(delta, k, b)| {
        let depreciated = (1.0 + r) * delta_vals[delta];
        depreciated * k_tilde_vals[k] + (gross_return - depreciated) * b_vals[b]
    });
    let next_w_star = next_w.mapv(|wealth| wealth + gamma_star);
    (next_w, next_w_star)
}

/// Joint transition `P[δ, ζ, ζ', ι'] = P_δ[δ]·P_ζ[ζ, ζ']·P_ι[ι']`.
pub fn create_p(p_delta: &DVector<f64>, p_zeta: &DMatrix<f64>, p_iota: &DVector<f64>) -> Tensor4 {
    let shape = [p_delta.len(), p_zeta.nrows(), p_zeta.ncols(), p_iota.len()];
    Tensor4::from_shape_fn(shape, |(delta, zeta, zeta_next, iota_next)| {
        p_delta[delta] * p_zeta[(zeta, zeta_next)] * p_iota[iota_next]
    })
}
