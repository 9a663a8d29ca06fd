//! Household model parameters and their validation.

use std::fmt;
use std::sync::Arc;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::ambiguity::InventionAggregator;
use crate::error::{KnightianError, Result};
use crate::grids::{linspace, StateGrids, DEFAULT_MIN_C};
use crate::solving::SolverOptions;
use crate::tensor::Tensor3;
use crate::utility::{LogUtility, Utility};
use crate::vfi::{solve_dp_vi, Solution};

/// Slack allowed when checking that a distribution sums to one.
const DISTRIBUTION_TOLERANCE: f64 = 1e-8;

/// Validated households problem with Knightian uncertainty over invention success.
#[derive(Clone)]
pub struct KnightianModel {
    grids: StateGrids,
    b_vals: DVector<f64>,
    delta_vals: DVector<f64>,
    p_delta: DVector<f64>,
    p_zeta: DMatrix<f64>,
    p_iota: DVector<f64>,
    alpha: f64,
    beta: f64,
    pi: f64,
    r: f64,
    gross_return: f64,
    wage: f64,
    gamma_star: f64,
    min_c: f64,
    utility: Arc<dyn Utility>,
}

impl fmt::Debug for KnightianModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnightianModel")
            .field("grids", &self.grids)
            .field("b_vals", &self.b_vals)
            .field("delta_vals", &self.delta_vals)
            .field("p_delta", &self.p_delta)
            .field("p_zeta", &self.p_zeta)
            .field("p_iota", &self.p_iota)
            .field("alpha", &self.alpha)
            .field("beta", &self.beta)
            .field("pi", &self.pi)
            .field("r", &self.r)
            .field("gross_return", &self.gross_return)
            .field("wage", &self.wage)
            .field("gamma_star", &self.gamma_star)
            .field("min_c", &self.min_c)
            .finish_non_exhaustive()
    }
}

impl KnightianModel {
    /// Start from the default calibration.
    pub fn builder() -> KnightianModelBuilder {
        KnightianModelBuilder::default()
    }

    /// Solves with default [`SolverOptions`] from an all-zero initial guess.
    pub fn solve(&self) -> Result<Solution> {
        self.solve_with_options(&SolverOptions::default())
    }

    /// Solves from an all-zero initial guess.
    pub fn solve_with_options(&self, options: &SolverOptions) -> Result<Solution> {
        solve_dp_vi(self, options, None)
    }

    /// Solves starting from the supplied value functions.
    pub fn solve_from(&self, v1: &Tensor3, v2: &Tensor3, options: &SolverOptions) -> Result<Solution> {
        solve_dp_vi(self, options, Some((v1, v2)))
    }

    pub fn grids(&self) -> &StateGrids {
        &self.grids
    }

    pub fn w_vals(&self) -> &DVector<f64> {
        &self.grids.w_vals
    }

    pub fn zeta_vals(&self) -> &DVector<f64> {
        &self.grids.zeta_vals
    }

    pub fn iota_vals(&self) -> &DVector<f64> {
        &self.grids.iota_vals
    }

    pub fn k_tilde_vals(&self) -> &DVector<f64> {
        &self.grids.k_tilde_vals
    }

    /// Borrowing action nodes.
    pub fn b_vals(&self) -> &DVector<f64> {
        &self.b_vals
    }

    /// Depreciation shock nodes.
    pub fn delta_vals(&self) -> &DVector<f64> {
        &self.delta_vals
    }

    pub fn p_delta(&self) -> &DVector<f64> {
        &self.p_delta
    }

    /// Transition matrix of ζ; row `i` is the distribution of next ζ given ζ index `i`.
    pub fn p_zeta(&self) -> &DMatrix<f64> {
        &self.p_zeta
    }

    pub fn p_iota(&self) -> &DVector<f64> {
        &self.p_iota
    }

    /// Ambiguity aversion, the weight of the contaminating beliefs.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Discount factor.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Objective probability of a successful invention.
    pub fn pi(&self) -> f64 {
        self.pi
    }

    /// Return on capital, scaled by the depreciation shock.
    pub fn r(&self) -> f64 {
        self.r
    }

    /// Gross return `R` on the borrowing position.
    pub fn gross_return(&self) -> f64 {
        self.gross_return
    }

    pub fn wage(&self) -> f64 {
        self.wage
    }

    /// Payoff `Γ*` of a successful invention.
    pub fn gamma_star(&self) -> f64 {
        self.gamma_star
    }

    /// Consumption floor applied before evaluating utility.
    pub fn min_c(&self) -> f64 {
        self.min_c
    }

    pub fn utility(&self) -> &dyn Utility {
        self.utility.as_ref()
    }

    /// Aggregator over invention outcomes implied by `π` and `α`.
    pub fn aggregator(&self) -> InventionAggregator {
        InventionAggregator::new(self.pi, self.alpha)
    }
}

/// Builder that validates grids, distributions and parameters before constructing
/// a [`KnightianModel`].
#[derive(Clone)]
pub struct KnightianModelBuilder {
    w_vals: DVector<f64>,
    zeta_vals: DVector<f64>,
    iota_vals: DVector<f64>,
    k_tilde_vals: DVector<f64>,
    b_vals: DVector<f64>,
    delta_vals: DVector<f64>,
    p_delta: DVector<f64>,
    p_zeta: DMatrix<f64>,
    p_iota: DVector<f64>,
    alpha: f64,
    beta: f64,
    pi: f64,
    r: f64,
    gross_return: f64,
    wage: f64,
    gamma_star: f64,
    min_c: f64,
    utility: Arc<dyn Utility>,
}

impl Default for KnightianModelBuilder {
    fn default() -> Self {
        Self {
            w_vals: linspace(0.0, 10.0, 40),
            zeta_vals: DVector::from_vec(vec![0.5, 1.0, 1.5]),
            iota_vals: DVector::from_vec(vec![0.0, 1.0]),
            k_tilde_vals: linspace(0.0, 5.0, 21),
            b_vals: linspace(0.0, 5.0, 21),
            delta_vals: DVector::from_vec(vec![0.85, 0.95, 1.05]),
            p_delta: DVector::from_vec(vec![0.25, 0.5, 0.25]),
            p_zeta: DMatrix::from_row_slice(
                3,
                3,
                &[0.8, 0.15, 0.05, 0.1, 0.8, 0.1, 0.05, 0.15, 0.8],
            ),
            p_iota: DVector::from_vec(vec![0.5, 0.5]),
            alpha: 0.5,
            beta: 0.95,
            pi: 0.3,
            r: 0.04,
            gross_return: 1.02,
            wage: 1.0,
            gamma_star: 5.0,
            min_c: DEFAULT_MIN_C,
            utility: Arc::new(LogUtility),
        }
    }
}

impl KnightianModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wealth grid.
    pub fn w_vals(mut self, nodes: DVector<f64>) -> Self {
        self.w_vals = nodes;
        self
    }

    /// Sets the productivity grid `ζ`.
    pub fn zeta_vals(mut self, nodes: DVector<f64>) -> Self {
        self.zeta_vals = nodes;
        self
    }

    /// Sets the invention-state grid `ι`.
    pub fn iota_vals(mut self, nodes: DVector<f64>) -> Self {
        self.iota_vals = nodes;
        self
    }

    /// Sets the net investment grid `k̃`.
    pub fn k_tilde_vals(mut self, nodes: DVector<f64>) -> Self {
        self.k_tilde_vals = nodes;
        self
    }

    /// Sets the borrowing grid `b`.
    pub fn b_vals(mut self, nodes: DVector<f64>) -> Self {
        self.b_vals = nodes;
        self
    }

    /// Sets the depreciation shock grid `δ`.
    pub fn delta_vals(mut self, nodes: DVector<f64>) -> Self {
        self.delta_vals = nodes;
        self
    }

    pub fn p_delta(mut self, probabilities: DVector<f64>) -> Self {
        self.p_delta = probabilities;
        self
    }

    pub fn p_zeta(mut self, transition: DMatrix<f64>) -> Self {
        self.p_zeta = transition;
        self
    }

    pub fn p_iota(mut self, probabilities: DVector<f64>) -> Self {
        self.p_iota = probabilities;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn pi(mut self, pi: f64) -> Self {
        self.pi = pi;
        self
    }

    pub fn r(mut self, r: f64) -> Self {
        self.r = r;
        self
    }

    pub fn gross_return(mut self, gross_return: f64) -> Self {
        self.gross_return = gross_return;
        self
    }

    pub fn wage(mut self, wage: f64) -> Self {
        self.wage = wage;
        self
    }

    pub fn gamma_star(mut self, gamma_star: f64) -> Self {
        self.gamma_star = gamma_star;
        self
    }

    pub fn min_c(mut self, min_c: f64) -> Self {
        self.min_c = min_c;
        self
    }

    /// Replaces the period utility function (log utility by default).
    pub fn utility<U: Utility + 'static>(mut self, utility: U) -> Self {
        self.utility = Arc::new(utility);
        self
    }

    /// Finalizes construction after validating grids, distributions and parameters.
    pub fn build(self) -> Result<KnightianModel> {
        validate_grid("w_vals", &self.w_vals)?;
        validate_grid("zeta_vals", &self.zeta_vals)?;
        validate_grid("iota_vals", &self.iota_vals)?;
        validate_grid("k_tilde_vals", &self.k_tilde_vals)?;
        validate_grid("b_vals", &self.b_vals)?;
        validate_grid("delta_vals", &self.delta_vals)?;

        // Entry and sum checks run before shape checks so that a malformed
        // distribution is reported as such whatever its length.
        validate_distribution("P_delta", 0, self.p_delta.as_slice())?;
        for (row_index, row) in self.p_zeta.row_iter().enumerate() {
            let row: Vec<f64> = row.iter().copied().collect();
            validate_distribution("P_zeta", row_index, &row)?;
        }
        validate_distribution("P_iota", 0, self.p_iota.as_slice())?;

        if self.p_delta.len() != self.delta_vals.len() {
            return Err(KnightianError::dimension_mismatch(
                "P_delta length",
                self.delta_vals.len(),
                self.p_delta.len(),
            ));
        }
        let n_zeta = self.zeta_vals.len();
        if self.p_zeta.nrows() != n_zeta {
            return Err(KnightianError::dimension_mismatch(
                "P_zeta rows",
                n_zeta,
                self.p_zeta.nrows(),
            ));
        }
        if self.p_zeta.ncols() != n_zeta {
            return Err(KnightianError::dimension_mismatch(
                "P_zeta columns",
                n_zeta,
                self.p_zeta.ncols(),
            ));
        }
        if self.p_iota.len() != self.iota_vals.len() {
            return Err(KnightianError::dimension_mismatch(
                "P_iota length",
                self.iota_vals.len(),
                self.p_iota.len(),
            ));
        }

        validate_unit_interval("alpha", self.alpha)?;
        validate_unit_interval("beta", self.beta)?;
        validate_unit_interval("pi", self.pi)?;
        validate_finite("r", self.r)?;
        validate_finite("gross_return", self.gross_return)?;
        validate_finite("wage", self.wage)?;
        validate_finite("gamma_star", self.gamma_star)?;
        validate_finite("min_c", self.min_c)?;
        if self.min_c <= 0.0 {
            return Err(KnightianError::invalid_parameter(
                "min_c",
                self.min_c,
                "consumption floor must be strictly positive",
            ));
        }
        if !self.utility.utility(self.min_c).is_finite() {
            return Err(KnightianError::invalid_parameter(
                "min_c",
                self.min_c,
                "utility must be finite at the consumption floor",
            ));
        }

        debug!(
            "built model with |w|={} |zeta|={} |iota|={} |k_tilde|={} |b|={} |delta|={}",
            self.w_vals.len(),
            n_zeta,
            self.iota_vals.len(),
            self.k_tilde_vals.len(),
            self.b_vals.len(),
            self.delta_vals.len()
        );

        Ok(KnightianModel {
            grids: StateGrids::new(self.w_vals, self.zeta_vals, self.iota_vals, self.k_tilde_vals),
            b_vals: self.b_vals,
            delta_vals: self.delta_vals,
            p_delta: self.p_delta,
            p_zeta: self.p_zeta,
            p_iota: self.p_iota,
            alpha: self.alpha,
            beta: self.beta,
            pi: self.pi,
            r: self.r,
            gross_return: self.gross_return,
            wage: self.wage,
            gamma_star: self.gamma_star,
            min_c: self.min_c,
            utility: self.utility,
        })
    }
}

fn validate_grid(name: &'static str, nodes: &DVector<f64>) -> Result<()> {
    if nodes.is_empty() {
        return Err(KnightianError::EmptyGrid { name });
    }
    for (index, node) in nodes.iter().enumerate() {
        if !node.is_finite() {
            return Err(KnightianError::invalid_parameter(
                name,
                *node,
                "grid nodes must be finite",
            ));
        }
        if index > 0 && *node <= nodes[index - 1] {
            return Err(KnightianError::UnsortedGrid { name, index });
        }
    }
    Ok(())
}

fn validate_distribution(name: &'static str, row: usize, probabilities: &[f64]) -> Result<()> {
    for (index, value) in probabilities.iter().enumerate() {
        let reason = if !value.is_finite() {
            "probabilities must be finite"
        } else if *value < 0.0 {
            "probabilities must be non-negative"
        } else if *value > 1.0 {
            "probabilities must not exceed one"
        } else {
            continue;
        };
        return Err(KnightianError::InvalidDistribution {
            name,
            index,
            value: *value,
            reason,
        });
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(KnightianError::InvalidDistributionSum { name, row, sum });
    }
    Ok(())
}

fn validate_unit_interval(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(KnightianError::invalid_parameter(
            name,
            value,
            "must lie in [0, 1]",
        ));
    }
    Ok(())
}

fn validate_finite(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(KnightianError::invalid_parameter(
            name,
            value,
            "must be finite",
        ));
    }
    Ok(())
}
