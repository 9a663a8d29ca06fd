//! Monte Carlo simulation of a household panel under solved policies.

use log::info;
use nalgebra::DVector;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution, WeightedIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{KnightianError, Result};
use crate::grids::create_next_w;
use crate::interpolation::nearest_index;
use crate::model::KnightianModel;
use crate::vfi::Solution;

/// Size and seeding of a simulated panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Number of simulated households.
    pub households: usize,
    /// Number of periods each household is moved forward.
    pub periods: usize,
    /// Base seed; household `h` draws from `seed + h`.
    pub seed: u64,
    /// Starting wealth of every household.
    pub initial_wealth: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            households: 1_000,
            periods: 100,
            seed: 1234,
            initial_wealth: 1.0,
        }
    }
}

impl SimulationOptions {
    pub fn with_households(mut self, households: usize) -> Self {
        self.households = households;
        self
    }

    pub fn with_periods(mut self, periods: usize) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_initial_wealth(mut self, initial_wealth: f64) -> Self {
        self.initial_wealth = initial_wealth;
        self
    }
}

/// Cross-section and aggregate paths of a simulated panel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Panel {
    /// Wealth of each household after the last period.
    pub final_wealth: Vec<f64>,
    /// Productivity index of each household after the last period.
    pub final_zeta: Vec<usize>,
    /// Invention-state index of each household after the last period.
    pub final_iota: Vec<usize>,
    /// Number of successful inventions per household.
    pub inventions: Vec<usize>,
    /// Cross-sectional mean wealth, starting with the initial period.
    pub mean_wealth_path: Vec<f64>,
}

impl Panel {
    /// Mean wealth after the last period.
    pub fn mean_wealth(&self) -> f64 {
        if self.final_wealth.is_empty() {
            return 0.0;
        }
        self.final_wealth.iter().sum::<f64>() / self.final_wealth.len() as f64
    }

    /// Successful inventions per household and period.
    pub fn invention_rate(&self) -> f64 {
        let periods = self.mean_wealth_path.len().saturating_sub(1);
        let exposure = periods * self.inventions.len();
        if exposure == 0 {
            return 0.0;
        }
        self.inventions.iter().sum::<usize>() as f64 / exposure as f64
    }
}

struct History {
    wealth_path: Vec<f64>,
    zeta: usize,
    iota: usize,
    inventions: usize,
}

fn weighted(probabilities: impl Iterator<Item = f64>) -> Result<WeightedIndex<f64>> {
    WeightedIndex::new(probabilities).map_err(|_| KnightianError::NumericalError {
        context: "simulation shock distribution",
    })
}

/// Simulates `options.households` households for `options.periods` periods.
///
/// Every household starts in the labor-income invention state and the first
/// productivity state. Policies are read at the wealth node nearest to the
/// household's current wealth.
pub fn simulate(
    model: &KnightianModel,
    solution: &Solution,
    options: &SimulationOptions,
) -> Result<Panel> {
    let grids = model.grids();
    if solution.k_tilde_policy.shape() != &grids.v1_shape()[..] {
        return Err(KnightianError::dimension_mismatch(
            "investment policy size",
            grids.v1_shape().iter().product(),
            solution.k_tilde_policy.len(),
        ));
    }
    if solution.b_policy.shape() != &grids.v2_shape()[..] {
        return Err(KnightianError::dimension_mismatch(
            "borrowing policy size",
            grids.v2_shape().iter().product(),
            solution.b_policy.len(),
        ));
    }
    if !options.initial_wealth.is_finite() {
        return Err(KnightianError::invalid_parameter(
            "initial_wealth",
            options.initial_wealth,
            "must be finite",
        ));
    }

    let delta_dist = weighted(model.p_delta().iter().copied())?;
    let iota_dist = weighted(model.p_iota().iter().copied())?;
    let zeta_dists = model
        .p_zeta()
        .row_iter()
        .map(|row| weighted(row.iter().copied()))
        .collect::<Result<Vec<_>>>()?;
    let success_dist = Bernoulli::new(model.pi()).map_err(|_| {
        KnightianError::invalid_parameter("pi", model.pi(), "must lie in [0, 1]")
    })?;
    let (next_w, next_w_star) = create_next_w(
        model.r(),
        model.delta_vals(),
        model.k_tilde_vals(),
        model.b_vals(),
        model.gross_return(),
        model.gamma_star(),
    );
    let w_vals: &DVector<f64> = model.w_vals();

    info!(
        "simulating {} households over {} periods",
        options.households, options.periods
    );

    let histories: Vec<History> = (0..options.households)
        .into_par_iter()
        .map(|household| {
            let mut rng = SmallRng::seed_from_u64(options.seed.wrapping_add(household as u64));
            let mut wealth = options.initial_wealth;
            let mut zeta = 0usize;
            let mut iota = 0usize;
            let mut inventions = 0usize;
            let mut wealth_path = Vec::with_capacity(options.periods + 1);
            wealth_path.push(wealth);

            for _ in 0..options.periods {
                let w = nearest_index(w_vals.as_slice(), wealth);
                let k = solution.k_tilde_policy[[iota, zeta, w]];
                let b = solution.b_policy[[zeta, k, iota]];
                let delta = delta_dist.sample(&mut rng);
                let success = iota != 0 && success_dist.sample(&mut rng);

                wealth = if success {
                    inventions += 1;
                    next_w_star[[delta, k, b]]
                } else {
                    next_w[[delta, k, b]]
                };
                zeta = zeta_dists[zeta].sample(&mut rng);
                iota = iota_dist.sample(&mut rng);
                wealth_path.push(wealth);
            }

            History {
                wealth_path,
                zeta,
                iota,
                inventions,
            }
        })
        .collect();

    let mut mean_wealth_path = vec![0.0; options.periods + 1];
    if !histories.is_empty() {
        let scale = 1.0 / histories.len() as f64;
        for history in &histories {
            for (mean, wealth) in mean_wealth_path.iter_mut().zip(&history.wealth_path) {
                *mean += scale * wealth;
            }
        }
    }

    Ok(Panel {
        final_wealth: histories
            .iter()
            .map(|history| history.wealth_path[options.periods])
            .collect(),
        final_zeta: histories.iter().map(|history| history.zeta).collect(),
        final_iota: histories.iter().map(|history| history.iota).collect(),
        inventions: histories.iter().map(|history| history.inventions).collect(),
        mean_wealth_path,
    })
}
