//! Stationary solution of a heterogeneous-agent invention model with Knightian uncertainty.
//!
//! Households alternate between two decisions. Given wealth `w`, productivity
//! `ζ` and invention state `ι`, they pick net investment `k̃` (value function
//! `V1`). Given `k̃`, they split it between risky capital and a borrowing
//! position `b` (value function `V2`). Households in an inventing state earn a
//! payoff `Γ*` when an invention succeeds, and they are ambiguity averse about
//! the success probability `π`: continuation values are evaluated under the
//! worst belief in an α-contamination interval around `π`.
//!
//! The crate provides
//!
//! - validated model construction (`model` module),
//! - precomputed utility, wealth-transition and joint-transition arrays
//!   (`grids` module),
//! - the ambiguity operator over invention outcomes (`ambiguity` module),
//! - value function iteration over `(V1, V2)` (`vfi` module), and
//! - Monte Carlo simulation of a household panel under the solved policies
//!   (`simulation` module).
//!
//! # Quick start
//!
//! ```no_run
//! use knightian::{KnightianModel, SolverOptions};
//! use nalgebra::DVector;
//!
//! let model = KnightianModel::builder()
//!     .alpha(0.25)
//!     .beta(0.9)
//!     .w_vals(DVector::from_vec(vec![0.0, 1.0, 2.0, 4.0, 8.0]))
//!     .build()
//!     .expect("valid calibration");
//!
//! let solution = model
//!     .solve_with_options(&SolverOptions::default().with_tolerance(1e-6))
//!     .expect("finite values");
//! println!(
//!     "{:?} after {} iterations (residual {:e})",
//!     solution.summary.status, solution.summary.iterations, solution.summary.residual
//! );
//! ```

pub mod ambiguity;
pub mod error;
pub mod grids;
pub mod interpolation;
pub mod model;
pub mod simulation;
pub mod solving;
pub mod tensor;
pub mod utility;
pub mod vfi;

pub use ambiguity::InventionAggregator;
pub use error::{KnightianError, Result};
pub use model::{KnightianModel, KnightianModelBuilder};
pub use simulation::{simulate, Panel, SimulationOptions};
pub use solving::{SolveStatus, SolveSummary, SolverOptions};
pub use tensor::{IndexTensor3, Tensor3, Tensor4};
pub use utility::{Crra, LogUtility, Utility};
pub use vfi::{solve_dp_vi, Precomputed, Solution};
