use approx::assert_relative_eq;
use knightian::tensor::all_finite;
use knightian::{KnightianModel, SolveStatus, SolverOptions, Tensor3};
use nalgebra::{DMatrix, DVector};

const BETA: f64 = 0.9;
const PI: f64 = 0.35;
const WAGE: f64 = 1.0;
const R: f64 = 0.04;
const GROSS_RETURN: f64 = 1.02;
const GAMMA_STAR: f64 = 1.5;
const MIN_C: f64 = 1e-20;

const W_VALS: [f64; 3] = [0.5, 1.5, 3.0];
const ZETA_VALS: [f64; 2] = [0.5, 1.0];
const IOTA_VALS: [f64; 2] = [0.0, 1.0];
const K_VALS: [f64; 2] = [0.0, 0.75];
const B_VALS: [f64; 3] = [0.0, 0.5, 1.0];
const DELTA_VALS: [f64; 2] = [0.9, 1.1];
const P_DELTA: [f64; 2] = [0.5, 0.5];
const P_ZETA: [[f64; 2]; 2] = [[0.7, 0.3], [0.4, 0.6]];
const P_IOTA: [f64; 2] = [0.6, 0.4];

fn small_model(alpha: f64, gamma_star: f64) -> KnightianModel {
    KnightianModel::builder()
        .w_vals(DVector::from_row_slice(&W_VALS))
        .zeta_vals(DVector::from_row_slice(&ZETA_VALS))
        .iota_vals(DVector::from_row_slice(&IOTA_VALS))
        .k_tilde_vals(DVector::from_row_slice(&K_VALS))
        .b_vals(DVector::from_row_slice(&B_VALS))
        .delta_vals(DVector::from_row_slice(&DELTA_VALS))
        .p_delta(DVector::from_row_slice(&P_DELTA))
        .p_zeta(DMatrix::from_row_slice(2, 2, &[0.7, 0.3, 0.4, 0.6]))
        .p_iota(DVector::from_row_slice(&P_IOTA))
        .alpha(alpha)
        .beta(BETA)
        .pi(PI)
        .wage(WAGE)
        .r(R)
        .gross_return(GROSS_RETURN)
        .gamma_star(gamma_star)
        .min_c(MIN_C)
        .build()
        .expect("valid small model")
}

fn clamped_interp(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let mut i = 0;
    while xs[i + 1] < x {
        i += 1;
    }
    ys[i] + (x - xs[i]) / (xs[i + 1] - xs[i]) * (ys[i + 1] - ys[i])
}

/// Straightforward Bellman iteration with a plain expectation over invention outcomes.
fn reference_plain_solve() -> (Vec<f64>, Vec<f64>) {
    let (n_w, n_zeta, n_iota, n_k, n_b) = (3, 2, 2, 2, 3);
    let mut v1 = vec![0.0; n_iota * n_zeta * n_w];
    let mut v2 = vec![0.0; n_zeta * n_k * n_iota];

    for _ in 0..5_000 {
        let expected = |zeta: usize, k: usize, b: usize, payoff: f64, v1: &[f64]| {
            let mut total = 0.0;
            for (delta_index, delta) in DELTA_VALS.iter().enumerate() {
                let next_w = (1.0 + R) * delta * K_VALS[k]
                    + (GROSS_RETURN - (1.0 + R) * delta) * B_VALS[b]
                    + payoff;
                for zeta_next in 0..n_zeta {
                    for iota_next in 0..n_iota {
                        let start = (iota_next * n_zeta + zeta_next) * n_w;
                        let row = &v1[start..start + n_w];
                        total += P_DELTA[delta_index]
                            * P_ZETA[zeta][zeta_next]
                            * P_IOTA[iota_next]
                            * clamped_interp(&W_VALS, row, next_w);
                    }
                }
            }
            total
        };

        let mut new_v2 = vec![f64::NEG_INFINITY; v2.len()];
        for zeta in 0..n_zeta {
            for k in 0..n_k {
                for iota in 0..n_iota {
                    for b in 0..n_b {
                        let failure = expected(zeta, k, b, 0.0, &v1);
                        let value = if iota == 0 {
                            failure
                        } else {
                            let success = expected(zeta, k, b, GAMMA_STAR, &v1);
                            PI * success + (1.0 - PI) * failure
                        };
                        let slot = &mut new_v2[(zeta * n_k + k) * n_iota + iota];
                        *slot = slot.max(value);
                    }
                }
            }
        }

        let mut new_v1 = vec![f64::NEG_INFINITY; v1.len()];
        for iota in 0..n_iota {
            for zeta in 0..n_zeta {
                for w in 0..n_w {
                    for k in 0..n_k {
                        let mut consumption = W_VALS[w] - K_VALS[k];
                        if iota == 0 {
                            consumption += ZETA_VALS[zeta] * WAGE;
                        }
                        let value = consumption.max(MIN_C).ln()
                            + BETA * new_v2[(zeta * n_k + k) * n_iota + iota];
                        let slot = &mut new_v1[(iota * n_zeta + zeta) * n_w + w];
                        *slot = slot.max(value);
                    }
                }
            }
        }

        let gap = v1
            .iter()
            .zip(&new_v1)
            .chain(v2.iter().zip(&new_v2))
            .fold(0.0_f64, |acc, (old, new)| acc.max((old - new).abs()));
        v1 = new_v1;
        v2 = new_v2;
        if gap < 1e-13 {
            break;
        }
    }
    (v1, v2)
}

fn tight() -> SolverOptions {
    SolverOptions::default()
        .with_tolerance(1e-12)
        .with_max_iterations(5_000)
}

#[test]
fn zero_ambiguity_matches_plain_expectation_reference() {
    let model = small_model(0.0, GAMMA_STAR);
    let solution = model.solve_with_options(&tight()).unwrap();
    assert_eq!(solution.summary.status, SolveStatus::Converged);

    let (v1_reference, v2_reference) = reference_plain_solve();
    for (solved, reference) in solution.v1.iter().zip(&v1_reference) {
        assert_relative_eq!(*solved, *reference, epsilon = 1e-8);
    }
    for (solved, reference) in solution.v2.iter().zip(&v2_reference) {
        assert_relative_eq!(*solved, *reference, epsilon = 1e-8);
    }
}

#[test]
fn resolving_from_the_fixed_point_takes_one_iteration() {
    let model = small_model(0.4, GAMMA_STAR);
    let options = tight();
    let solution = model.solve_with_options(&options).unwrap();
    assert!(solution.summary.converged());

    let again = model
        .solve_from(&solution.v1, &solution.v2, &options)
        .unwrap();
    assert_eq!(again.summary.iterations, 1);
    assert_eq!(again.summary.status, SolveStatus::Converged);
    assert!(again.summary.residual < options.tolerance);
    assert_eq!(again.k_tilde_policy, solution.k_tilde_policy);
}

#[test]
fn ambiguity_aversion_lowers_values() {
    let plain = small_model(0.0, GAMMA_STAR)
        .solve_with_options(&tight())
        .unwrap();
    let averse = small_model(0.6, GAMMA_STAR)
        .solve_with_options(&tight())
        .unwrap();

    for (a, p) in averse.v1.iter().zip(plain.v1.iter()) {
        assert!(*a <= *p + 1e-9, "ambiguity raised V1: {a} > {p}");
    }
    for (a, p) in averse.v2.iter().zip(plain.v2.iter()) {
        assert!(*a <= *p + 1e-9, "ambiguity raised V2: {a} > {p}");
    }
    // The labor-income slice of V2 never attempts an invention, yet it still
    // feels ambiguity through future invention states.
    let strictly_lower = averse
        .v2
        .iter()
        .zip(plain.v2.iter())
        .any(|(a, p)| *a < *p - 1e-9);
    assert!(strictly_lower);
}

#[test]
fn ambiguity_is_irrelevant_without_an_invention_payoff() {
    let plain = small_model(0.0, 0.0).solve_with_options(&tight()).unwrap();
    let averse = small_model(0.9, 0.0).solve_with_options(&tight()).unwrap();
    for (a, p) in averse.v1.iter().zip(plain.v1.iter()) {
        assert_relative_eq!(*a, *p, epsilon = 1e-10);
    }
}

#[test]
fn iteration_cap_is_reported_not_raised() {
    let model = small_model(0.3, GAMMA_STAR);
    let options = SolverOptions::default()
        .with_tolerance(1e-14)
        .with_max_iterations(3);
    let solution = model.solve_with_options(&options).unwrap();

    assert_eq!(solution.summary.status, SolveStatus::MaxIterationsReached);
    assert_eq!(solution.summary.iterations, 3);
    assert!(solution.summary.residual > options.tolerance);
    assert!(all_finite(&solution.v1));
}

#[test]
fn value_functions_increase_with_wealth() {
    let model = small_model(0.3, GAMMA_STAR);
    let solution = model.solve_with_options(&tight()).unwrap();
    let (n_iota, n_zeta, n_w) = solution.v1.dim();
    for iota in 0..n_iota {
        for zeta in 0..n_zeta {
            for w in 1..n_w {
                assert!(solution.v1[[iota, zeta, w]] >= solution.v1[[iota, zeta, w - 1]]);
            }
        }
    }
}

#[test]
fn initial_guess_with_wrong_shape_is_rejected() {
    let model = small_model(0.3, GAMMA_STAR);
    let v1 = Tensor3::zeros((1, 1, 1));
    let v2 = Tensor3::zeros(model.grids().v2_shape());
    let err = model.solve_from(&v1, &v2, &tight()).unwrap_err();
    assert!(err.is_shape_mismatch());
}

#[test]
fn summary_serializes_with_status() {
    let model = small_model(0.3, GAMMA_STAR);
    let solution = model
        .solve_with_options(&SolverOptions::default().with_max_iterations(2))
        .unwrap();
    let json = serde_json::to_string(&solution.summary).unwrap();
    assert!(json.contains("\"iterations\":2"));
    assert!(json.contains("MaxIterationsReached"));
}

fn one_node_model() -> KnightianModel {
    let node = |value: f64| DVector::from_vec(vec![value]);
    KnightianModel::builder()
        .w_vals(node(2.0))
        .zeta_vals(node(1.0))
        .iota_vals(node(0.0))
        .k_tilde_vals(node(1.0))
        .b_vals(node(0.5))
        .delta_vals(node(1.0))
        .p_delta(node(1.0))
        .p_zeta(DMatrix::from_element(1, 1, 1.0))
        .p_iota(node(1.0))
        .alpha(0.5)
        .beta(BETA)
        .wage(WAGE)
        .build()
        .expect("valid one-node model")
}

#[test]
fn one_node_model_converges_to_perpetual_utility() {
    let model = one_node_model();
    let solution = model.solve_with_options(&tight()).unwrap();
    assert_eq!(solution.summary.status, SolveStatus::Converged);
    assert_eq!(solution.v1.dim(), (1, 1, 1));
    assert_eq!(solution.v2.dim(), (1, 1, 1));

    // Consumption w - k + ζ·wage = 2 every period.
    let flow = 2.0_f64.ln();
    assert_relative_eq!(solution.v1[[0, 0, 0]], flow / (1.0 - BETA), epsilon = 1e-9);
    assert_relative_eq!(solution.v2[[0, 0, 0]], flow / (1.0 - BETA), epsilon = 1e-9);
    assert_eq!(solution.k_tilde_policy[[0, 0, 0]], 0);
    assert_eq!(solution.b_policy[[0, 0, 0]], 0);
}

fn single_iota_model(alpha: f64) -> KnightianModel {
    KnightianModel::builder()
        .w_vals(DVector::from_row_slice(&W_VALS))
        .zeta_vals(DVector::from_row_slice(&ZETA_VALS))
        .iota_vals(DVector::from_vec(vec![0.0]))
        .k_tilde_vals(DVector::from_row_slice(&K_VALS))
        .b_vals(DVector::from_row_slice(&B_VALS))
        .delta_vals(DVector::from_row_slice(&DELTA_VALS))
        .p_delta(DVector::from_row_slice(&P_DELTA))
        .p_zeta(DMatrix::from_row_slice(2, 2, &[0.7, 0.3, 0.4, 0.6]))
        .p_iota(DVector::from_vec(vec![1.0]))
        .alpha(alpha)
        .beta(BETA)
        .pi(PI)
        .wage(WAGE)
        .r(R)
        .gross_return(GROSS_RETURN)
        .gamma_star(GAMMA_STAR)
        .build()
        .expect("valid single invention-state model")
}

#[test]
fn single_invention_state_never_sees_the_payoff() {
    let plain = single_iota_model(0.0)
        .solve_with_options(&tight())
        .unwrap();
    let averse = single_iota_model(0.9)
        .solve_with_options(&tight())
        .unwrap();
    assert!(plain.summary.converged());
    assert!(averse.summary.converged());
    assert_eq!(plain.v1.dim(), (1, 2, 3));
    assert_eq!(plain.v2.dim(), (2, 2, 1));

    for (a, p) in averse.v1.iter().zip(plain.v1.iter()) {
        assert_relative_eq!(*a, *p, epsilon = 1e-10);
    }
    for (a, p) in averse.v2.iter().zip(plain.v2.iter()) {
        assert_relative_eq!(*a, *p, epsilon = 1e-10);
    }
    assert_eq!(averse.b_policy, plain.b_policy);
    assert_eq!(averse.k_tilde_policy, plain.k_tilde_policy);
}
