//! Optimization utilities for parameter estimation.

use super::ols::solve_symmetric;

/// Result of Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// Sum of squared residuals at the optimal point.
    pub optimal_value: f64,
    /// Residuals at the optimal point.
    pub residuals: Vec<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the algorithm converged.
    pub converged: bool,
}

/// Configuration for Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtConfig {
    /// Maximum number of outer iterations.
    pub max_iter: usize,
    /// Relative decrease of the objective below which the search stops.
    pub precision: f64,
    /// Initial damping factor (default: 1e-3).
    pub initial_lambda: f64,
    /// Damping factor beyond which no further progress is attempted.
    pub max_lambda: f64,
    /// Relative step used for the finite-difference Jacobian.
    pub epsilon: f64,
}

impl Default for LevenbergMarquardtConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            precision: 1e-7,
            initial_lambda: 1e-3,
            max_lambda: 1e10,
            epsilon: 1e-6,
        }
    }
}

impl LevenbergMarquardtConfig {
    /// Config with the given convergence precision.
    pub fn with_precision(precision: f64) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Minimize a sum of squared residuals with Levenberg-Marquardt.
///
/// The residual function returns `None` for points outside its domain;
/// such trial steps are rejected and the damping increased.
///
/// # Arguments
/// * `residuals` - Function mapping a parameter vector to residuals
/// * `initial` - Initial guess (must lie inside the domain)
/// * `config` - Configuration parameters
///
/// # Returns
/// `None` if the residuals cannot be evaluated at `initial`, otherwise the
/// best point found with its convergence flag.
///
/// # Example
/// ```
/// use anofox_tramo::utils::optimization::{levenberg_marquardt, LevenbergMarquardtConfig};
///
/// // Fit y = a * exp(b * t)
/// let t = [0.0, 1.0, 2.0, 3.0];
/// let y: Vec<f64> = t.iter().map(|x: &f64| 2.0 * (0.5 * x).exp()).collect();
/// let result = levenberg_marquardt(
///     |p| Some(t.iter().zip(&y).map(|(x, v)| p[0] * (p[1] * x).exp() - v).collect()),
///     &[1.0, 0.1],
///     &LevenbergMarquardtConfig::default(),
/// )
/// .unwrap();
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// ```
pub fn levenberg_marquardt<F>(
    residuals: F,
    initial: &[f64],
    config: &LevenbergMarquardtConfig,
) -> Option<LevenbergMarquardtResult>
where
    F: Fn(&[f64]) -> Option<Vec<f64>>,
{
    let n = initial.len();
    let mut x = initial.to_vec();
    let mut r = residuals(&x)?;
    let mut value = sum_of_squares(&r);
    if !value.is_finite() {
        return None;
    }

    if n == 0 {
        return Some(LevenbergMarquardtResult {
            optimal_point: x,
            optimal_value: value,
            residuals: r,
            iterations: 0,
            converged: true,
        });
    }

    let mut lambda = config.initial_lambda;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let jacobian = forward_jacobian(&residuals, &x, &r, config.epsilon);

        // J'J and J'r
        let mut jtj = vec![vec![0.0; n]; n];
        let mut jtr = vec![0.0; n];
        for i in 0..n {
            for j in 0..=i {
                let s: f64 = jacobian[i].iter().zip(&jacobian[j]).map(|(a, b)| a * b).sum();
                jtj[i][j] = s;
                jtj[j][i] = s;
            }
            jtr[i] = jacobian[i].iter().zip(&r).map(|(a, b)| a * b).sum();
        }

        let gradient_norm = jtr.iter().map(|g| g.abs()).fold(0.0, f64::max);
        if gradient_norm <= f64::EPSILON * value.max(1.0) {
            converged = true;
            break;
        }

        // Inner loop: increase damping until a step decreases the objective.
        let mut improved = false;
        while lambda <= config.max_lambda {
            let mut damped = jtj.clone();
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] += lambda * (jtj[i][i] + 1e-12);
            }
            let rhs: Vec<f64> = jtr.iter().map(|g| -g).collect();

            let step = match solve_symmetric(&damped, &rhs) {
                Some(step) => step,
                None => {
                    lambda *= 10.0;
                    continue;
                }
            };

            let candidate: Vec<f64> = x.iter().zip(&step).map(|(a, b)| a + b).collect();
            if let Some(candidate_r) = residuals(&candidate) {
                let candidate_value = sum_of_squares(&candidate_r);
                if candidate_value.is_finite() && candidate_value < value {
                    let decrease = (value - candidate_value) / value.max(f64::MIN_POSITIVE);
                    x = candidate;
                    r = candidate_r;
                    value = candidate_value;
                    lambda = (lambda * 0.1).max(1e-12);
                    improved = true;
                    if decrease < config.precision {
                        converged = true;
                    }
                    break;
                }
            }
            lambda *= 10.0;
        }

        if !improved {
            // No descent direction left at this point.
            converged = true;
            break;
        }
        if converged {
            break;
        }
    }

    Some(LevenbergMarquardtResult {
        optimal_point: x,
        optimal_value: value,
        residuals: r,
        iterations,
        converged,
    })
}

/// Finite-difference Jacobian, one column per parameter.
///
/// Falls back to a backward difference when the forward point is outside
/// the domain; a column is zero when neither side can be evaluated.
fn forward_jacobian<F>(residuals: &F, x: &[f64], r: &[f64], epsilon: f64) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> Option<Vec<f64>>,
{
    let mut columns = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        let h = epsilon * x[i].abs().max(1.0);
        let mut shifted = x.to_vec();
        shifted[i] += h;
        let column = match residuals(&shifted) {
            Some(rh) if rh.len() == r.len() => {
                rh.iter().zip(r).map(|(a, b)| (a - b) / h).collect()
            }
            _ => {
                shifted[i] = x[i] - h;
                match residuals(&shifted) {
                    Some(rh) if rh.len() == r.len() => {
                        r.iter().zip(&rh).map(|(a, b)| (a - b) / h).collect()
                    }
                    _ => vec![0.0; r.len()],
                }
            }
        };
        columns.push(column);
    }
    columns
}
