//! Ordinary least squares on column-major design matrices.
//!
//! Used for GLS concentration of the regression coefficients (on the
//! Kalman-filtered data), the seasonality F-test and the outlier
//! t-statistics. Normal equations are solved with a Cholesky factorization.

use crate::error::{ModellingError, Result};

/// Relative pivot below which the cross-product matrix is considered singular.
const SINGULARITY_TOLERANCE: f64 = 1e-11;

/// Result of a least-squares fit `y = X b + e`.
#[derive(Debug, Clone)]
pub struct OLSResult {
    /// Regression coefficients (one per column of X).
    pub coefficients: Vec<f64>,
    /// Residuals `y - X b`.
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub ssq: f64,
    /// `(X'X)^-1`, the unscaled covariance of the coefficients.
    pub unscaled_covariance: Vec<Vec<f64>>,
}

impl OLSResult {
    /// Get the number of regressors.
    pub fn num_regressors(&self) -> usize {
        self.coefficients.len()
    }

    /// Covariance of the coefficients for the residual variance `sigma2`.
    pub fn covariance(&self, sigma2: f64) -> Vec<Vec<f64>> {
        self.unscaled_covariance
            .iter()
            .map(|row| row.iter().map(|v| v * sigma2).collect())
            .collect()
    }
}

/// Fit `y = X b` without intercept; `x` holds the columns of X.
///
/// With no columns the residuals are `y` itself.
///
/// # Errors
/// `DimensionMismatch` if a column length differs from `y`,
/// `InsufficientData` if there are more columns than observations,
/// `SingularMatrix` if the columns are (numerically) collinear.
pub fn ols_fit(y: &[f64], x: &[Vec<f64>]) -> Result<OLSResult> {
    let n = y.len();
    let k = x.len();

    if n == 0 {
        return Err(ModellingError::InsufficientData { needed: 1, got: 0 });
    }
    for column in x {
        if column.len() != n {
            return Err(ModellingError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }
    if k == 0 {
        return Ok(OLSResult {
            coefficients: vec![],
            residuals: y.to_vec(),
            ssq: y.iter().map(|v| v * v).sum(),
            unscaled_covariance: vec![],
        });
    }
    if k > n {
        return Err(ModellingError::InsufficientData { needed: k, got: n });
    }

    // X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in 0..=i {
            let s: f64 = x[i].iter().zip(x[j].iter()).map(|(a, b)| a * b).sum();
            xtx[i][j] = s;
            xtx[j][i] = s;
        }
        xty[i] = x[i].iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    }

    let l = cholesky(&xtx).ok_or(ModellingError::SingularMatrix)?;
    let coefficients = solve_cholesky(&l, &xty);

    let mut residuals = y.to_vec();
    for (column, b) in x.iter().zip(coefficients.iter()) {
        for (r, v) in residuals.iter_mut().zip(column.iter()) {
            *r -= b * v;
        }
    }
    let ssq = residuals.iter().map(|r| r * r).sum();

    Ok(OLSResult {
        coefficients,
        residuals,
        ssq,
        unscaled_covariance: invert_cholesky(&l),
    })
}

/// Cholesky decomposition `A = L L'` of a symmetric positive definite matrix.
///
/// Returns `None` when a pivot is not positive relative to the diagonal scale.
pub fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if n == 0 || scale == 0.0 || !scale.is_finite() {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= SINGULARITY_TOLERANCE * scale {
                    return None; // Not positive definite
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L L' x = b` given the Cholesky factor `L`.
pub fn solve_cholesky(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }
    x
}

/// Inverse of `L L'` given the Cholesky factor `L`.
pub fn invert_cholesky(l: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = l.len();
    let mut inverse = vec![vec![0.0; n]; n];
    let mut unit = vec![0.0; n];
    for j in 0..n {
        unit.iter_mut().for_each(|u| *u = 0.0);
        unit[j] = 1.0;
        let column = solve_cholesky(l, &unit);
        for i in 0..n {
            inverse[i][j] = column[i];
        }
    }
    inverse
}

/// Solve the symmetric positive definite system `A x = b`.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    if a.len() != b.len() {
        return None;
    }
    cholesky(a).map(|l| solve_cholesky(&l, b))
}

/// Quadratic form `b' A^-1 b` (Wald statistic for a coefficient block).
pub fn wald_statistic(coefficients: &[f64], covariance: &[Vec<f64>]) -> Option<f64> {
    let solved = solve_symmetric(covariance, coefficients)?;
    Some(
        coefficients
            .iter()
            .zip(solved.iter())
            .map(|(b, s)| b * s)
            .sum(),
    )
}
