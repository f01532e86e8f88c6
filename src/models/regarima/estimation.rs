//! Exact maximum likelihood estimation of regression models with ARMA errors.
//!
//! For given ARMA parameters the data and every regression column are
//! passed through the same Kalman filter; the regression coefficients are
//! then concentrated out by least squares on the filtered data (GLS). The
//! ARMA parameters maximize the resulting concentrated likelihood, which is
//! a sum of squares problem solved with Levenberg-Marquardt.

use super::description::{RegressionData, MEAN_NAME};
use crate::models::arima::{ArmaFilter, ArmaParameters, SarimaSpec};
use crate::utils::ols::ols_fit;
use crate::utils::optimization::{levenberg_marquardt, LevenbergMarquardtConfig};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Largest admissible absolute partial autocorrelation of AR polynomials.
pub const MAX_AR_PACF: f64 = 0.9999;

/// Concentrated likelihood at fixed ARMA parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentratedLikelihood {
    /// Number of observations after differencing.
    pub observations: usize,
    /// Sum of squared standardized residuals.
    pub ssq: f64,
    /// `sum ln F_t` of the Kalman filter.
    pub log_det: f64,
    /// Log-likelihood (without transformation Jacobian).
    pub log_likelihood: f64,
    /// GLS regression coefficients.
    pub coefficients: Vec<f64>,
    /// `(X'V^-1 X)^-1` for unit innovation variance.
    pub unscaled_covariance: Vec<Vec<f64>>,
    /// Standardized GLS residuals.
    pub residuals: Vec<f64>,
}

impl ConcentratedLikelihood {
    /// ML estimate of the innovation variance, determinant corrected.
    pub fn sigma2_ml(&self) -> f64 {
        let m = self.observations as f64;
        self.ssq * (self.log_det / m).exp() / m
    }

    /// Unbiased residual variance `ssq / (m - k)`.
    pub fn sigma2(&self) -> f64 {
        let dof = self.observations.saturating_sub(self.coefficients.len()).max(1);
        self.ssq / dof as f64
    }

    /// Covariance of the regression coefficients.
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        let sigma2 = self.sigma2();
        self.unscaled_covariance
            .iter()
            .map(|row| row.iter().map(|v| v * sigma2).collect())
            .collect()
    }

    /// Standard error of coefficient `i`.
    pub fn standard_error(&self, i: usize) -> f64 {
        self.unscaled_covariance
            .get(i)
            .and_then(|row| row.get(i))
            .map(|v| (v * self.sigma2()).sqrt())
            .unwrap_or(f64::NAN)
    }

    /// t-statistic of coefficient `i`.
    pub fn t_stat(&self, i: usize) -> f64 {
        match self.coefficients.get(i) {
            Some(b) => b / self.standard_error(i),
            None => f64::NAN,
        }
    }
}

/// Concentrated likelihood of `data` for the given ARMA parameters.
///
/// Returns `None` when the filter cannot be built or the regression is singular.
pub fn concentrated_likelihood(
    data: &RegressionData,
    params: &ArmaParameters,
) -> Option<ConcentratedLikelihood> {
    let m = data.observations();
    if m == 0 || data.x.len() >= m {
        return None;
    }
    let filter = ArmaFilter::new(params, m)?;
    let ey = filter.filter(&data.y);
    let ex: Vec<Vec<f64>> = data
        .x
        .iter()
        .zip(&data.x_start)
        .map(|(column, start)| filter.filter_from(column, *start))
        .collect();
    let ols = ols_fit(&ey, &ex).ok()?;

    let log_det = filter.log_det();
    let mf = m as f64;
    if ols.ssq <= 0.0 || !ols.ssq.is_finite() {
        return None;
    }
    let log_likelihood = -0.5 * mf * ((2.0 * PI).ln() + 1.0 + (ols.ssq / mf).ln()) - 0.5 * log_det;

    Some(ConcentratedLikelihood {
        observations: m,
        ssq: ols.ssq,
        log_det,
        log_likelihood,
        coefficients: ols.coefficients,
        unscaled_covariance: ols.unscaled_covariance,
        residuals: ols.residuals,
    })
}

/// Result of the estimation of a RegARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegArimaEstimation {
    pub spec: SarimaSpec,
    pub parameters: ArmaParameters,
    pub likelihood: ConcentratedLikelihood,
    /// Coefficient names, in the order of `likelihood.coefficients`.
    pub coefficient_names: Vec<String>,
    /// Whether the optimizer met the requested precision.
    pub converged: bool,
    pub iterations: usize,
    /// Precision the model was estimated with.
    pub precision: f64,
    /// Log-Jacobian of the series transformation.
    pub log_jacobian: f64,
}

impl RegArimaEstimation {
    pub fn narma(&self) -> usize {
        self.spec.narma()
    }

    /// Number of estimated regression coefficients.
    pub fn nx(&self) -> usize {
        self.likelihood.coefficients.len()
    }

    /// Number of observations after differencing.
    pub fn observations(&self) -> usize {
        self.likelihood.observations
    }

    /// Log-likelihood of the untransformed series.
    pub fn log_likelihood(&self) -> f64 {
        self.likelihood.log_likelihood + self.log_jacobian
    }

    /// Number of parameters including the innovation variance.
    pub fn parameter_count(&self) -> usize {
        self.narma() + self.nx() + 1
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.parameter_count() as f64
    }

    pub fn bic(&self) -> f64 {
        let m = self.observations() as f64;
        -2.0 * self.log_likelihood() + self.parameter_count() as f64 * m.ln()
    }

    /// Corrected BIC: `ln(sigma2_ml) + (narma + nx) ln(m) / m`.
    pub fn bicc(&self) -> f64 {
        let m = self.observations() as f64;
        self.likelihood.sigma2_ml().ln() + (self.narma() + self.nx()) as f64 * m.ln() / m
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.index_of(name)
            .and_then(|i| self.likelihood.coefficients.get(i).copied())
    }

    pub fn t_stat(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.likelihood.t_stat(i))
    }

    /// t-statistic of the mean, if the model has one.
    pub fn mean_t_stat(&self) -> Option<f64> {
        self.t_stat(MEAN_NAME)
    }

    /// Converged, with AR polynomials strictly inside the stationarity region.
    pub fn is_valid(&self) -> bool {
        self.converged && self.parameters.max_ar_pacf() <= MAX_AR_PACF
    }
}

/// Levenberg-Marquardt estimator of RegARIMA models.
#[derive(Debug, Clone)]
pub struct RegArimaEstimator {
    /// Relative decrease of the objective below which the optimizer stops.
    pub precision: f64,
    /// Maximum number of optimizer iterations.
    pub max_iter: usize,
}

impl Default for RegArimaEstimator {
    fn default() -> Self {
        Self {
            precision: 1e-7,
            max_iter: 100,
        }
    }
}

impl RegArimaEstimator {
    pub fn new(precision: f64) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }

    /// Estimate the model; `start` is used as starting point when it has the
    /// orders of `spec`.
    ///
    /// Returns `None` if the likelihood cannot be evaluated at all.
    pub fn estimate(
        &self,
        data: &RegressionData,
        spec: &SarimaSpec,
        start: Option<&ArmaParameters>,
        log_jacobian: f64,
    ) -> Option<RegArimaEstimation> {
        let m = data.observations();
        if m <= data.x.len() + spec.narma() {
            return None;
        }

        let initial = start
            .filter(|p| p.matches(spec))
            .and_then(|p| p.to_unconstrained())
            .unwrap_or_else(|| {
                ArmaParameters::initial(spec)
                    .to_unconstrained()
                    .unwrap_or_else(|| vec![0.0; spec.narma()])
            });

        let objective = |u: &[f64]| {
            let params = ArmaParameters::from_unconstrained(spec, u);
            let likelihood = concentrated_likelihood(data, &params)?;
            let scale = (likelihood.log_det / (2.0 * m as f64)).exp();
            Some(likelihood.residuals.iter().map(|e| e * scale).collect::<Vec<f64>>())
        };

        let config = LevenbergMarquardtConfig {
            max_iter: self.max_iter,
            precision: self.precision,
            ..Default::default()
        };
        let result = levenberg_marquardt(objective, &initial, &config)?;

        let parameters = ArmaParameters::from_unconstrained(spec, &result.optimal_point);
        let likelihood = concentrated_likelihood(data, &parameters)?;

        Some(RegArimaEstimation {
            spec: *spec,
            parameters,
            likelihood,
            coefficient_names: data.names.clone(),
            converged: result.converged,
            iterations: result.iterations,
            precision: self.precision,
            log_jacobian,
        })
    }
}
