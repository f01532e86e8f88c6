//! Final model of an identification run.

use super::state::{AmiEvent, AmiStatus};
use super::statistics::ModelStatistics;
use crate::models::arima::SarimaSpec;
use crate::models::regarima::{ModelDescription, OutlierKey, RegArimaEstimation, Transformation};

/// Immutable result of [`AmiModule::process`](super::AmiModule::process).
#[derive(Debug, Clone)]
pub struct PreprocessingModel {
    pub description: ModelDescription,
    pub estimation: RegArimaEstimation,
    pub statistics: ModelStatistics,
    /// Transformed series corrected for every estimated regression effect
    /// except the mean.
    pub linearized: Vec<f64>,
    pub status: AmiStatus,
    /// Number of evaluated rounds.
    pub iterations: usize,
    /// Number of likelihood optimizations (candidate ARMA fits excluded).
    pub estimation_count: usize,
    /// Critical values used by the outlier search, in order.
    pub critical_values: Vec<f64>,
    pub events: Vec<AmiEvent>,
}

impl PreprocessingModel {
    pub fn spec(&self) -> &SarimaSpec {
        self.description.spec()
    }

    pub fn transformation(&self) -> Transformation {
        self.description.transformation()
    }

    /// All outliers of the model (automatic and user).
    pub fn outliers(&self) -> Vec<OutlierKey> {
        self.description.outlier_keys()
    }

    /// Outliers found by the automatic search.
    pub fn automatic_outliers(&self) -> Vec<OutlierKey> {
        self.description
            .variables()
            .iter()
            .filter(|v| v.is_automatic_outlier())
            .filter_map(|v| v.outlier_key())
            .collect()
    }

    /// Estimated coefficients with their names.
    pub fn coefficients(&self) -> Vec<(String, f64)> {
        self.estimation
            .coefficient_names
            .iter()
            .cloned()
            .zip(self.estimation.likelihood.coefficients.iter().copied())
            .collect()
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.estimation.coefficient(name)
    }

    /// Critical value used by the last outlier search.
    pub fn final_critical_value(&self) -> Option<f64> {
        self.critical_values.last().copied()
    }

    /// Residuals of the final estimation.
    pub fn residuals(&self) -> &[f64] {
        &self.estimation.likelihood.residuals
    }
}
