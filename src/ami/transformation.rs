//! Log/level pre-test.

use crate::models::regarima::{ModelDescription, RegArimaEstimator, Transformation};

/// Likelihoods of the model fitted on levels and on logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLevelTest {
    /// Log-likelihood on levels.
    pub level: Option<f64>,
    /// Jacobian-corrected log-likelihood on logs.
    pub log: Option<f64>,
}

impl LogLevelTest {
    /// Logs are chosen only when strictly more likely than levels.
    pub fn choice(&self) -> Transformation {
        match (self.level, self.log) {
            (Some(level), Some(log)) if log > level => Transformation::Log,
            (None, Some(_)) => Transformation::Log,
            _ => Transformation::None,
        }
    }
}

/// Fit the orders of `description` on levels and on logs.
///
/// Regression variables are ignored. Series with non-positive values are
/// always modelled in levels.
pub fn test_log_level(description: &ModelDescription, precision: f64) -> LogLevelTest {
    let spec = *description.spec();
    let estimator = RegArimaEstimator::new(precision);
    let base = ModelDescription::new(description.series().clone(), spec);

    let fit = |d: &ModelDescription| {
        estimator
            .estimate(&d.regression_data(), &spec, None, d.log_jacobian())
            .filter(|e| e.log_likelihood().is_finite())
            .map(|e| e.log_likelihood())
    };

    let level = fit(&base);
    let mut logged = base;
    let log = match logged.set_transformation(Transformation::Log) {
        Ok(()) => fit(&logged),
        Err(_) => None,
    };
    LogLevelTest { level, log }
}
