//! Description of a RegARIMA model: series, transformation, ARIMA orders
//! and regression variables.

use super::variables::{OutlierKey, Provenance, Variable};
use crate::core::TsData;
use crate::error::{ModellingError, Result};
use crate::models::arima::{apply_differencing, SarimaSpec};
use serde::{Deserialize, Serialize};

/// Transformation applied to the series before modelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Transformation {
    #[default]
    None,
    Log,
}

/// Regression problem in the differenced domain.
#[derive(Debug, Clone)]
pub struct RegressionData {
    /// Differenced (and fixed-effect corrected) observations.
    pub y: Vec<f64>,
    /// Differenced regression columns; the mean, when present, comes first.
    pub x: Vec<Vec<f64>>,
    /// Index of the first non-zero value of each column.
    pub x_start: Vec<usize>,
    /// Coefficient name of each column.
    pub names: Vec<String>,
}

impl RegressionData {
    /// Pure ARMA problem on already stationary data.
    pub fn arma(y: Vec<f64>) -> Self {
        Self {
            y,
            x: Vec::new(),
            x_start: Vec::new(),
            names: Vec::new(),
        }
    }

    pub fn observations(&self) -> usize {
        self.y.len()
    }
}

/// Series, transformation, SARIMA orders and an ordered, name-unique set of
/// regression variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    series: TsData,
    transformation: Transformation,
    values: Vec<f64>,
    spec: SarimaSpec,
    variables: Vec<Variable>,
}

/// Name of the mean coefficient.
pub const MEAN_NAME: &str = "mean";

impl ModelDescription {
    /// Description of `series` (untransformed) with the given orders.
    pub fn new(series: TsData, spec: SarimaSpec) -> Self {
        let values = series.values().to_vec();
        Self {
            series,
            transformation: Transformation::None,
            values,
            spec,
            variables: Vec::new(),
        }
    }

    /// The original series.
    pub fn series(&self) -> &TsData {
        &self.series
    }

    /// Observations after transformation.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn period(&self) -> usize {
        self.spec.period
    }

    pub fn spec(&self) -> &SarimaSpec {
        &self.spec
    }

    pub fn transformation(&self) -> Transformation {
        self.transformation
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub(crate) fn set_spec(&mut self, spec: SarimaSpec) {
        self.spec = spec;
    }

    /// # Errors
    /// `InvalidParameter` when a log transformation is requested on a series
    /// holding non-positive values.
    pub(crate) fn set_transformation(&mut self, transformation: Transformation) -> Result<()> {
        if transformation == Transformation::Log && !self.series.is_positive() {
            return Err(ModellingError::InvalidParameter(
                "log transformation requires strictly positive data".into(),
            ));
        }
        self.transformation = transformation;
        self.values = match transformation {
            Transformation::None => self.series.values().to_vec(),
            Transformation::Log => self.series.values().iter().map(|v| v.ln()).collect(),
        };
        Ok(())
    }

    /// Log-Jacobian of the transformation (`-sum ln y` for logs).
    pub fn log_jacobian(&self) -> f64 {
        match self.transformation {
            Transformation::None => 0.0,
            Transformation::Log => -self.series.values().iter().map(|v| v.ln()).sum::<f64>(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name() == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    /// # Errors
    /// `DuplicateVariable` if the name is taken, `DimensionMismatch` if the
    /// columns do not match the series length.
    pub(crate) fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.contains(variable.name()) {
            return Err(ModellingError::DuplicateVariable(variable.name().to_string()));
        }
        if let Some(column) = variable.columns().iter().find(|c| c.len() != self.len()) {
            return Err(ModellingError::DimensionMismatch {
                expected: self.len(),
                got: column.len(),
            });
        }
        self.variables.push(variable);
        Ok(())
    }

    pub(crate) fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let index = self.variables.iter().position(|v| v.name() == name)?;
        Some(self.variables.remove(index))
    }

    /// Remove every automatically identified outlier; user outliers stay.
    pub(crate) fn remove_automatic_outliers(&mut self) -> usize {
        let before = self.variables.len();
        self.variables.retain(|v| !v.is_automatic_outlier());
        before - self.variables.len()
    }

    /// Keys of all outliers (automatic and user).
    pub fn outlier_keys(&self) -> Vec<OutlierKey> {
        self.variables.iter().filter_map(|v| v.outlier_key()).collect()
    }

    /// Number of automatically identified outliers.
    pub fn automatic_outlier_count(&self) -> usize {
        self.variables.iter().filter(|v| v.is_automatic_outlier()).count()
    }

    /// Number of user-supplied outliers.
    pub fn user_outlier_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.outlier_key().is_some() && v.provenance() == Provenance::User)
            .count()
    }

    /// Number of estimated regression coefficients (mean included).
    pub fn free_regressor_count(&self) -> usize {
        let vars: usize = self
            .variables
            .iter()
            .filter(|v| v.is_free())
            .map(|v| v.dim())
            .sum();
        vars + usize::from(self.spec.mean)
    }

    /// Sum of the effects of variables with fixed coefficients.
    pub fn fixed_effects(&self) -> Vec<f64> {
        let mut effect = vec![0.0; self.len()];
        for variable in &self.variables {
            if let Some(coefficients) = variable.fixed_coefficients() {
                for (column, b) in variable.columns().iter().zip(coefficients) {
                    for (e, x) in effect.iter_mut().zip(column) {
                        *e += b * x;
                    }
                }
            }
        }
        effect
    }

    /// Build the differenced regression problem.
    pub fn regression_data(&self) -> RegressionData {
        let fixed = self.fixed_effects();
        let corrected: Vec<f64> = self.values.iter().zip(&fixed).map(|(y, f)| y - f).collect();
        let y = apply_differencing(&corrected, &self.spec);
        let m = y.len();

        let mut x = Vec::new();
        let mut names = Vec::new();
        if self.spec.mean {
            x.push(vec![1.0; m]);
            names.push(MEAN_NAME.to_string());
        }
        for variable in self.variables.iter().filter(|v| v.is_free()) {
            for (column, name) in variable.columns().iter().zip(variable.coefficient_names()) {
                x.push(apply_differencing(column, &self.spec));
                names.push(name);
            }
        }
        let x_start = x
            .iter()
            .map(|c| c.iter().position(|v| *v != 0.0).unwrap_or(c.len()))
            .collect();

        RegressionData {
            y,
            x,
            x_start,
            names,
        }
    }

    /// Series corrected for the given regression effects (mean excluded).
    ///
    /// `coefficients` follows the layout of [`ModelDescription::regression_data`].
    pub fn linearize(&self, coefficients: &[f64]) -> Vec<f64> {
        let mut linearized: Vec<f64> = self
            .values
            .iter()
            .zip(self.fixed_effects())
            .map(|(y, f)| y - f)
            .collect();
        let mut index = usize::from(self.spec.mean);
        for variable in self.variables.iter().filter(|v| v.is_free()) {
            for column in variable.columns() {
                if let Some(b) = coefficients.get(index) {
                    for (l, x) in linearized.iter_mut().zip(column) {
                        *l -= b * x;
                    }
                }
                index += 1;
            }
        }
        linearized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::regarima::variables::OutlierType;
    use approx::assert_relative_eq;

    fn description() -> ModelDescription {
        let series = TsData::monthly(2000, (1..=48).map(|i| 100.0 + i as f64).collect()).unwrap();
        ModelDescription::new(series, SarimaSpec::airline(12))
    }

    #[test]
    fn duplicate_variables_rejected() {
        let mut desc = description();
        let key = OutlierKey::new(OutlierType::AO, 10);
        desc.add_variable(Variable::outlier(key, 48, 12, Provenance::Automatic))
            .unwrap();
        let again = desc.add_variable(Variable::outlier(key, 48, 12, Provenance::Automatic));
        assert!(matches!(again, Err(ModellingError::DuplicateVariable(_))));
    }

    #[test]
    fn automatic_outliers_removed_user_kept() {
        let mut desc = description();
        desc.add_variable(Variable::outlier(
            OutlierKey::new(OutlierType::AO, 10),
            48,
            12,
            Provenance::Automatic,
        ))
        .unwrap();
        desc.add_variable(Variable::outlier(
            OutlierKey::new(OutlierType::LS, 20),
            48,
            12,
            Provenance::User,
        ))
        .unwrap();
        assert_eq!(desc.remove_automatic_outliers(), 1);
        assert_eq!(desc.outlier_keys(), vec![OutlierKey::new(OutlierType::LS, 20)]);
        assert_eq!(desc.user_outlier_count(), 1);
    }

    #[test]
    fn regression_data_layout() {
        let mut desc = description();
        desc.set_spec(SarimaSpec::airline(12).with_mean(true));
        desc.add_variable(Variable::outlier(
            OutlierKey::new(OutlierType::AO, 30),
            48,
            12,
            Provenance::Automatic,
        ))
        .unwrap();
        let data = desc.regression_data();
        assert_eq!(data.y.len(), 35);
        assert_eq!(data.x.len(), 2);
        assert_eq!(data.names, vec!["mean".to_string(), "AO (30)".to_string()]);
        // AO at 30 first appears at differenced index 30 - 13
        assert_eq!(data.x_start, vec![0, 17]);
        // a linear trend differenced twice is zero
        assert!(data.y.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn log_transformation() {
        let mut desc = description();
        desc.set_transformation(Transformation::Log).unwrap();
        assert_relative_eq!(desc.values()[0], 101.0f64.ln());
        assert!(desc.log_jacobian() < 0.0);

        let negative = TsData::monthly(2000, vec![1.0, -1.0, 2.0]).unwrap();
        let mut desc = ModelDescription::new(negative, SarimaSpec::airline(12));
        assert!(desc.set_transformation(Transformation::Log).is_err());
    }

    #[test]
    fn fixed_variables_and_linearization() {
        let mut desc = description();
        let ao = Variable::outlier(OutlierKey::new(OutlierType::AO, 5), 48, 12, Provenance::User)
            .with_fixed_coefficients(vec![10.0])
            .unwrap();
        desc.add_variable(ao).unwrap();
        desc.add_variable(Variable::outlier(
            OutlierKey::new(OutlierType::AO, 6),
            48,
            12,
            Provenance::Automatic,
        ))
        .unwrap();
        assert_eq!(desc.free_regressor_count(), 1);
        let lin = desc.linearize(&[3.0]);
        assert_relative_eq!(lin[5], 106.0 - 10.0);
        assert_relative_eq!(lin[6], 107.0 - 3.0);
        assert_relative_eq!(lin[7], 108.0);
    }
}
