//! Regression models with seasonal ARIMA errors.
//!
//! This module provides:
//! - Regression variables (outliers, calendar effects, user variables)
//! - `ModelDescription`: series, transformation, orders and variables
//! - Exact ML estimation with GLS concentration of the regression coefficients
//! - `RegArimaModelling`: the versioned context mutated during identification

mod context;
mod description;
mod estimation;
mod variables;

pub use context::RegArimaModelling;
pub use description::{ModelDescription, RegressionData, Transformation, MEAN_NAME};
pub use estimation::{
    concentrated_likelihood, ConcentratedLikelihood, RegArimaEstimation, RegArimaEstimator,
    MAX_AR_PACF,
};
pub use variables::{
    Capability, OutlierKey, OutlierType, Provenance, Variable, VariableKind, TC_RATE,
};
