//! Numerical utilities shared by the estimation and testing modules.

pub mod ols;
pub mod optimization;
pub mod stats;

pub use ols::{cholesky, ols_fit, solve_symmetric, wald_statistic, OLSResult};
pub use optimization::{levenberg_marquardt, LevenbergMarquardtConfig, LevenbergMarquardtResult};
pub use stats::{autocorrelations, mad, mean, median, robust_scale, skewness, variance};
