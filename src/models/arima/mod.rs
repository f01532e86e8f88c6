//! Seasonal ARIMA building blocks.
//!
//! This module provides:
//! - `SarimaSpec`: orders (p, d, q)(P, D, Q)\[s\] and the mean flag
//! - Backshift polynomials and differencing
//! - A stability-preserving parametrization of the ARMA polynomials
//! - An exact Kalman filter for the likelihood of stationary ARMA errors

mod diff;
mod kalman;
mod params;
mod polynomial;
mod spec;

pub use diff::{apply_differencing, difference, differencing_polynomial, seasonal_difference};
pub use kalman::ArmaFilter;
pub use params::{coefficients_to_pacf, pacf_to_coefficients, ArmaParameters};
pub use polynomial::BackshiftPolynomial;
pub use spec::SarimaSpec;
