//! Differencing utilities for ARIMA models.

use super::polynomial::BackshiftPolynomial;
use super::spec::SarimaSpec;

/// Apply differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Differencing order (number of times to difference)
///
/// # Returns
/// The differenced series.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || series.is_empty() {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply seasonal differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Seasonal differencing order
/// * `period` - Seasonal period
///
/// # Returns
/// The seasonally differenced series.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 || period == 0 || series.len() <= period {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            break;
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// `(1 - B)^d (1 - B^s)^D` for the orders of `spec`.
pub fn differencing_polynomial(spec: &SarimaSpec) -> BackshiftPolynomial {
    BackshiftPolynomial::difference(1, spec.d)
        .times(&BackshiftPolynomial::difference(spec.period, spec.cap_d))
}

/// Apply the regular and seasonal differences of `spec`.
///
/// The result has `len - d - D*s` values.
pub fn apply_differencing(series: &[f64], spec: &SarimaSpec) -> Vec<f64> {
    differencing_polynomial(spec).apply(series)
}
