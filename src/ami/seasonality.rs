//! Pre-test for the presence of seasonality.
//!
//! The first difference of the series is regressed on a full set of
//! seasonal dummies; the joint F-test of equal dummy coefficients decides
//! whether seasonal terms are worth modelling at all.

use super::config::SEASONALITY_PVALUE;
use crate::models::arima::difference;
use crate::utils::ols_fit;
use crate::validation::fisher_sf;

/// Outcome of the seasonal dummies F-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalityTest {
    pub statistic: f64,
    pub p_value: f64,
    /// Whether the series is considered seasonal.
    pub seasonal: bool,
}

impl SeasonalityTest {
    fn undetermined() -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            seasonal: true,
        }
    }
}

/// F-test of seasonal dummies on the first difference of `values`.
///
/// Series too short for the test are considered seasonal, so that the
/// default seasonal model is kept.
pub fn test_seasonality(values: &[f64], period: usize) -> SeasonalityTest {
    if period <= 1 {
        return SeasonalityTest {
            statistic: 0.0,
            p_value: 1.0,
            seasonal: false,
        };
    }
    let dy = difference(values, 1);
    let n = dy.len();
    if n < 2 * period + 1 {
        return SeasonalityTest::undetermined();
    }

    // `values[0]` is lost by differencing: dy[i] is at position i + 1.
    let dummies: Vec<Vec<f64>> = (0..period)
        .map(|s| {
            (0..n)
                .map(|i| if (i + 1) % period == s { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();
    let Ok(full) = ols_fit(&dy, &dummies) else {
        return SeasonalityTest::undetermined();
    };
    let mean = dy.iter().sum::<f64>() / n as f64;
    let restricted: f64 = dy.iter().map(|v| (v - mean).powi(2)).sum();

    let df1 = period - 1;
    let df2 = n - period;
    if full.ssq <= 0.0 {
        // Perfectly periodic differences.
        let seasonal = restricted > 0.0;
        return SeasonalityTest {
            statistic: if seasonal { f64::INFINITY } else { 0.0 },
            p_value: if seasonal { 0.0 } else { 1.0 },
            seasonal,
        };
    }
    let statistic = ((restricted - full.ssq) / df1 as f64) / (full.ssq / df2 as f64);
    let p_value = fisher_sf(statistic, df1, df2);
    SeasonalityTest {
        statistic,
        p_value,
        seasonal: p_value < SEASONALITY_PVALUE,
    }
}
