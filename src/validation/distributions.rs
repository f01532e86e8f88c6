//! Tail probabilities of the reference distributions used by the tests.
//!
//! Thin wrappers over `statrs` that map degenerate inputs (non-finite
//! statistics, zero degrees of freedom) to a p-value of `NaN`.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

/// Upper-tail probability of a chi-squared(df) statistic.
pub fn chi_squared_sf(x: f64, df: usize) -> f64 {
    if !x.is_finite() || df == 0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail probability of an F(df1, df2) statistic.
pub fn fisher_sf(x: f64, df1: usize, df2: usize) -> f64 {
    if !x.is_finite() || df1 == 0 || df2 == 0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    match FisherSnedecor::new(df1 as f64, df2 as f64) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of an F statistic (variance-ratio test).
pub fn fisher_two_sided(x: f64, df1: usize, df2: usize) -> f64 {
    let upper = fisher_sf(x, df1, df2);
    if upper.is_nan() {
        return f64::NAN;
    }
    (2.0 * upper.min(1.0 - upper)).clamp(0.0, 1.0)
}

/// Two-sided p-value of a Student-t statistic with `df` degrees of freedom.
pub fn students_t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of a standard normal statistic.
pub fn normal_two_sided(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(dist) => (2.0 * dist.sf(z.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn chi_squared_known_values() {
        // chi-squared(2) is exponential with mean 2
        assert_relative_eq!(chi_squared_sf(2.0, 2), (-1.0f64).exp(), epsilon = 1e-10);
        assert_relative_eq!(chi_squared_sf(18.307, 10), 0.05, epsilon = 1e-3);
        assert_eq!(chi_squared_sf(0.0, 3), 1.0);
        assert!(chi_squared_sf(1.0, 0).is_nan());
    }

    #[test]
    fn fisher_known_values() {
        // F(1, inf-ish) ~ chi2(1): 3.84 -> 0.05
        assert_relative_eq!(fisher_sf(3.841, 1, 100_000), 0.05, epsilon = 1e-3);
        assert_relative_eq!(fisher_two_sided(1.0, 10, 10), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn two_sided_normal_and_t() {
        assert_relative_eq!(normal_two_sided(1.959964), 0.05, epsilon = 1e-5);
        assert_relative_eq!(normal_two_sided(0.0), 1.0);
        assert_relative_eq!(students_t_two_sided(2.228, 10.0), 0.05, epsilon = 1e-3);
        assert!(students_t_two_sided(1.0, 0.0).is_nan());
    }
}
