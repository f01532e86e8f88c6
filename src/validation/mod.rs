//! Statistical tests applied to model residuals.
//!
//! # Example
//!
//! ```
//! use anofox_tramo::validation::{ljung_box, ljung_box_lags};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, ljung_box_lags(1).min(5), 0);
//! assert!(lb.p_value >= 0.0 && lb.p_value <= 1.0);
//! ```

pub mod distributions;

pub use distributions::{chi_squared_sf, fisher_sf, normal_two_sided, students_t_two_sided};
pub use residual_tests::{
    ljung_box, ljung_box_lags, seasonal_ljung_box, skewness_test, split_sample_test,
    LjungBoxResult, SplitSampleResult, TestResult,
};
