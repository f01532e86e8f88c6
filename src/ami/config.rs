//! Configuration of the automatic model identification.

use crate::calendar::TradingDaysType;
use crate::error::{ModellingError, Result};
use crate::models::arima::SarimaSpec;
use crate::models::regarima::{OutlierKey, OutlierType};
use serde::{Deserialize, Serialize};

/// Lower bound of the outlier critical value.
pub const MINCV: f64 = 2.0;
/// Proportional reduction of the critical value after a rejected round.
pub const CV_REDUCTION: f64 = 0.12;
/// Increase of the Ljung-Box confidence level after the first pass.
pub const FIRST_PASS_INCREMENT: f64 = 0.025;
/// Increase of the Ljung-Box confidence level after later passes.
pub const PASS_INCREMENT: f64 = 0.015;
/// Upper bound of the Ljung-Box confidence level.
pub const MAXIMUM_ACCEPTANCE: f64 = 0.999;
/// Last pass before the fallback model is forced.
pub const MAX_PASS: usize = 3;
/// Hard cap on the number of evaluated rounds.
pub const MAX_ITERATIONS: usize = 10;
/// Dispersion ratio required to accept one more difference.
pub const DIFFERENCING_RATIO: f64 = 1.2;
/// Maximum regular differencing order.
pub const MAX_D: usize = 2;
/// Maximum seasonal differencing order.
pub const MAX_BD: usize = 1;
/// |t| above which a mean (or a calendar effect) is significant.
pub const T_THRESHOLD: f64 = 1.96;
/// BICC tolerance inside which the more parsimonious ARMA model wins.
pub const ARMA_PARSIMONY: f64 = 0.01;
/// Relative increase of the standard error tolerated between passes.
pub const SE_TOLERANCE: f64 = 0.01;
/// Maximum number of automatically identified outliers.
pub const MAX_OUTLIERS: usize = 50;
/// Maximum number of forward steps of the outlier search.
pub const MAX_OUTLIER_ROUNDS: usize = 100;
/// Significance level of the seasonality pre-test.
pub const SEASONALITY_PVALUE: f64 = 0.01;

/// Default critical value for a series of `n` observations.
///
/// 3.3 up to 50 observations, 4.3 from 450 on, linear in between.
pub fn calc_cv(n: usize) -> f64 {
    if n <= 50 {
        3.3
    } else if n < 450 {
        3.3 + 0.0025 * (n - 50) as f64
    } else {
        4.3
    }
}

/// Transformation of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransformSpec {
    /// Model the levels.
    #[default]
    None,
    /// Model the logarithms.
    Log,
    /// Choose between levels and logs by likelihood.
    Auto,
}

/// How the trading-day regressors are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradingDaysMode {
    /// Use the configured regressors unconditionally.
    #[default]
    Default,
    /// Test the 7- and 2-group schemes with an F-test, keep the better one.
    AutomaticF,
    /// Test the 7- and 2-group schemes with a Wald test, keep the better one.
    AutomaticWald,
}

impl TradingDaysMode {
    pub fn is_automatic(&self) -> bool {
        !matches!(self, TradingDaysMode::Default)
    }
}

/// Configuration of the automatic model identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmiSpec {
    /// Search differencing and ARMA orders.
    pub auto_modelling: bool,
    /// Search outliers.
    pub outlier_detection: bool,
    /// Outlier critical value; `None` derives it from the series length.
    pub critical_value: Option<f64>,
    /// Outlier types searched.
    pub outlier_types: Vec<OutlierType>,
    /// Outliers supplied by the user (never removed).
    pub prespecified_outliers: Vec<OutlierKey>,
    /// Ljung-Box confidence level: a model is accepted when the p-value is
    /// at least `1 - ljung_box_acceptance`.
    pub ljung_box_acceptance: f64,
    /// Modulus above which an estimated factor is treated as a unit root.
    pub unit_root_threshold: f64,
    /// Precision of the final estimation.
    pub precision: f64,
    /// Precision of the estimations made during the search.
    pub intermediate_precision: f64,
    pub transform: TransformSpec,
    pub trading_days: TradingDaysType,
    pub trading_days_mode: TradingDaysMode,
    /// Add a length-of-period regressor together with the trading days.
    pub leap_year: bool,
    /// Significance level of the joint trading-day tests.
    pub regression_test_pvalue: f64,
    pub easter: bool,
    /// Keep the Easter effect only when significant.
    pub easter_test: bool,
    /// Length in days of the pre-Easter window.
    pub easter_duration: usize,
    /// Stop at the airline model when its residuals are acceptable.
    pub accept_default_airline: bool,
    /// Starting orders replacing the airline model.
    pub initial_model: Option<SarimaSpec>,
}

impl Default for AmiSpec {
    fn default() -> Self {
        Self {
            auto_modelling: true,
            outlier_detection: true,
            critical_value: None,
            outlier_types: vec![OutlierType::AO, OutlierType::LS, OutlierType::TC],
            prespecified_outliers: Vec::new(),
            ljung_box_acceptance: 0.95,
            unit_root_threshold: 0.97,
            precision: 1e-7,
            intermediate_precision: 5e-4,
            transform: TransformSpec::None,
            trading_days: TradingDaysType::None,
            trading_days_mode: TradingDaysMode::Default,
            leap_year: false,
            regression_test_pvalue: 0.01,
            easter: false,
            easter_test: true,
            easter_duration: 6,
            accept_default_airline: false,
            initial_model: None,
        }
    }
}

impl AmiSpec {
    /// Fixed model: no search at all, a single estimation.
    pub fn fixed() -> Self {
        Self {
            auto_modelling: false,
            outlier_detection: false,
            ..Default::default()
        }
    }

    pub fn with_auto_modelling(mut self, auto_modelling: bool) -> Self {
        self.auto_modelling = auto_modelling;
        self
    }

    pub fn with_outlier_detection(mut self, outlier_detection: bool) -> Self {
        self.outlier_detection = outlier_detection;
        self
    }

    pub fn with_critical_value(mut self, critical_value: f64) -> Self {
        self.critical_value = Some(critical_value);
        self
    }

    pub fn with_outlier_types(mut self, types: Vec<OutlierType>) -> Self {
        self.outlier_types = types;
        self
    }

    pub fn with_prespecified_outliers(mut self, outliers: Vec<OutlierKey>) -> Self {
        self.prespecified_outliers = outliers;
        self
    }

    pub fn with_ljung_box_acceptance(mut self, pcr: f64) -> Self {
        self.ljung_box_acceptance = pcr;
        self
    }

    pub fn with_unit_root_threshold(mut self, threshold: f64) -> Self {
        self.unit_root_threshold = threshold;
        self
    }

    pub fn with_precision(mut self, precision: f64, intermediate: f64) -> Self {
        self.precision = precision;
        self.intermediate_precision = intermediate;
        self
    }

    pub fn with_transform(mut self, transform: TransformSpec) -> Self {
        self.transform = transform;
        self
    }

    /// Trading-day regressors and how they are selected.
    pub fn with_trading_days(mut self, kind: TradingDaysType, mode: TradingDaysMode) -> Self {
        self.trading_days = kind;
        self.trading_days_mode = mode;
        self
    }

    pub fn with_leap_year(mut self, leap_year: bool) -> Self {
        self.leap_year = leap_year;
        self
    }

    pub fn with_easter(mut self, duration: usize) -> Self {
        self.easter = true;
        self.easter_duration = duration;
        self
    }

    pub fn with_accept_default_airline(mut self, accept: bool) -> Self {
        self.accept_default_airline = accept;
        self
    }

    pub fn with_initial_model(mut self, spec: SarimaSpec) -> Self {
        self.initial_model = Some(spec);
        self
    }

    /// Whether some trading-day regressor is requested.
    pub fn uses_trading_days(&self) -> bool {
        self.trading_days != TradingDaysType::None || self.trading_days_mode.is_automatic()
    }

    /// No search and no test: the model is estimated once.
    pub fn is_fully_specified(&self) -> bool {
        !self.auto_modelling
            && !self.outlier_detection
            && !self.trading_days_mode.is_automatic()
            && !(self.easter && self.easter_test)
            && self.transform != TransformSpec::Auto
    }

    /// Reject inconsistent settings for a series of the given frequency.
    pub fn validate(&self, frequency: usize) -> Result<()> {
        if self.precision.is_nan() || self.precision <= 0.0 {
            return Err(ModellingError::InvalidParameter(format!(
                "precision must be positive, got {}",
                self.precision
            )));
        }
        if self.intermediate_precision < self.precision {
            return Err(ModellingError::InvalidParameter(
                "intermediate precision must not be finer than the final precision".into(),
            ));
        }
        if !(self.ljung_box_acceptance > 0.0 && self.ljung_box_acceptance < 1.0) {
            return Err(ModellingError::InvalidParameter(format!(
                "Ljung-Box acceptance must be in (0, 1), got {}",
                self.ljung_box_acceptance
            )));
        }
        if !(self.unit_root_threshold > 0.0 && self.unit_root_threshold < 1.0) {
            return Err(ModellingError::InvalidParameter(format!(
                "unit root threshold must be in (0, 1), got {}",
                self.unit_root_threshold
            )));
        }
        if !(self.regression_test_pvalue > 0.0 && self.regression_test_pvalue < 1.0) {
            return Err(ModellingError::InvalidParameter(format!(
                "regression test p-value must be in (0, 1), got {}",
                self.regression_test_pvalue
            )));
        }
        if let Some(cv) = self.critical_value {
            if cv.is_nan() || cv < MINCV {
                return Err(ModellingError::InvalidParameter(format!(
                    "critical value must be at least {}, got {}",
                    MINCV, cv
                )));
            }
        }
        if self.outlier_detection && self.outlier_types.is_empty() {
            return Err(ModellingError::InvalidParameter(
                "outlier detection without outlier types".into(),
            ));
        }
        if self.uses_trading_days() && frequency < 4 {
            return Err(ModellingError::InvalidParameter(format!(
                "trading days require at least quarterly data, got frequency {}",
                frequency
            )));
        }
        if self.easter && self.easter_duration == 0 {
            return Err(ModellingError::InvalidParameter(
                "Easter duration must be positive".into(),
            ));
        }
        if let Some(spec) = &self.initial_model {
            let too_large = spec.d > MAX_D
                || spec.cap_d > MAX_BD
                || spec.p > 3
                || spec.q > 3
                || spec.cap_p > 1
                || spec.cap_q > 1;
            if too_large {
                return Err(ModellingError::InvalidParameter(format!(
                    "initial model {} outside the searchable orders",
                    spec
                )));
            }
        }
        Ok(())
    }
}
