//! Diagnostics of a fitted model, used to accept or compare candidates.

use crate::models::arima::SarimaSpec;
use crate::models::regarima::{ModelDescription, RegArimaEstimation};
use crate::validation::{
    ljung_box, ljung_box_lags, seasonal_ljung_box, skewness_test, split_sample_test,
    LjungBoxResult, SplitSampleResult, TestResult,
};

/// How close an ARIMA specification is to the airline model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AirlineShape {
    Other,
    /// Same differencing as the airline with at most one extra regular term.
    QuasiAirline,
    /// `(0,1,1)(0,1,1)` (or `(0,1,1)` for non-seasonal data).
    Airline,
}

impl AirlineShape {
    pub fn of(spec: &SarimaSpec) -> Self {
        let airline = SarimaSpec::airline(spec.period);
        let seasonal_ok = spec.cap_p == 0 && spec.cap_d == airline.cap_d && spec.cap_q <= 1;
        if spec.same_arma(&airline) && spec.d == 1 && spec.cap_d == airline.cap_d {
            AirlineShape::Airline
        } else if spec.d == 1 && seasonal_ok && spec.p + spec.q <= 2 && spec.p <= 1 {
            AirlineShape::QuasiAirline
        } else {
            AirlineShape::Other
        }
    }

    /// Tie-break rank: higher is preferred.
    pub fn rank(&self) -> u8 {
        match self {
            AirlineShape::Other => 0,
            AirlineShape::QuasiAirline => 1,
            AirlineShape::Airline => 2,
        }
    }
}

/// Snapshot of the diagnostics of one estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatistics {
    pub spec: SarimaSpec,
    /// Number of observations of the series.
    pub observations: usize,
    /// Number of observations after differencing.
    pub effective_observations: usize,
    /// Number of outliers (automatic and user).
    pub outliers: usize,
    pub narma: usize,
    pub nx: usize,
    pub ljung_box: LjungBoxResult,
    pub seasonal_ljung_box: Option<LjungBoxResult>,
    pub skewness: TestResult,
    pub split_sample: SplitSampleResult,
    /// Corrected BIC of the estimation.
    pub bic: f64,
    /// Residual standard error.
    pub se: f64,
    pub shape: AirlineShape,
}

impl ModelStatistics {
    /// Diagnostics of `estimation`, the estimation of `description`.
    pub fn of(description: &ModelDescription, estimation: &RegArimaEstimation) -> Self {
        let spec = estimation.spec;
        let residuals = &estimation.likelihood.residuals;
        let m = estimation.observations();
        let narma = estimation.narma();
        let nx = estimation.nx();
        let dof = (m + 1).saturating_sub(narma + nx).max(1);

        Self {
            spec,
            observations: description.len(),
            effective_observations: m,
            outliers: description.outlier_keys().len(),
            narma,
            nx,
            ljung_box: ljung_box(residuals, ljung_box_lags(spec.period), narma),
            seasonal_ljung_box: seasonal_ljung_box(residuals, spec.period),
            skewness: skewness_test(residuals),
            split_sample: split_sample_test(residuals, spec.period),
            bic: estimation.bicc(),
            se: (estimation.likelihood.ssq / dof as f64).sqrt(),
            shape: AirlineShape::of(&spec),
        }
    }

    /// Whether the Ljung-Box test accepts the residuals at confidence `pcr`.
    ///
    /// An undefined test (too short residuals) does not reject.
    pub fn is_acceptable(&self, pcr: f64) -> bool {
        self.ljung_box.is_white_noise(1.0 - pcr)
    }
}
