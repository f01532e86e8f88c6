//! Choice of the differencing orders and of the mean.
//!
//! The greedy search starts from the undifferenced linearized series and
//! keeps applying the regular or seasonal difference that reduces a robust
//! dispersion measure the most, as long as the reduction exceeds a fixed
//! ratio. The mean is then tested on the differenced series with a
//! t-statistic whose variance accounts for residual autocorrelation.
//!
//! After an ARMA model has been estimated, [`check_unit_roots`] corrects
//! over- and under-differencing by looking at MA and AR factors close to
//! the unit circle.

use super::config::{DIFFERENCING_RATIO, MAX_BD, MAX_D, T_THRESHOLD};
use super::ProcessingResult;
use crate::models::arima::{apply_differencing, SarimaSpec};
use crate::models::regarima::RegArimaModelling;
use crate::utils::{autocorrelations, mean, robust_scale};
use tracing::debug;

/// Dispersion used to compare differencing orders.
fn dispersion(values: &[f64]) -> f64 {
    let scale = robust_scale(values);
    if scale.is_nan() {
        f64::INFINITY
    } else {
        scale
    }
}

/// Greedy selection of `(d, D)`.
///
/// A difference is accepted when it divides the dispersion by more than
/// [`DIFFERENCING_RATIO`]. Seasonal differences are tried only when
/// `seasonal` is set.
pub fn select_differencing(values: &[f64], period: usize, seasonal: bool) -> (usize, usize) {
    let mut d = 0;
    let mut bd = 0;
    let mut current = dispersion(values);
    let min_len = 2 * period.max(4);

    loop {
        let mut candidates = Vec::with_capacity(2);
        if d < MAX_D {
            candidates.push((d + 1, bd));
        }
        if seasonal && period > 1 && bd < MAX_BD {
            candidates.push((d, bd + 1));
        }
        let best = candidates
            .into_iter()
            .filter_map(|(nd, nbd)| {
                let spec = SarimaSpec::new(period, (0, nd, 0), (0, nbd, 0));
                let differenced = apply_differencing(values, &spec);
                (differenced.len() >= min_len).then(|| (nd, nbd, dispersion(&differenced)))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2));

        match best {
            Some((nd, nbd, disp)) if current > DIFFERENCING_RATIO * disp => {
                d = nd;
                bd = nbd;
                current = disp;
            }
            _ => break,
        }
    }
    (d, bd)
}

/// t-test of the mean of a (differenced) series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanTest {
    pub mean: f64,
    pub t_stat: f64,
}

impl MeanTest {
    pub fn is_significant(&self) -> bool {
        self.t_stat.abs() > T_THRESHOLD
    }
}

/// Mean t-test with a Bartlett-weighted long-run variance.
pub fn test_mean(values: &[f64]) -> MeanTest {
    let n = values.len();
    let m = mean(values);
    if n < 3 {
        return MeanTest {
            mean: m,
            t_stat: 0.0,
        };
    }
    let gamma0 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
    let lags = ((n as f64).sqrt() as usize).min(n - 1);
    let rho = autocorrelations(values, lags);
    let correction: f64 = rho
        .iter()
        .enumerate()
        .map(|(k, r)| (1.0 - (k + 1) as f64 / (lags + 1) as f64) * r)
        .sum();
    let mut long_run = gamma0 * (1.0 + 2.0 * correction);
    if long_run.is_nan() || long_run <= 0.0 {
        long_run = gamma0;
    }
    let t_stat = if long_run > 0.0 {
        m / (long_run / n as f64).sqrt()
    } else {
        0.0
    };
    MeanTest { mean: m, t_stat }
}

/// Differencing step of the identification.
#[derive(Debug, Clone, Copy)]
pub struct DifferencingModule {
    /// Whether seasonal differences may be tried.
    pub seasonal: bool,
    /// Precision of the estimation giving the linearized series.
    pub precision: f64,
}

impl DifferencingModule {
    pub fn new(seasonal: bool, precision: f64) -> Self {
        Self {
            seasonal,
            precision,
        }
    }

    /// Choose `(d, D)` and the mean on the linearized series.
    ///
    /// ARMA orders are kept; only the differencing and the mean change.
    pub fn process(&self, ctx: &mut RegArimaModelling) -> ProcessingResult {
        ctx.estimate(self.precision);
        let coefficients = ctx
            .estimation()
            .map(|e| e.likelihood.coefficients.clone())
            .unwrap_or_default();
        let linearized = ctx.description().linearize(&coefficients);
        let current = ctx.spec();

        let (d, bd) = select_differencing(&linearized, current.period, self.seasonal);
        let probe = SarimaSpec::new(current.period, (0, d, 0), (0, bd, 0));
        let mean_test = test_mean(&apply_differencing(&linearized, &probe));

        let mut spec = current
            .with_regular(current.p, d, current.q)
            .with_mean(mean_test.is_significant());
        spec = if self.seasonal {
            spec.with_seasonal(current.cap_p, bd, current.cap_q)
        } else {
            spec.without_seasonal()
        };
        debug!(d, bd, mean_t = mean_test.t_stat, spec = %spec, "differencing selected");

        if ctx.set_spec(spec) {
            ProcessingResult::Changed
        } else {
            ProcessingResult::Unchanged
        }
    }
}

/// Correct the differencing from the roots of the estimated model.
///
/// With `ub` the unit-root threshold:
/// * a regular MA factor with `Theta(1) <= 1 - ub` removes a regular
///   difference and adds the mean;
/// * otherwise, a regular AR factor with `Phi(1) <= 1 - ub` turns into one
///   more regular difference;
/// * a seasonal MA factor with `Theta_s(1) <= 1 - ub` removes the seasonal
///   difference.
pub fn check_unit_roots(ctx: &mut RegArimaModelling, ub: f64) -> ProcessingResult {
    let Some(estimation) = ctx.estimation() else {
        return ProcessingResult::Unprocessed;
    };
    let params = &estimation.parameters;
    let mut spec = ctx.spec();
    let bound = 1.0 - ub;

    if spec.q > 0 && spec.d > 0 && params.regular_ma().value_at_one() <= bound {
        spec = spec.with_regular(spec.p, spec.d - 1, spec.q - 1).with_mean(true);
    } else if spec.p > 0 && spec.d < MAX_D && params.regular_ar().value_at_one() <= bound {
        spec = spec.with_regular(spec.p - 1, spec.d + 1, spec.q).with_mean(false);
    }
    if spec.cap_q > 0 && spec.cap_d > 0 && params.seasonal_ma().value_at_one() <= bound {
        spec = spec.with_seasonal(spec.cap_p, spec.cap_d - 1, spec.cap_q - 1);
    }

    if ctx.set_spec(spec) {
        debug!(spec = %spec, "differencing corrected by unit roots");
        ProcessingResult::Changed
    } else {
        ProcessingResult::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TsData;
    use crate::models::regarima::ModelDescription;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn seasonal_walk(n: usize, seed: u64) -> Vec<f64> {
        // y_t = y_{t-12} + e_t: needs exactly one seasonal difference.
        let e = noise(n, seed);
        let mut y = vec![0.0; n];
        for t in 0..n {
            let pattern = 20.0 * ((t % 12) as f64 - 5.5);
            y[t] = if t < 12 { 100.0 + pattern + e[t] } else { y[t - 12] + e[t] };
        }
        y
    }

    #[test]
    fn stationary_series_needs_no_difference() {
        assert_eq!(select_differencing(&noise(200, 1), 12, true), (0, 0));
    }

    #[test]
    fn random_walk_needs_one_difference() {
        let mut level = 0.0;
        let walk: Vec<f64> = noise(200, 2)
            .iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();
        assert_eq!(select_differencing(&walk, 1, false), (1, 0));
    }

    #[test]
    fn seasonal_walk_needs_seasonal_difference() {
        let (_, bd) = select_differencing(&seasonal_walk(240, 3), 12, true);
        assert_eq!(bd, 1);
    }

    #[test]
    fn module_raises_seasonal_difference() {
        let series = TsData::monthly(1990, seasonal_walk(240, 4)).unwrap();
        let start = SarimaSpec::airline(12).with_seasonal(0, 0, 1);
        let mut ctx = RegArimaModelling::new(ModelDescription::new(series, start));
        ctx.estimate(1e-4);
        let result = DifferencingModule::new(true, 1e-4).process(&mut ctx);
        assert_eq!(result, ProcessingResult::Changed);
        assert_eq!(ctx.spec().cap_d, 1);
        assert!(ctx.is_dirty());
    }

    #[test]
    fn mean_test() {
        let shifted: Vec<f64> = noise(200, 5).iter().map(|e| e + 1.0).collect();
        assert!(test_mean(&shifted).is_significant());
        let centered: Vec<f64> = noise(200, 6).iter().map(|e| e * 0.01).collect();
        let t = test_mean(&centered);
        assert!(t.t_stat.abs() < 4.0);
    }

    #[test]
    fn overdifferenced_model_loses_a_difference() {
        // White noise around 10 fitted with (0,1,1): theta close to -1.
        let values: Vec<f64> = noise(300, 7).iter().map(|e| 10.0 + e).collect();
        let series = TsData::new(crate::core::TsPeriod::new(1, 1800, 0).unwrap(), values).unwrap();
        let mut ctx = RegArimaModelling::new(ModelDescription::new(series, SarimaSpec::airline(1)));
        ctx.estimate(1e-6);
        let result = check_unit_roots(&mut ctx, 0.9);
        assert_eq!(result, ProcessingResult::Changed);
        assert_eq!(ctx.spec().d, 0);
        assert!(ctx.spec().mean);
    }

    #[test]
    fn unit_roots_need_estimation() {
        let series = TsData::monthly(2000, noise(60, 8)).unwrap();
        let mut ctx = RegArimaModelling::new(ModelDescription::new(series, SarimaSpec::airline(12)));
        assert_eq!(check_unit_roots(&mut ctx, 0.97), ProcessingResult::Unprocessed);
    }
}
