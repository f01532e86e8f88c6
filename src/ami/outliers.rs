//! Automatic outlier detection.
//!
//! Forward search: every admissible (type, position) pair not yet in the
//! model is regressed on the filtered residuals of the current estimation;
//! the most significant one enters the model if its |t| reaches the
//! critical value. After each addition a backward pass drops the least
//! significant automatic outlier while its |t| is below the critical value.
//! If the outlier just dropped is selected again, the search stops and
//! reports non-convergence instead of cycling.

use super::config::{MAX_OUTLIERS, MAX_OUTLIER_ROUNDS};
use crate::models::arima::{apply_differencing, ArmaFilter};
use crate::models::regarima::{
    ModelDescription, OutlierKey, OutlierType, Provenance, RegArimaEstimation, RegArimaModelling,
    Variable,
};
use crate::utils::robust_scale;
use std::collections::HashSet;
use tracing::debug;

/// Most significant candidate of a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierCandidate {
    pub key: OutlierKey,
    /// Estimated effect in the filtered domain.
    pub coefficient: f64,
    /// Robust t-statistic.
    pub t_stat: f64,
}

/// Summary of one call to [`OutlierModule::process`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierDetectionResult {
    /// Outliers added during the search, in order.
    pub added: Vec<OutlierKey>,
    /// Outliers removed by the backward passes, in order.
    pub removed: Vec<OutlierKey>,
    /// `false` when the search stopped on a cycle, a cap or a failed
    /// estimation.
    pub converged: bool,
    /// Number of forward steps.
    pub rounds: usize,
}

/// Outlier search of the identification.
#[derive(Debug, Clone)]
pub struct OutlierModule {
    pub types: Vec<OutlierType>,
    pub precision: f64,
    pub max_outliers: usize,
    pub max_rounds: usize,
}

impl OutlierModule {
    pub fn new(types: Vec<OutlierType>, precision: f64) -> Self {
        Self {
            types,
            precision,
            max_outliers: MAX_OUTLIERS,
            max_rounds: MAX_OUTLIER_ROUNDS,
        }
    }

    pub fn with_max_outliers(mut self, max_outliers: usize) -> Self {
        self.max_outliers = max_outliers;
        self
    }

    /// Find the candidate outlier with the largest absolute t-statistic.
    ///
    /// Outliers already in the model and the keys in `excluded` are skipped.
    pub fn scan(
        &self,
        description: &ModelDescription,
        estimation: &RegArimaEstimation,
        excluded: &HashSet<OutlierKey>,
    ) -> Option<OutlierCandidate> {
        let residuals = &estimation.likelihood.residuals;
        let m = residuals.len();
        let scale = robust_scale(residuals);
        if m == 0 || scale.is_nan() || scale <= 0.0 {
            return None;
        }
        let filter = ArmaFilter::new(&estimation.parameters, m)?;
        let spec = estimation.spec;
        let n = description.len();
        let period = description.period();
        let present: HashSet<OutlierKey> = description.outlier_keys().into_iter().collect();

        let mut best: Option<OutlierCandidate> = None;
        for &kind in &self.types {
            for position in 0..n {
                let key = OutlierKey::new(kind, position);
                if !kind.is_admissible(position, n, period)
                    || present.contains(&key)
                    || excluded.contains(&key)
                {
                    continue;
                }
                let column = apply_differencing(&kind.column(position, n, period), &spec);
                let Some(start) = column.iter().position(|v| *v != 0.0) else {
                    continue;
                };
                let filtered = filter.filter_from(&column, start);
                let xx: f64 = filtered.iter().map(|x| x * x).sum();
                if xx <= 1e-12 {
                    continue;
                }
                let xe: f64 = filtered.iter().zip(residuals).map(|(x, e)| x * e).sum();
                let t_stat = xe / (xx.sqrt() * scale);
                if best.map_or(true, |b| t_stat.abs() > b.t_stat.abs()) {
                    best = Some(OutlierCandidate {
                        key,
                        coefficient: xe / xx,
                        t_stat,
                    });
                }
            }
        }
        best
    }

    /// Run the forward/backward search with critical value `cv`.
    ///
    /// User outliers are never removed.
    pub fn process(&self, ctx: &mut RegArimaModelling, cv: f64) -> OutlierDetectionResult {
        let mut result = OutlierDetectionResult {
            converged: true,
            ..Default::default()
        };
        if !ctx.estimate(self.precision) && ctx.estimation().is_none() {
            result.converged = false;
            return result;
        }
        let n = ctx.description().len();
        let period = ctx.description().period();
        let mut excluded = HashSet::new();
        let mut last_removed: Option<OutlierKey> = None;

        while result.rounds < self.max_rounds {
            if ctx.description().automatic_outlier_count() >= self.max_outliers {
                result.converged = false;
                break;
            }
            let Some(estimation) = ctx.estimation() else {
                result.converged = false;
                break;
            };
            let Some(candidate) = self.scan(ctx.description(), estimation, &excluded) else {
                break;
            };
            if candidate.t_stat.abs() < cv {
                break;
            }
            if last_removed == Some(candidate.key) {
                debug!(outlier = %candidate.key, "outlier cycle detected");
                result.converged = false;
                break;
            }
            result.rounds += 1;

            let variable = Variable::outlier(candidate.key, n, period, Provenance::Automatic);
            if ctx.add_variable(variable).is_err() {
                excluded.insert(candidate.key);
                continue;
            }
            if !ctx.estimate(self.precision) {
                debug!(outlier = %candidate.key, "estimation failed, outlier excluded");
                ctx.remove_variable(&candidate.key.to_string());
                excluded.insert(candidate.key);
                ctx.estimate(self.precision);
                continue;
            }
            debug!(outlier = %candidate.key, t = candidate.t_stat, "outlier added");
            result.added.push(candidate.key);

            if let Some(removed) = self.backward(ctx, cv, &mut result) {
                last_removed = Some(removed);
            }
        }
        if result.rounds >= self.max_rounds {
            result.converged = false;
        }
        self.backward(ctx, cv, &mut result);
        result
    }

    /// Remove non-significant automatic outliers, least significant first.
    ///
    /// Returns the last outlier removed.
    fn backward(
        &self,
        ctx: &mut RegArimaModelling,
        cv: f64,
        result: &mut OutlierDetectionResult,
    ) -> Option<OutlierKey> {
        let mut last = None;
        loop {
            let Some(estimation) = ctx.estimation() else {
                break;
            };
            let weakest = ctx
                .description()
                .variables()
                .iter()
                .filter(|v| v.is_automatic_outlier())
                .filter_map(|v| Some((v.outlier_key()?, estimation.t_stat(v.name())?.abs())))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            match weakest {
                Some((key, t)) if t < cv => {
                    ctx.remove_variable(&key.to_string());
                    ctx.estimate(self.precision);
                    debug!(outlier = %key, t, "outlier removed");
                    result.removed.push(key);
                    last = Some(key);
                }
                _ => break,
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ami::config::calc_cv;
    use crate::core::TsData;
    use crate::models::arima::SarimaSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn airline_like(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut level = 100.0;
        (0..n)
            .map(|i| {
                level += 0.3 * normal.sample(&mut rng);
                level + 5.0 * ((i % 12) as f64 - 5.5) + normal.sample(&mut rng)
            })
            .collect()
    }

    fn context(values: Vec<f64>) -> RegArimaModelling {
        let series = TsData::monthly(1990, values).unwrap();
        RegArimaModelling::new(ModelDescription::new(series, SarimaSpec::airline(12)))
    }

    fn module() -> OutlierModule {
        OutlierModule::new(vec![OutlierType::AO, OutlierType::LS, OutlierType::TC], 1e-4)
    }

    #[test]
    fn level_shift_is_found_first() {
        let mut values = airline_like(240, 31);
        for v in values.iter_mut().skip(120) {
            *v += 25.0;
        }
        let mut ctx = context(values);
        let result = module().process(&mut ctx, calc_cv(240));
        assert_eq!(result.added.first(), Some(&OutlierKey::new(OutlierType::LS, 120)));
        assert!(ctx.description().contains("LS (120)"));
        let ls = ctx.estimation().unwrap().coefficient("LS (120)").unwrap();
        // The LS column is -1 before the shift.
        assert!((ls - 25.0).abs() < 3.0);
    }

    #[test]
    fn additive_outlier_is_found() {
        let mut values = airline_like(180, 32);
        values[60] += 30.0;
        let mut ctx = context(values);
        let result = module().process(&mut ctx, calc_cv(180));
        assert_eq!(result.added.first(), Some(&OutlierKey::new(OutlierType::AO, 60)));
    }

    #[test]
    fn scan_skips_present_and_excluded() {
        let mut values = airline_like(120, 33);
        values[50] += 40.0;
        let mut ctx = context(values);
        ctx.estimate(1e-4);
        let m = module();
        let key = OutlierKey::new(OutlierType::AO, 50);
        let first = m
            .scan(ctx.description(), ctx.estimation().unwrap(), &HashSet::new())
            .unwrap();
        assert_eq!(first.key, key);

        let excluded: HashSet<OutlierKey> = [key].into_iter().collect();
        let second = m
            .scan(ctx.description(), ctx.estimation().unwrap(), &excluded)
            .unwrap();
        assert_ne!(second.key, key);
    }

    #[test]
    fn user_outliers_are_kept() {
        let values = airline_like(120, 34);
        let mut ctx = context(values);
        let user = OutlierKey::new(OutlierType::AO, 30);
        ctx.add_variable(Variable::outlier(user, 120, 12, Provenance::User))
            .unwrap();
        module().process(&mut ctx, 3.5);
        assert!(ctx.description().contains("AO (30)"));
    }

    #[test]
    fn outlier_cap_stops_search() {
        let mut values = airline_like(150, 35);
        for (k, v) in values.iter_mut().enumerate() {
            if k % 25 == 10 {
                *v += 40.0;
            }
        }
        let mut ctx = context(values);
        let result = module().with_max_outliers(2).process(&mut ctx, 3.0);
        assert!(ctx.description().automatic_outlier_count() <= 2);
        assert!(!result.converged);
    }

    #[test]
    fn re_added_outlier_stops_search() {
        // Regular spikes inflate the likelihood variance but not the robust
        // scale: a spike scans far above `cv` and estimates below it.
        let values: Vec<f64> = (0..120)
            .map(|i| {
                let spike = if i % 6 == 3 { 3.0 } else { 0.0 };
                10.0 + 0.02 * ((i * 7) % 11) as f64 + spike
            })
            .collect();
        let series = TsData::new(crate::core::TsPeriod::new(1, 1900, 0).unwrap(), values).unwrap();
        let spec = SarimaSpec::new(1, (0, 0, 1), (0, 0, 0)).with_mean(true);
        let mut ctx = RegArimaModelling::new(ModelDescription::new(series, spec));

        let result = module().process(&mut ctx, 3.5);
        assert!(!result.converged);
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.removed, result.added);
        assert_eq!(ctx.description().automatic_outlier_count(), 0);
    }
}
