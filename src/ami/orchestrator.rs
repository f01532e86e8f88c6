//! The identification loop.

use super::arma::ArmaModule;
use super::comparator::{compare, preference_between, Preference};
use super::config::{calc_cv, AmiSpec, TransformSpec, MAX_PASS};
use super::differencing::{check_unit_roots, DifferencingModule};
use super::model::PreprocessingModel;
use super::outliers::OutlierModule;
use super::regression::process_calendar_effects;
use super::seasonality::test_seasonality;
use super::state::{AmiCounters, AmiEvent, AmiState, AmiStatus, DifferencingStep, RoundPlan};
use super::statistics::ModelStatistics;
use super::transformation::test_log_level;
use super::ProcessingResult;
use crate::calendar::{CalendarProvider, GregorianCalendar};
use crate::core::TsData;
use crate::error::{ModellingError, Result};
use crate::models::arima::SarimaSpec;
use crate::models::regarima::{
    ModelDescription, Provenance, RegArimaEstimation, RegArimaModelling, Transformation, Variable,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Best model found so far in a run.
#[derive(Debug, Clone)]
struct Reference {
    description: ModelDescription,
    estimation: RegArimaEstimation,
    statistics: ModelStatistics,
}

/// Automatic model identification.
///
/// # Example
///
/// ```no_run
/// use anofox_tramo::ami::{AmiModule, AmiSpec};
/// use anofox_tramo::core::TsData;
///
/// let values: Vec<f64> = (0..120)
///     .map(|i| 100.0 + 0.4 * i as f64 + 6.0 * ((i % 12) as f64 - 5.5) + ((i * 13) % 7) as f64)
///     .collect();
/// let series = TsData::monthly(2000, values).unwrap();
/// let model = AmiModule::new(AmiSpec::default()).process(&series).unwrap();
/// println!("{} with {} outliers", model.spec(), model.outliers().len());
/// ```
#[derive(Debug, Clone)]
pub struct AmiModule {
    spec: AmiSpec,
    calendar: Arc<dyn CalendarProvider>,
}

impl AmiModule {
    pub fn new(spec: AmiSpec) -> Self {
        Self {
            spec,
            calendar: Arc::new(GregorianCalendar),
        }
    }

    /// Use another source of calendar regressors.
    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarProvider>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn spec(&self) -> &AmiSpec {
        &self.spec
    }

    /// Identify and estimate a model for `series`.
    ///
    /// # Errors
    /// * `InvalidParameter`, `UnsupportedFrequency` for an inconsistent
    ///   configuration or invalid prespecified outliers;
    /// * `InsufficientData` if the series cannot support the starting model;
    /// * `NonConvergence` if not a single model could be estimated.
    #[tracing::instrument(skip(self, series), fields(n = series.len(), frequency = series.frequency()))]
    pub fn process(&self, series: &TsData) -> Result<PreprocessingModel> {
        let mut run = self.initialize(series)?;

        if self.spec.is_fully_specified() {
            run.ctx.estimate(self.spec.precision);
            run.counters.iterations = 1;
            run.status = AmiStatus::FullySpecified;
            let estimation = run
                .ctx
                .estimation()
                .cloned()
                .ok_or_else(|| ModellingError::NonConvergence("model could not be estimated".into()))?;
            return Ok(run.into_model(estimation));
        }

        run.iterate();
        run.finish()
    }

    /// Validate the input, build the context and run the pre-tests.
    fn initialize(&self, series: &TsData) -> Result<Run<'_>> {
        let spec = &self.spec;
        let period = series.frequency();
        spec.validate(period)?;

        let start = match spec.initial_model {
            Some(model) if model.period != period => {
                return Err(ModellingError::InvalidParameter(format!(
                    "initial model period {} does not match the series frequency {}",
                    model.period, period
                )))
            }
            Some(model) => model,
            None => SarimaSpec::airline(period),
        };
        let needed = start.minimum_length();
        if series.len() < needed {
            return Err(ModellingError::InsufficientData {
                needed,
                got: series.len(),
            });
        }

        let n = series.len();
        let description = ModelDescription::new(series.clone(), start);
        let mut ctx = RegArimaModelling::with_calendar(description, self.calendar.clone());
        for key in &spec.prespecified_outliers {
            if !key.kind.is_admissible(key.position, n, period) {
                return Err(ModellingError::InvalidParameter(format!(
                    "outlier {} is not admissible for a series of length {}",
                    key, n
                )));
            }
            ctx.add_variable(Variable::outlier(*key, n, period, Provenance::User))?;
        }

        let mut events = Vec::new();
        let mut seasonal = period > 1 && ctx.spec().has_seasonal_part();
        if spec.auto_modelling && period > 1 && spec.initial_model.is_none() {
            let test = test_seasonality(ctx.description().values(), period);
            debug!(f = test.statistic, p = test.p_value, seasonal = test.seasonal, "seasonality test");
            let result = if test.seasonal {
                ProcessingResult::Unchanged
            } else {
                seasonal = false;
                let spec = ctx.spec().without_seasonal();
                ctx.set_spec(spec);
                ProcessingResult::Changed
            };
            events.push(AmiEvent::PreTest {
                name: "seasonality",
                result,
            });
        }

        let transformation = match spec.transform {
            TransformSpec::None => ProcessingResult::Unprocessed,
            TransformSpec::Log => {
                ctx.set_transformation(Transformation::Log)?;
                ProcessingResult::Changed
            }
            TransformSpec::Auto => {
                let test = test_log_level(ctx.description(), spec.intermediate_precision);
                debug!(level = ?test.level, log = ?test.log, "log/level test");
                if ctx.set_transformation(test.choice())? {
                    ProcessingResult::Changed
                } else {
                    ProcessingResult::Unchanged
                }
            }
        };
        events.push(AmiEvent::PreTest {
            name: "transformation",
            result: transformation,
        });

        let calendar = process_calendar_effects(&mut ctx, spec)?;
        events.push(AmiEvent::PreTest {
            name: "calendar",
            result: calendar,
        });

        let cv = spec.critical_value.unwrap_or_else(|| calc_cv(n));
        let counters = AmiCounters::new(cv, spec.ljung_box_acceptance);
        Ok(Run {
            spec,
            critical_values: vec![counters.cv],
            counters,
            round_spec: ctx.spec(),
            ctx,
            seasonal,
            differencing: DifferencingModule::new(seasonal, spec.intermediate_precision),
            arma: ArmaModule::new(seasonal, spec.intermediate_precision),
            outliers: OutlierModule::new(spec.outlier_types.clone(), spec.intermediate_precision),
            reference: None,
            current_valid: false,
            status: AmiStatus::Exhausted,
            events,
        })
    }
}

/// Mutable state of one run.
struct Run<'a> {
    spec: &'a AmiSpec,
    ctx: RegArimaModelling,
    counters: AmiCounters,
    critical_values: Vec<f64>,
    /// Orders at the start of the current round.
    round_spec: SarimaSpec,
    seasonal: bool,
    differencing: DifferencingModule,
    arma: ArmaModule,
    outliers: OutlierModule,
    reference: Option<Reference>,
    current_valid: bool,
    status: AmiStatus,
    events: Vec<AmiEvent>,
}

impl Run<'_> {
    fn plan(&self) -> RoundPlan {
        RoundPlan::for_round(self.counters.round, self.counters.fallback, self.spec)
    }

    /// First state of the current round.
    fn start_round(&self) -> AmiState {
        self.plan().next(AmiState::Init)
    }

    fn iterate(&mut self) {
        let mut state = AmiState::Init;
        while !state.is_terminal() {
            let next = self.step(state);
            if matches!(state, AmiState::Init | AmiState::Evaluation | AmiState::Fallback)
                && !next.is_terminal()
            {
                self.round_spec = self.ctx.spec();
            }
            if next != state {
                self.events.push(AmiEvent::Transition {
                    from: state,
                    to: next,
                });
            }
            state = next;
        }
    }

    fn step(&mut self, state: AmiState) -> AmiState {
        let plan = self.plan();
        match state {
            AmiState::Init => self.start_round(),
            AmiState::Differencing => {
                let result = match plan.differencing {
                    DifferencingStep::Greedy => self.differencing.process(&mut self.ctx),
                    DifferencingStep::UnitRoots => {
                        self.ctx.estimate(self.spec.intermediate_precision);
                        check_unit_roots(&mut self.ctx, self.spec.unit_root_threshold)
                    }
                    DifferencingStep::Skip => ProcessingResult::Unprocessed,
                };
                self.events.push(AmiEvent::Module { state, result });
                plan.next(state)
            }
            AmiState::ArmaSearch => {
                let result = self.arma.process(&mut self.ctx, self.counters.pass);
                self.events.push(AmiEvent::Module { state, result });
                plan.next(state)
            }
            AmiState::OutlierSearch => {
                if self.ctx.spec() != self.round_spec {
                    let removed = self.ctx.remove_automatic_outliers();
                    debug!(removed, "orders changed, automatic outliers cleared");
                }
                let result = self.outliers.process(&mut self.ctx, self.counters.cv);
                self.events.push(AmiEvent::OutliersSearched {
                    added: result.added.len(),
                    removed: result.removed.len(),
                    converged: result.converged,
                });
                plan.next(state)
            }
            AmiState::Estimation => {
                self.counters.iterations += 1;
                self.current_valid = self.ctx.estimate(self.spec.intermediate_precision);
                self.events.push(AmiEvent::Estimated {
                    round: self.counters.round,
                    pass: self.counters.pass,
                    spec: self.ctx.spec(),
                    valid: self.current_valid,
                });
                AmiState::Evaluation
            }
            AmiState::Evaluation => self.evaluate(),
            AmiState::Fallback => self.enter_fallback(),
            AmiState::Accepted | AmiState::Finished => state,
        }
    }

    fn current_statistics(&self) -> Option<ModelStatistics> {
        if !self.current_valid {
            return None;
        }
        self.ctx
            .estimation()
            .map(|e| ModelStatistics::of(self.ctx.description(), e))
    }

    fn adopt(&mut self, statistics: ModelStatistics) {
        let Some(estimation) = self.ctx.estimation().cloned() else {
            return;
        };
        debug!(spec = %statistics.spec, bic = statistics.bic, "reference adopted");
        self.events.push(AmiEvent::ReferenceAdopted {
            round: self.counters.round,
            spec: statistics.spec,
            bic: statistics.bic,
        });
        self.reference = Some(Reference {
            description: self.ctx.description().clone(),
            estimation,
            statistics,
        });
    }

    fn revert(&mut self, rejected: SarimaSpec) {
        if let Some(reference) = &self.reference {
            debug!(rejected = %rejected, "reverted to reference");
            self.ctx
                .restore(reference.description.clone(), Some(reference.estimation.clone()));
            self.events.push(AmiEvent::ReferenceReverted {
                round: self.counters.round,
                rejected,
            });
        }
    }

    fn reduce_cv(&mut self) {
        if let Some(from) = self.counters.reduce_cv() {
            debug!(from, to = self.counters.cv, "critical value reduced");
            self.events.push(AmiEvent::CriticalValueReduced {
                from,
                to: self.counters.cv,
            });
            self.critical_values.push(self.counters.cv);
        }
    }

    /// Continue with the next round unless the iteration cap is reached.
    fn next_round(&mut self) -> AmiState {
        if self.counters.is_exhausted() {
            self.status = AmiStatus::Exhausted;
            return AmiState::Finished;
        }
        self.start_round()
    }

    fn evaluate(&mut self) -> AmiState {
        let Some(current) = self.current_statistics() else {
            return self.on_failure();
        };

        if self.counters.fallback {
            let keep_reference = self
                .reference
                .as_ref()
                .is_some_and(|r| compare(&current, &r.statistics, Preference::Bic) == Ordering::Greater);
            if keep_reference {
                self.revert(current.spec);
            } else {
                self.adopt(current);
            }
            self.status = AmiStatus::Fallback;
            return AmiState::Finished;
        }

        if self.counters.round == 0 {
            let acceptable = current.is_acceptable(self.counters.pcr);
            self.adopt(current);
            if !self.spec.auto_modelling || (self.spec.accept_default_airline && acceptable) {
                self.status = AmiStatus::Accepted;
                return AmiState::Accepted;
            }
            self.counters.advance();
            return self.next_round();
        }

        let level = self.counters.acceptance_level();
        let ordering = self.reference.as_ref().map(|r| {
            let preference = preference_between(&current, &r.statistics, level);
            compare(&current, &r.statistics, preference)
        });
        let reverted = ordering == Some(Ordering::Greater);
        if reverted {
            self.revert(current.spec);
        } else {
            self.adopt(current);
        }

        let accepted = self
            .reference
            .as_ref()
            .is_some_and(|r| r.statistics.is_acceptable(self.counters.pcr));
        if accepted {
            self.status = AmiStatus::Accepted;
            return AmiState::Accepted;
        }
        if self.counters.pass >= MAX_PASS {
            if self.counters.is_exhausted() {
                self.status = AmiStatus::Exhausted;
                return AmiState::Finished;
            }
            return AmiState::Fallback;
        }

        self.counters.raise_acceptance();
        self.events.push(AmiEvent::AcceptanceRaised {
            pcr: self.counters.pcr,
        });
        if reverted {
            self.reduce_cv();
        }
        self.counters.advance();
        self.next_round()
    }

    fn on_failure(&mut self) -> AmiState {
        debug!(
            round = self.counters.round,
            pass = self.counters.pass,
            "estimation failed"
        );
        if let Some(reference) = &self.reference {
            if self.ctx.description() != &reference.description {
                self.ctx
                    .restore(reference.description.clone(), Some(reference.estimation.clone()));
            }
        }
        if self.counters.fallback {
            self.status = AmiStatus::Fallback;
            return AmiState::Finished;
        }
        self.reduce_cv();
        self.counters.advance();
        if self.counters.pass > MAX_PASS {
            if self.counters.is_exhausted() {
                self.status = AmiStatus::Exhausted;
                return AmiState::Finished;
            }
            return AmiState::Fallback;
        }
        self.next_round()
    }

    /// Force the canonical high-order model without automatic outliers.
    fn enter_fallback(&mut self) -> AmiState {
        let mean = self
            .reference
            .as_ref()
            .map_or(self.ctx.spec().mean, |r| r.description.spec().mean);
        let period = self.ctx.description().period();
        let mut spec = SarimaSpec::last_solution(period).with_mean(mean);
        if !self.seasonal {
            spec = spec.without_seasonal();
        }
        self.ctx.set_spec(spec);
        self.ctx.remove_automatic_outliers();
        self.counters.enter_fallback();
        debug!(spec = %spec, "fallback model forced");
        self.events.push(AmiEvent::FallbackEntered { spec });
        self.start_round()
    }

    /// Restore the reference and estimate it at the final precision.
    fn finish(mut self) -> Result<PreprocessingModel> {
        match &self.reference {
            Some(reference) => {
                if self.ctx.description() != &reference.description {
                    self.ctx
                        .restore(reference.description.clone(), Some(reference.estimation.clone()));
                }
            }
            None => {
                let period = self.ctx.description().period();
                let mut spec = SarimaSpec::airline(period);
                if !self.seasonal {
                    spec = spec.without_seasonal();
                }
                self.ctx.set_spec(spec);
                self.ctx.remove_automatic_outliers();
                debug!(spec = %spec, "no reference model, airline estimated");
            }
        }

        self.ctx.estimate(self.spec.precision);
        let estimation = self
            .ctx
            .estimation()
            .filter(|e| e.bicc().is_finite())
            .cloned()
            .ok_or_else(|| {
                ModellingError::NonConvergence("no model could be estimated".into())
            })?;
        Ok(self.into_model(estimation))
    }

    fn into_model(self, estimation: RegArimaEstimation) -> PreprocessingModel {
        let description = self.ctx.description().clone();
        let statistics = ModelStatistics::of(&description, &estimation);
        let linearized = description.linearize(&estimation.likelihood.coefficients);
        PreprocessingModel {
            estimation_count: self.ctx.estimation_count(),
            description,
            estimation,
            statistics,
            linearized,
            status: self.status,
            iterations: self.counters.iterations,
            critical_values: self.critical_values,
            events: self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::regarima::{OutlierKey, OutlierType};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn airline_series(n: usize, seed: u64) -> TsData {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut level = 200.0;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                level += 0.4 * normal.sample(&mut rng);
                level + 6.0 * ((i % 12) as f64 - 5.5) + normal.sample(&mut rng)
            })
            .collect();
        TsData::monthly(1995, values).unwrap()
    }

    #[test]
    fn fully_specified_estimates_once() {
        let model = AmiModule::new(AmiSpec::fixed())
            .process(&airline_series(96, 1))
            .unwrap();
        assert_eq!(model.estimation_count, 1);
        assert_eq!(model.status, AmiStatus::FullySpecified);
        assert_eq!(*model.spec(), SarimaSpec::airline(12));
        assert!(model
            .events
            .iter()
            .all(|e| !matches!(e, AmiEvent::Transition { .. })));
    }

    #[test]
    fn too_short_series_is_rejected() {
        let series = TsData::monthly(2000, vec![1.0; 20]).unwrap();
        let err = AmiModule::new(AmiSpec::default()).process(&series).unwrap_err();
        assert_eq!(err, ModellingError::InsufficientData { needed: 29, got: 20 });
    }

    #[test]
    fn invalid_prespecified_outlier() {
        let spec = AmiSpec::default()
            .with_prespecified_outliers(vec![OutlierKey::new(OutlierType::LS, 0)]);
        let err = AmiModule::new(spec).process(&airline_series(60, 2)).unwrap_err();
        assert!(matches!(err, ModellingError::InvalidParameter(_)));
    }

    #[test]
    fn initial_model_period_must_match() {
        let spec = AmiSpec::default().with_initial_model(SarimaSpec::airline(4));
        let err = AmiModule::new(spec).process(&airline_series(60, 3)).unwrap_err();
        assert!(matches!(err, ModellingError::InvalidParameter(_)));
    }

    #[test]
    fn outliers_only_run_accepts_round_zero() {
        let spec = AmiSpec::default().with_auto_modelling(false);
        let model = AmiModule::new(spec).process(&airline_series(120, 4)).unwrap();
        assert_eq!(model.status, AmiStatus::Accepted);
        assert_eq!(model.iterations, 1);
        assert_eq!(*model.spec(), SarimaSpec::airline(12));
    }

    #[test]
    fn automatic_run_is_bounded() {
        let mut rng = StdRng::seed_from_u64(5);
        let values: Vec<f64> = (0..84).map(|_| rng.gen_range(0.0..10.0) + 50.0).collect();
        let series = TsData::monthly(2001, values).unwrap();
        let model = AmiModule::new(AmiSpec::default()).process(&series).unwrap();
        assert!(model.iterations <= crate::ami::config::MAX_ITERATIONS);
        assert!(model
            .critical_values
            .windows(2)
            .all(|w| w[1] <= w[0] && w[1] >= crate::ami::MINCV));
        assert!(model.statistics.bic.is_finite());
    }

    #[test]
    fn user_outliers_survive_the_run() {
        let key = OutlierKey::new(OutlierType::AO, 40);
        let spec = AmiSpec::default().with_prespecified_outliers(vec![key]);
        let model = AmiModule::new(spec).process(&airline_series(120, 6)).unwrap();
        assert!(model.outliers().contains(&key));
        assert!(!model.automatic_outliers().contains(&key));
    }

    /// Run whose airline estimation is the reference model.
    fn with_reference<'a>(module: &'a AmiModule, series: &TsData) -> Run<'a> {
        let mut run = module.initialize(series).unwrap();
        run.current_valid = run.ctx.estimate(module.spec().intermediate_precision);
        let statistics = run.current_statistics().unwrap();
        run.adopt(statistics);
        run
    }

    #[test]
    fn pre_tests_run_in_order() {
        let mut rng = StdRng::seed_from_u64(9);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut level = 500.0;
        let values: Vec<f64> = (0..120)
            .map(|_| {
                level += 2.0 * normal.sample(&mut rng);
                level + normal.sample(&mut rng)
            })
            .collect();
        let series = TsData::monthly(2000, values).unwrap();
        let module = AmiModule::new(AmiSpec::default().with_transform(TransformSpec::Auto));
        let run = module.initialize(&series).unwrap();

        let names: Vec<&str> = run
            .events
            .iter()
            .filter_map(|e| match e {
                AmiEvent::PreTest { name, .. } => Some(*name),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["seasonality", "transformation", "calendar"]);
        assert_eq!(
            run.events[0],
            AmiEvent::PreTest {
                name: "seasonality",
                result: ProcessingResult::Changed
            }
        );
        assert!(!run.seasonal);
        assert!(!run.ctx.spec().has_seasonal_part());
    }

    #[test]
    fn worse_model_is_reverted() {
        let module = AmiModule::new(AmiSpec::default());
        let mut run = with_reference(&module, &airline_series(120, 7));
        run.counters.advance();
        run.reference.as_mut().unwrap().statistics.bic = f64::NEG_INFINITY;

        let rejected = SarimaSpec::airline(12).with_regular(1, 1, 1);
        run.ctx.set_spec(rejected);
        run.current_valid = run.ctx.estimate(module.spec().intermediate_precision);
        assert!(run.current_valid);
        run.evaluate();

        assert_eq!(run.ctx.spec(), SarimaSpec::airline(12));
        assert!(run.events.iter().any(|e| matches!(
            e,
            AmiEvent::ReferenceReverted { rejected: r, .. } if *r == rejected
        )));
    }

    #[test]
    fn last_pass_enters_fallback() {
        let module = AmiModule::new(AmiSpec::default().with_outlier_detection(false));
        let mut run = with_reference(&module, &airline_series(120, 8));
        run.counters.round = 3;
        run.counters.pass = MAX_PASS;
        // No Ljung-Box p-value reaches 1 - 1e-9.
        run.counters.pcr = 1e-9;
        assert_eq!(run.evaluate(), AmiState::Fallback);

        let ao = OutlierKey::new(OutlierType::AO, 60);
        run.ctx
            .add_variable(Variable::outlier(ao, 120, 12, Provenance::Automatic))
            .unwrap();
        // Let the fallback model win the final comparison.
        run.reference.as_mut().unwrap().statistics.bic = f64::INFINITY;

        let mut state = run.step(AmiState::Fallback);
        assert!(run.counters.fallback);
        assert_eq!(run.ctx.spec(), SarimaSpec::last_solution(12));
        assert_eq!(run.ctx.description().automatic_outlier_count(), 0);
        while !state.is_terminal() {
            state = run.step(state);
        }

        let model = run.finish().unwrap();
        assert_eq!(model.status, AmiStatus::Fallback);
        assert_eq!(*model.spec(), SarimaSpec::last_solution(12));
        assert!(model.automatic_outliers().is_empty());
        assert!(model.events.iter().any(|e| matches!(
            e,
            AmiEvent::FallbackEntered { spec } if *spec == SarimaSpec::last_solution(12)
        )));
    }
}
