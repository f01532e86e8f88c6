//! End-to-end tests of the automatic model identification.
//!
//! Synthetic series are built from seeded generators so every run sees the
//! same data.

use anofox_tramo::ami::differencing::DifferencingModule;
use anofox_tramo::ami::outliers::OutlierModule;
use anofox_tramo::ami::{
    compare, AirlineShape, AmiEvent, AmiModule, AmiSpec, AmiStatus, ModelStatistics, Preference,
    ProcessingResult, TransformSpec, MINCV,
};
use anofox_tramo::calendar::TradingDaysType;
use anofox_tramo::core::TsData;
use anofox_tramo::models::arima::SarimaSpec;
use anofox_tramo::models::regarima::{
    ModelDescription, OutlierKey, OutlierType, Provenance, RegArimaModelling, Variable,
};
use anofox_tramo::validation::{LjungBoxResult, SplitSampleResult, TestResult};
use anofox_tramo::ModellingError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::cmp::Ordering;

/// Seasonal random walk plus noise, close to an airline process.
fn airline_like(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut level = 150.0;
    (0..n)
        .map(|i| {
            level += 0.3 * normal.sample(&mut rng);
            level + 5.0 * ((i % 12) as f64 - 5.5) + normal.sample(&mut rng)
        })
        .collect()
}

/// y_t = y_{t-12} + e_t.
fn seasonal_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut y = vec![0.0; n];
    for t in 0..n {
        let e = normal.sample(&mut rng);
        y[t] = if t < 12 {
            100.0 + 20.0 * ((t % 12) as f64 - 5.5) + e
        } else {
            y[t - 12] + e
        };
    }
    y
}

fn statistics(bic: f64, outliers: usize) -> ModelStatistics {
    let spec = SarimaSpec::airline(12);
    let test = TestResult {
        statistic: 0.0,
        p_value: 0.5,
    };
    ModelStatistics {
        spec,
        observations: 144,
        effective_observations: 131,
        outliers,
        narma: 2,
        nx: outliers,
        ljung_box: LjungBoxResult {
            statistic: 18.0,
            p_value: 0.6,
            lags: 24,
            df: 22,
        },
        seasonal_ljung_box: None,
        skewness: test,
        split_sample: SplitSampleResult {
            tail_length: 12,
            mean_test: test,
            variance_test: test,
        },
        bic,
        se: 1.0,
        shape: AirlineShape::Airline,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn white_noise_is_accepted_at_round_zero() {
    let mut rng = StdRng::seed_from_u64(2024);
    let values: Vec<f64> = (0..200).map(|_| 10.0 + rng.gen_range(-1.0..1.0)).collect();
    let series = TsData::monthly(2000, values).unwrap();

    let spec = AmiSpec::default().with_accept_default_airline(true);
    let model = AmiModule::new(spec.clone()).process(&series).unwrap();

    assert_eq!(model.status, AmiStatus::Accepted);
    assert_eq!(model.iterations, 1);
    assert!(model.outliers().is_empty());
    assert!(model.statistics.ljung_box.p_value >= 1.0 - spec.ljung_box_acceptance);
    assert!(model
        .events
        .iter()
        .any(|e| matches!(e, AmiEvent::Estimated { round: 0, .. })));
}

#[test]
fn level_shift_is_identified() {
    let mut values = airline_like(240, 11);
    for v in values.iter_mut().skip(120) {
        *v += 30.0;
    }
    let series = TsData::monthly(1995, values).unwrap();
    let key = OutlierKey::new(OutlierType::LS, 120);

    let mut ctx = RegArimaModelling::new(ModelDescription::new(
        series.clone(),
        SarimaSpec::airline(12),
    ));
    let module = OutlierModule::new(vec![OutlierType::AO, OutlierType::LS, OutlierType::TC], 5e-4);
    let first = module.process(&mut ctx, 4.0);
    assert_eq!(first.added.first(), Some(&key));
    assert_eq!(
        first
            .added
            .iter()
            .filter(|k| k.kind == OutlierType::LS)
            .count(),
        1
    );

    let model = AmiModule::new(AmiSpec::default()).process(&series).unwrap();
    assert!(model.automatic_outliers().contains(&key));
}

#[test]
fn bic_tie_prefers_fewer_outliers() {
    let two = statistics(100.0, 2);
    let four = statistics(100.0, 4);
    assert_eq!(compare(&two, &four, Preference::Bic), Ordering::Less);
    assert_eq!(compare(&four, &two, Preference::Bic), Ordering::Greater);
}

#[test]
fn seasonal_difference_is_raised() {
    let series = TsData::monthly(1990, seasonal_walk(240, 12)).unwrap();
    let start = SarimaSpec::airline(12).with_seasonal(0, 0, 1);
    let mut ctx = RegArimaModelling::new(ModelDescription::new(series, start));
    assert!(ctx.estimate(5e-4));
    assert!(!ctx.is_dirty());

    let result = DifferencingModule::new(true, 5e-4).process(&mut ctx);
    assert_eq!(result, ProcessingResult::Changed);
    assert_eq!(ctx.spec().cap_d, 1);
    assert!(ctx.estimation().is_none());
}

#[test]
fn fully_specified_model_is_estimated_once() {
    let series = TsData::monthly(2005, airline_like(120, 13)).unwrap();
    let model = AmiModule::new(AmiSpec::fixed()).process(&series).unwrap();
    assert_eq!(model.estimation_count, 1);
    assert_eq!(model.status, AmiStatus::FullySpecified);
    assert_eq!(model.iterations, 1);
}

// ============================================================================
// Properties on concrete data
// ============================================================================

#[test]
fn outlier_round_trip_restores_description() {
    let series = TsData::monthly(2000, airline_like(144, 14)).unwrap();
    let mut ctx = RegArimaModelling::new(ModelDescription::new(series, SarimaSpec::airline(12)));
    assert!(ctx.estimate(1e-6));
    let description = ctx.description().clone();
    let estimation = ctx.estimation().cloned().unwrap();

    let key = OutlierKey::new(OutlierType::AO, 50);
    ctx.add_variable(Variable::outlier(key, 144, 12, Provenance::Automatic))
        .unwrap();
    ctx.estimate(1e-6);
    assert!(ctx.remove_variable(&key.to_string()).is_some());

    assert_eq!(ctx.description(), &description);
    ctx.estimate(1e-6);
    assert_eq!(ctx.estimation(), Some(&estimation));
}

#[test]
fn statistics_are_pure() {
    let series = TsData::monthly(2000, airline_like(144, 15)).unwrap();
    let model = AmiModule::new(AmiSpec::fixed()).process(&series).unwrap();
    let first = ModelStatistics::of(&model.description, &model.estimation);
    let second = ModelStatistics::of(&model.description, &model.estimation);
    assert_eq!(first, second);
    assert_eq!(first, model.statistics);
}

#[test]
fn runs_are_deterministic() {
    let mut values = airline_like(180, 16);
    values[90] += 12.0;
    let series = TsData::monthly(2001, values).unwrap();
    let module = AmiModule::new(AmiSpec::default());
    let a = module.process(&series).unwrap();
    let b = module.process(&series).unwrap();
    assert_eq!(a.spec(), b.spec());
    assert_eq!(a.outliers(), b.outliers());
    assert_eq!(a.estimation.bicc().to_bits(), b.estimation.bicc().to_bits());
    assert_eq!(a.critical_values, b.critical_values);
}

#[test]
fn critical_values_never_increase() {
    let mut rng = StdRng::seed_from_u64(17);
    let values: Vec<f64> = (0..96).map(|_| 50.0 + rng.gen_range(0.0..20.0)).collect();
    let series = TsData::monthly(2010, values).unwrap();
    let model = AmiModule::new(AmiSpec::default()).process(&series).unwrap();
    assert!(model.iterations <= 10);
    assert!(model.critical_values.iter().all(|&cv| cv >= MINCV));
    assert!(model.critical_values.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn log_transformation_and_calendar_effects() {
    let values: Vec<f64> = airline_like(144, 18).iter().map(|v| v.max(1.0)).collect();
    let series = TsData::monthly(2003, values).unwrap();
    let spec = AmiSpec::fixed()
        .with_transform(TransformSpec::Log)
        .with_trading_days(TradingDaysType::WorkingDays, Default::default())
        .with_leap_year(true);
    let model = AmiModule::new(spec).process(&series).unwrap();
    assert_eq!(model.estimation_count, 1);
    assert!(model.coefficients().len() >= 2);
    assert_eq!(model.linearized.len(), 144);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn empty_series_is_rejected() {
    assert_eq!(
        TsData::monthly(2000, Vec::new()).unwrap_err(),
        ModellingError::EmptyData
    );
}

#[test]
fn short_series_is_rejected() {
    let series = TsData::monthly(2000, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let err = AmiModule::new(AmiSpec::default()).process(&series).unwrap_err();
    assert!(matches!(err, ModellingError::InsufficientData { .. }));
}

#[test]
fn inconsistent_configuration_is_rejected() {
    let series = TsData::monthly(2000, airline_like(72, 19)).unwrap();
    let spec = AmiSpec::default().with_precision(0.0, 1e-3);
    let err = AmiModule::new(spec).process(&series).unwrap_err();
    assert!(matches!(err, ModellingError::InvalidParameter(_)));
}

#[test]
fn log_of_negative_series_is_rejected() {
    let values: Vec<f64> = airline_like(72, 20).iter().map(|v| v - 1000.0).collect();
    let series = TsData::monthly(2000, values).unwrap();
    let spec = AmiSpec::fixed().with_transform(TransformSpec::Log);
    let err = AmiModule::new(spec).process(&series).unwrap_err();
    assert!(matches!(err, ModellingError::InvalidParameter(_)));
}

#[test]
fn configuration_loads_from_json() {
    let json = r#"{ "auto_modelling": false, "critical_value": 3.5, "accept_default_airline": true }"#;
    let spec: AmiSpec = serde_json::from_str(json).unwrap();
    assert!(!spec.auto_modelling);
    assert_eq!(spec.critical_value, Some(3.5));
    assert!(spec.accept_default_airline);
    assert!(spec.outlier_detection);

    let back: AmiSpec = serde_json::from_str(&serde_json::to_string(&spec).unwrap()).unwrap();
    assert_eq!(back, spec);
}
