//! Property-based tests for the automatic model identification.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated series.

use anofox_tramo::ami::{compare, AirlineShape, AmiModule, AmiSpec, ModelStatistics, Preference, MINCV};
use anofox_tramo::core::TsData;
use anofox_tramo::models::arima::SarimaSpec;
use anofox_tramo::validation::{LjungBoxResult, SplitSampleResult, TestResult};
use proptest::prelude::*;
use std::cmp::Ordering;

/// Strategy for seasonal monthly values with a trend and bounded noise.
fn seasonal_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        (
            50.0..100.0_f64,
            1.0..10.0_f64,
            prop::collection::vec(-1.0..1.0_f64, len),
        )
            .prop_map(|(base, amplitude, noise)| {
                noise
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        base + 0.1 * i as f64
                            + amplitude * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
                            + e
                    })
                    .collect()
            })
    })
}

fn spec_strategy() -> impl Strategy<Value = SarimaSpec> {
    (0..4usize, 0..3usize, 0..4usize, 0..2usize, 0..2usize).prop_map(|(p, d, q, bp, bq)| {
        SarimaSpec::airline(12)
            .with_regular(p, d, q)
            .with_seasonal(bp, 1, bq)
    })
}

fn statistics_strategy() -> impl Strategy<Value = ModelStatistics> {
    (-50.0..50.0_f64, 0..6usize, spec_strategy()).prop_map(|(bic, outliers, spec)| {
        let test = TestResult {
            statistic: 0.0,
            p_value: 0.5,
        };
        ModelStatistics {
            spec,
            observations: 120,
            effective_observations: 107,
            outliers,
            narma: spec.narma(),
            nx: outliers,
            ljung_box: LjungBoxResult {
                statistic: 20.0,
                p_value: 0.5,
                lags: 24,
                df: 22,
            },
            seasonal_ljung_box: None,
            skewness: test,
            split_sample: SplitSampleResult {
                tail_length: 10,
                mean_test: test,
                variance_test: test,
            },
            // Coarse grid so ties actually occur.
            bic: (bic * 2.0).round() / 2.0,
            se: 1.0,
            shape: AirlineShape::of(&spec),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn identification_terminates(values in seasonal_values_strategy(60, 120)) {
        let series = TsData::monthly(2000, values).unwrap();
        let model = AmiModule::new(AmiSpec::default()).process(&series).unwrap();
        prop_assert!(model.iterations <= 10);
        prop_assert!(model.critical_values.iter().all(|&cv| cv >= MINCV));
        prop_assert!(model.critical_values.windows(2).all(|w| w[1] <= w[0]));
        prop_assert!(model.estimation.bicc().is_finite());
    }

    #[test]
    fn identification_is_deterministic(values in seasonal_values_strategy(60, 96)) {
        let series = TsData::monthly(2000, values).unwrap();
        let module = AmiModule::new(AmiSpec::default());
        let a = module.process(&series).unwrap();
        let b = module.process(&series).unwrap();
        prop_assert_eq!(a.spec(), b.spec());
        prop_assert_eq!(a.outliers(), b.outliers());
        prop_assert_eq!(a.iterations, b.iterations);
    }
}

proptest! {
    #[test]
    fn comparator_is_reflexive(a in statistics_strategy()) {
        prop_assert_eq!(compare(&a, &a, Preference::Bic), Ordering::Equal);
    }

    #[test]
    fn comparator_is_antisymmetric(a in statistics_strategy(), b in statistics_strategy()) {
        prop_assert_eq!(
            compare(&a, &b, Preference::Bic),
            compare(&b, &a, Preference::Bic).reverse()
        );
    }

    #[test]
    fn comparator_is_transitive(
        a in statistics_strategy(),
        b in statistics_strategy(),
        c in statistics_strategy(),
    ) {
        let ab = compare(&a, &b, Preference::Bic);
        let bc = compare(&b, &c, Preference::Bic);
        if ab != Ordering::Greater && bc != Ordering::Greater {
            prop_assert_ne!(compare(&a, &c, Preference::Bic), Ordering::Greater);
        }
    }
}
