//! Selection of calendar regression effects.
//!
//! Trading days, length of period and Easter are either added as
//! configured or, in automatic mode, tested on the starting model and kept
//! only when significant. The 7-group and 2-group trading-day schemes are
//! tested jointly (F or Wald) and the significant one with the lower BICC
//! is retained.

use super::config::{AmiSpec, TradingDaysMode, T_THRESHOLD};
use super::ProcessingResult;
use crate::calendar::TradingDaysType;
use crate::error::Result;
use crate::models::regarima::{RegArimaEstimation, RegArimaModelling, Variable};
use crate::utils::wald_statistic;
use crate::validation::{chi_squared_sf, fisher_sf};
use tracing::debug;

/// Joint significance of one regression block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// Joint test that the coefficients of `variable` are all zero.
///
/// Returns `None` when the variable is not part of the estimation or its
/// covariance block is singular.
pub fn joint_test(
    estimation: &RegArimaEstimation,
    variable: &Variable,
    mode: TradingDaysMode,
) -> Option<JointTest> {
    let indexes: Vec<usize> = variable
        .coefficient_names()
        .iter()
        .map(|name| estimation.coefficient_names.iter().position(|n| n == name))
        .collect::<Option<Vec<_>>>()?;
    let covariance = estimation.likelihood.covariance();
    let coefficients: Vec<f64> = indexes
        .iter()
        .map(|&i| estimation.likelihood.coefficients[i])
        .collect();
    let block: Vec<Vec<f64>> = indexes
        .iter()
        .map(|&i| indexes.iter().map(|&j| covariance[i][j]).collect())
        .collect();
    let wald = wald_statistic(&coefficients, &block)?;
    let k = indexes.len();

    match mode {
        TradingDaysMode::AutomaticWald => Some(JointTest {
            statistic: wald,
            p_value: chi_squared_sf(wald, k),
        }),
        _ => {
            let dof = estimation
                .observations()
                .saturating_sub(estimation.narma() + estimation.nx());
            let f = wald / k as f64;
            Some(JointTest {
                statistic: f,
                p_value: fisher_sf(f, k, dof.max(1)),
            })
        }
    }
}

struct Candidate {
    kind: TradingDaysType,
    bicc: f64,
    leap_year_t: Option<f64>,
}

/// Add the calendar effects requested by `spec` to the model.
///
/// # Errors
/// `DuplicateVariable` if a calendar variable is already part of the model.
pub fn process_calendar_effects(
    ctx: &mut RegArimaModelling,
    spec: &AmiSpec,
) -> Result<ProcessingResult> {
    let start = ctx.description().series().start();
    let len = ctx.description().len();
    let calendar = ctx.calendar().clone();
    let precision = spec.intermediate_precision;
    let mut changed = false;

    if spec.uses_trading_days() {
        let leap_year = Variable::leap_year(calendar.leap_year(start, len));
        if spec.trading_days_mode.is_automatic() {
            let mut best: Option<Candidate> = None;
            for kind in [TradingDaysType::TradingDays, TradingDaysType::WorkingDays] {
                let td = Variable::trading_days(kind, calendar.trading_days(start, len, kind));
                ctx.add_variable(td.clone())?;
                if spec.leap_year {
                    ctx.add_variable(leap_year.clone())?;
                }
                if ctx.estimate(precision) {
                    if let Some(estimation) = ctx.estimation() {
                        let test = joint_test(estimation, &td, spec.trading_days_mode);
                        debug!(scheme = kind.label(), test = ?test, "trading days tested");
                        let significant =
                            test.is_some_and(|t| t.p_value < spec.regression_test_pvalue);
                        let bicc = estimation.bicc();
                        if significant && best.as_ref().map_or(true, |b| bicc < b.bicc) {
                            best = Some(Candidate {
                                kind,
                                bicc,
                                leap_year_t: estimation.t_stat(leap_year.name()),
                            });
                        }
                    }
                }
                if spec.leap_year {
                    ctx.remove_variable(leap_year.name());
                }
                ctx.remove_variable(td.name());
            }

            if let Some(best) = best {
                let kind = best.kind;
                ctx.add_variable(Variable::trading_days(
                    kind,
                    calendar.trading_days(start, len, kind),
                ))?;
                let keep_lp = best.leap_year_t.is_some_and(|t| t.abs() >= T_THRESHOLD);
                if spec.leap_year && keep_lp {
                    ctx.add_variable(leap_year)?;
                }
                debug!(scheme = kind.label(), leap_year = keep_lp, "trading days selected");
                changed = true;
            } else if spec.leap_year {
                changed |= keep_if_significant(ctx, leap_year, precision)?;
            }
        } else {
            if spec.trading_days != TradingDaysType::None {
                let kind = spec.trading_days;
                ctx.add_variable(Variable::trading_days(
                    kind,
                    calendar.trading_days(start, len, kind),
                ))?;
                changed = true;
            }
            if spec.leap_year {
                ctx.add_variable(leap_year)?;
                changed = true;
            }
        }
    }

    if spec.easter {
        let easter = Variable::easter(
            spec.easter_duration,
            calendar.easter(start, len, spec.easter_duration),
        );
        if spec.easter_test {
            changed |= keep_if_significant(ctx, easter, precision)?;
        } else {
            ctx.add_variable(easter)?;
            changed = true;
        }
    }

    Ok(if changed {
        ProcessingResult::Changed
    } else {
        ProcessingResult::Unchanged
    })
}

/// Add a one-column variable and keep it when `|t| > 1.96`.
fn keep_if_significant(
    ctx: &mut RegArimaModelling,
    variable: Variable,
    precision: f64,
) -> Result<bool> {
    let name = variable.name().to_string();
    ctx.add_variable(variable)?;
    let t = if ctx.estimate(precision) {
        ctx.estimation().and_then(|e| e.t_stat(&name))
    } else {
        None
    };
    let keep = t.is_some_and(|t| t.abs() > T_THRESHOLD);
    debug!(variable = %name, t = ?t, keep, "regression effect tested");
    if !keep {
        ctx.remove_variable(&name);
    }
    Ok(keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarProvider, GregorianCalendar};
    use crate::core::TsData;
    use crate::models::arima::SarimaSpec;
    use crate::models::regarima::ModelDescription;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn series_with(effect: impl Fn(&TsData, usize) -> f64, seed: u64) -> TsData {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 0.5).unwrap();
        let base = TsData::monthly(2000, vec![0.0; 180]).unwrap();
        let mut level = 100.0;
        let values: Vec<f64> = (0..180)
            .map(|i| {
                level += normal.sample(&mut rng);
                level + 3.0 * (i % 12) as f64 + effect(&base, i)
            })
            .collect();
        base.with_values(values).unwrap()
    }

    fn context(series: TsData) -> RegArimaModelling {
        RegArimaModelling::new(ModelDescription::new(series, SarimaSpec::airline(12)))
    }

    #[test]
    fn default_mode_adds_unconditionally() {
        let series = series_with(|_, _| 0.0, 1);
        let mut ctx = context(series);
        let spec = AmiSpec::default()
            .with_trading_days(TradingDaysType::WorkingDays, TradingDaysMode::Default)
            .with_leap_year(true);
        let result = process_calendar_effects(&mut ctx, &spec).unwrap();
        assert_eq!(result, ProcessingResult::Changed);
        assert!(ctx.description().contains("td2"));
        assert!(ctx.description().contains("lp"));
    }

    #[test]
    fn strong_trading_day_effect_is_kept() {
        let series = series_with(
            |base, i| {
                let counts = crate::calendar::day_counts(&base.period(i));
                let week: usize = counts[..5].iter().sum();
                0.8 * (week as f64 - 2.5 * (counts[5] + counts[6]) as f64)
            },
            2,
        );
        let mut ctx = context(series);
        let spec = AmiSpec::default()
            .with_trading_days(TradingDaysType::None, TradingDaysMode::AutomaticF);
        let result = process_calendar_effects(&mut ctx, &spec).unwrap();
        assert_eq!(result, ProcessingResult::Changed);
        let names: Vec<&str> = ctx.description().variables().iter().map(|v| v.name()).collect();
        assert_eq!(names.len(), 1);
        assert!(names[0] == "td2" || names[0] == "td7");
    }

    #[test]
    fn absent_effects_are_dropped() {
        let series = series_with(|_, _| 0.0, 3);
        let mut ctx = context(series);
        let spec = AmiSpec::default()
            .with_trading_days(TradingDaysType::None, TradingDaysMode::AutomaticWald)
            .with_easter(6);
        process_calendar_effects(&mut ctx, &spec).unwrap();
        // Only significant effects may remain; a clean series rarely has any.
        assert!(ctx.description().variables().len() <= 1);
    }

    #[test]
    fn joint_test_on_estimated_block() {
        let series = series_with(
            |base, i| {
                let counts = crate::calendar::day_counts(&base.period(i));
                2.0 * (counts[0] as f64 - counts[6] as f64)
            },
            4,
        );
        let mut ctx = context(series.clone());
        let td = Variable::trading_days(
            TradingDaysType::TradingDays,
            GregorianCalendar.trading_days(series.start(), series.len(), TradingDaysType::TradingDays),
        );
        ctx.add_variable(td.clone()).unwrap();
        assert!(ctx.estimate(1e-4));
        let estimation = ctx.estimation().unwrap();
        let f = joint_test(estimation, &td, TradingDaysMode::AutomaticF).unwrap();
        let w = joint_test(estimation, &td, TradingDaysMode::AutomaticWald).unwrap();
        assert!(f.p_value < 0.01);
        assert!(w.p_value < 0.01);
        assert!((w.statistic / 6.0 - f.statistic).abs() < 1e-9);
    }
}
