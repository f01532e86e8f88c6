//! Easter date computation and Easter regressors.

use crate::core::TsPeriod;
use chrono::{Datelike, Duration, NaiveDate};
use std::sync::OnceLock;

/// Years used to compute the long-run mean of the Easter regressor.
const MEAN_FIRST_YEAR: i32 = 1900;
const MEAN_LAST_YEAR: i32 = 2199;

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_date(year: i32) -> NaiveDate {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap_or(NaiveDate::MIN)
}

/// Easter dates for the reference years, computed once per process.
fn reference_dates() -> &'static [NaiveDate] {
    static DATES: OnceLock<Vec<NaiveDate>> = OnceLock::new();
    DATES.get_or_init(|| (MEAN_FIRST_YEAR..=MEAN_LAST_YEAR).map(easter_date).collect())
}

/// Share of the `duration` days preceding `easter` that fall in `period`.
fn share_in_period(period: &TsPeriod, easter: NaiveDate, duration: usize) -> f64 {
    if duration == 0 {
        return 0.0;
    }
    let inside = (1..=duration as i64)
        .filter(|&k| period.contains(easter - Duration::days(k)))
        .count();
    inside as f64 / duration as f64
}

/// Long-run mean of the raw Easter share for the period at `position`.
fn long_run_mean(frequency: usize, position: usize, duration: usize) -> f64 {
    let dates = reference_dates();
    let total: f64 = dates
        .iter()
        .filter_map(|easter| {
            TsPeriod::new(frequency, easter.year(), position)
                .ok()
                .map(|p| share_in_period(&p, *easter, duration))
        })
        .sum();
    total / dates.len() as f64
}

/// Easter regressor: share of the `duration` days before Easter falling in
/// each period, minus its long-run mean for that position in the year.
pub fn easter(start: TsPeriod, len: usize, duration: usize) -> Vec<f64> {
    let frequency = start.frequency();
    let means: Vec<f64> = (0..frequency)
        .map(|pos| long_run_mean(frequency, pos, duration))
        .collect();

    (0..len)
        .map(|i| {
            let period = start.plus(i);
            let easter = easter_date(period.start_date().year());
            share_in_period(&period, easter, duration) - means[period.position()]
        })
        .collect()
}
