//! Trading-day contrasts and length-of-period regressors.

use crate::core::TsPeriod;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Grouping of the days of the week used to build trading-day regressors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradingDaysType {
    /// No trading-day effect.
    #[default]
    None,
    /// Two groups: working days (Mon-Fri) vs. weekend.
    WorkingDays,
    /// Seven groups: each weekday contrasted with Sunday.
    TradingDays,
}

impl TradingDaysType {
    /// Number of regression columns generated by the grouping.
    pub fn columns(&self) -> usize {
        match self {
            TradingDaysType::None => 0,
            TradingDaysType::WorkingDays => 1,
            TradingDaysType::TradingDays => 6,
        }
    }

    /// Short label used in variable names.
    pub fn label(&self) -> &'static str {
        match self {
            TradingDaysType::None => "none",
            TradingDaysType::WorkingDays => "td2",
            TradingDaysType::TradingDays => "td7",
        }
    }
}

/// Number of Mondays, Tuesdays, ..., Sundays inside a period.
pub fn day_counts(period: &TsPeriod) -> [usize; 7] {
    let mut counts = [0usize; 7];
    let end = period.end_date();
    for day in period.start_date().iter_days().take_while(|d| *d < end) {
        counts[day.weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}

/// Trading-day contrasts, one column per regressor.
///
/// * `TradingDays`: `N(Mon) - N(Sun)`, ..., `N(Sat) - N(Sun)`
/// * `WorkingDays`: `N(Mon..Fri) - 5/2 N(Sat, Sun)`
pub fn trading_days(start: TsPeriod, len: usize, kind: TradingDaysType) -> Vec<Vec<f64>> {
    let ncols = kind.columns();
    let mut columns = vec![Vec::with_capacity(len); ncols];
    if ncols == 0 {
        return columns;
    }

    for i in 0..len {
        let counts = day_counts(&start.plus(i));
        match kind {
            TradingDaysType::TradingDays => {
                let sunday = counts[6] as f64;
                for (j, column) in columns.iter_mut().enumerate() {
                    column.push(counts[j] as f64 - sunday);
                }
            }
            TradingDaysType::WorkingDays => {
                let week: usize = counts[..5].iter().sum();
                let weekend = (counts[5] + counts[6]) as f64;
                columns[0].push(week as f64 - 2.5 * weekend);
            }
            TradingDaysType::None => {}
        }
    }
    columns
}

/// Leap-year regressor: +0.75 for periods holding a 29-day February,
/// -0.25 for periods holding a 28-day February, 0 otherwise.
pub fn leap_year(start: TsPeriod, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let period = start.plus(i);
            let year = period.start_date().year();
            match NaiveDate::from_ymd_opt(year, 2, 1) {
                Some(feb) if period.contains(feb) => {
                    if is_leap_year(year) {
                        0.75
                    } else {
                        -0.25
                    }
                }
                _ => 0.0,
            }
        })
        .collect()
}

/// Gregorian leap-year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_counts_january_2024() {
        // January 2024 starts on a Monday: 5 Mon/Tue/Wed, 4 of the others.
        let p = TsPeriod::monthly(2024, 1).unwrap();
        assert_eq!(day_counts(&p), [5, 5, 5, 4, 4, 4, 4]);
    }

    #[test]
    fn td7_contrasts() {
        let start = TsPeriod::monthly(2024, 1).unwrap();
        let td = trading_days(start, 2, TradingDaysType::TradingDays);
        assert_eq!(td.len(), 6);
        assert_eq!(td[0][0], 1.0); // Mondays - Sundays in January 2024
        // February 2024 (29 days, starts Thursday): Thu has 5 days.
        assert_eq!(td[3][1], 1.0);
        assert_eq!(td[0][1], 0.0);
    }

    #[test]
    fn td2_contrast() {
        let start = TsPeriod::monthly(2024, 1).unwrap();
        let td = trading_days(start, 1, TradingDaysType::WorkingDays);
        assert_eq!(td.len(), 1);
        // 23 working days, 8 weekend days
        assert_eq!(td[0][0], 23.0 - 2.5 * 8.0);
    }

    #[test]
    fn no_trading_days() {
        let start = TsPeriod::monthly(2024, 1).unwrap();
        assert!(trading_days(start, 12, TradingDaysType::None).is_empty());
    }

    #[test]
    fn leap_year_regressor() {
        let start = TsPeriod::monthly(2023, 1).unwrap();
        let lp = leap_year(start, 14);
        assert_eq!(lp[1], -0.25);
        assert_eq!(lp[13], 0.75);
        assert_eq!(lp.iter().filter(|v| **v != 0.0).count(), 2);

        let quarters = leap_year(TsPeriod::quarterly(2024, 1).unwrap(), 4);
        assert_eq!(quarters, vec![0.75, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn leap_year_rule() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
    }
}
