//! Regular time series anchored in the Gregorian calendar.

use crate::error::{ModellingError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Frequencies whose periods tile the calendar year.
pub const SUPPORTED_FREQUENCIES: [usize; 6] = [1, 2, 3, 4, 6, 12];

/// A single period of a regular series (e.g. March 2021 for monthly data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TsPeriod {
    /// Number of periods per year.
    frequency: usize,
    /// Calendar year.
    year: i32,
    /// 0-based position inside the year.
    position: usize,
}

impl TsPeriod {
    /// Create a new period.
    ///
    /// # Errors
    /// `UnsupportedFrequency` if `frequency` does not divide 12,
    /// `InvalidParameter` if `position >= frequency`.
    pub fn new(frequency: usize, year: i32, position: usize) -> Result<Self> {
        if !SUPPORTED_FREQUENCIES.contains(&frequency) {
            return Err(ModellingError::UnsupportedFrequency(frequency));
        }
        if position >= frequency {
            return Err(ModellingError::InvalidParameter(format!(
                "period position {} out of range for frequency {}",
                position, frequency
            )));
        }
        Ok(Self {
            frequency,
            year,
            position,
        })
    }

    /// Monthly period, `month` in 1..=12.
    pub fn monthly(year: i32, month: u32) -> Result<Self> {
        if month == 0 {
            return Err(ModellingError::InvalidParameter(
                "month must be in 1..=12".into(),
            ));
        }
        Self::new(12, year, month as usize - 1)
    }

    /// Quarterly period, `quarter` in 1..=4.
    pub fn quarterly(year: i32, quarter: u32) -> Result<Self> {
        if quarter == 0 {
            return Err(ModellingError::InvalidParameter(
                "quarter must be in 1..=4".into(),
            ));
        }
        Self::new(4, year, quarter as usize - 1)
    }

    pub fn frequency(&self) -> usize {
        self.frequency
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Period shifted by `n` periods.
    pub fn plus(&self, n: usize) -> Self {
        let absolute = self.position + n;
        Self {
            frequency: self.frequency,
            year: self.year + (absolute / self.frequency) as i32,
            position: absolute % self.frequency,
        }
    }

    /// Number of months covered by one period.
    pub fn months(&self) -> u32 {
        (12 / self.frequency) as u32
    }

    /// First day of the period.
    pub fn start_date(&self) -> NaiveDate {
        let month = self.position as u32 * self.months() + 1;
        first_of_month(self.year, month)
    }

    /// First day of the next period (exclusive end).
    pub fn end_date(&self) -> NaiveDate {
        self.plus(1).start_date()
    }

    /// Number of days in the period.
    pub fn length_in_days(&self) -> i64 {
        (self.end_date() - self.start_date()).num_days()
    }

    /// Whether the given date falls inside the period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date < self.end_date()
    }
}

/// First day of a month. Month arithmetic is always in range for periods
/// built through [`TsPeriod::new`].
fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// A regular, gap-free numeric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsData {
    start: TsPeriod,
    values: Vec<f64>,
}

impl TsData {
    /// Create a series starting at `start`.
    ///
    /// # Errors
    /// `EmptyData` for an empty vector, `MissingValues` if any value is NaN or infinite.
    pub fn new(start: TsPeriod, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ModellingError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModellingError::MissingValues);
        }
        Ok(Self { start, values })
    }

    /// Monthly series starting in January of `year`.
    pub fn monthly(year: i32, values: Vec<f64>) -> Result<Self> {
        Self::new(TsPeriod::monthly(year, 1)?, values)
    }

    /// Quarterly series starting in the first quarter of `year`.
    pub fn quarterly(year: i32, values: Vec<f64>) -> Result<Self> {
        Self::new(TsPeriod::quarterly(year, 1)?, values)
    }

    pub fn start(&self) -> TsPeriod {
        self.start
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of periods per year.
    pub fn frequency(&self) -> usize {
        self.start.frequency
    }

    /// Period of the observation at index `i`.
    pub fn period(&self, i: usize) -> TsPeriod {
        self.start.plus(i)
    }

    /// Iterator over the periods of the series.
    pub fn periods(&self) -> impl Iterator<Item = TsPeriod> + '_ {
        (0..self.values.len()).map(move |i| self.start.plus(i))
    }

    /// Same domain, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(ModellingError::DimensionMismatch {
                expected: self.values.len(),
                got: values.len(),
            });
        }
        Self::new(self.start, values)
    }

    /// Whether every observation is strictly positive (log-transformable).
    pub fn is_positive(&self) -> bool {
        self.values.iter().all(|&v| v > 0.0)
    }

    /// Calendar year of the first observation.
    pub fn first_year(&self) -> i32 {
        self.start.start_date().year()
    }
}
