//! Calendar regressors consumed by the RegARIMA model.
//!
//! The modelling code only talks to the [`CalendarProvider`] trait; the
//! default [`GregorianCalendar`] derives trading-day contrasts, the
//! leap-year regressor and the Easter effect from the Gregorian calendar.
//! All functions are pure, so a provider can be shared between runs.

pub mod easter;
pub mod trading_days;

use crate::core::TsPeriod;

pub use easter::easter_date;
pub use trading_days::{day_counts, is_leap_year, TradingDaysType};

/// Source of calendar regression variables.
pub trait CalendarProvider: std::fmt::Debug + Send + Sync {
    /// Trading-day contrasts, one vector per regressor.
    fn trading_days(&self, start: TsPeriod, len: usize, kind: TradingDaysType) -> Vec<Vec<f64>>;

    /// Length-of-period (leap-year) regressor.
    fn leap_year(&self, start: TsPeriod, len: usize) -> Vec<f64>;

    /// Easter regressor for a window of `duration` days before Easter Sunday.
    fn easter(&self, start: TsPeriod, len: usize, duration: usize) -> Vec<f64>;
}

/// Plain Gregorian calendar without national holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct GregorianCalendar;

impl CalendarProvider for GregorianCalendar {
    fn trading_days(&self, start: TsPeriod, len: usize, kind: TradingDaysType) -> Vec<Vec<f64>> {
        trading_days::trading_days(start, len, kind)
    }

    fn leap_year(&self, start: TsPeriod, len: usize) -> Vec<f64> {
        trading_days::leap_year(start, len)
    }

    fn easter(&self, start: TsPeriod, len: usize, duration: usize) -> Vec<f64> {
        easter::easter(start, len, duration)
    }
}
