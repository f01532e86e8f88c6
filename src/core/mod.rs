//! Core data structures for regular time series.

mod series;

pub use series::{TsData, TsPeriod, SUPPORTED_FREQUENCIES};
