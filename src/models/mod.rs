//! Time series models.

pub mod arima;
pub mod regarima;
