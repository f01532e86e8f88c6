//! Automatic identification of RegARIMA models.
//!
//! [`AmiModule`] drives a [`RegArimaModelling`](crate::models::regarima::RegArimaModelling)
//! context through pre-tests (transformation, seasonality, calendar effects)
//! and a bounded sequence of rounds, each combining differencing, ARMA
//! order and outlier searches. Candidate models are compared with the
//! current reference model; the loop ends when the reference passes the
//! Ljung-Box check, after the fallback model, or at the iteration cap.
//!
//! # Example
//!
//! ```
//! use anofox_tramo::ami::{AmiModule, AmiSpec};
//! use anofox_tramo::core::TsData;
//!
//! let values: Vec<f64> = (0..72)
//!     .map(|i| 100.0 + 0.5 * i as f64 + 8.0 * ((i % 12) as f64 - 5.5) + ((i * 7) % 5) as f64)
//!     .collect();
//! let series = TsData::monthly(2015, values).unwrap();
//!
//! let model = AmiModule::new(AmiSpec::fixed()).process(&series).unwrap();
//! assert_eq!(model.spec().to_string(), "(0,1,1)(0,1,1)");
//! assert_eq!(model.estimation_count, 1);
//! ```

pub mod arma;
pub mod comparator;
pub mod config;
pub mod differencing;
pub mod model;
mod orchestrator;
pub mod outliers;
pub mod regression;
pub mod seasonality;
pub mod state;
pub mod statistics;
pub mod transformation;

pub use comparator::{compare, preference_between, Preference};
pub use config::{calc_cv, AmiSpec, TradingDaysMode, TransformSpec, MINCV};
pub use model::PreprocessingModel;
pub use orchestrator::AmiModule;
pub use state::{AmiEvent, AmiState, AmiStatus};
pub use statistics::{AirlineShape, ModelStatistics};

/// Outcome of one identification module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingResult {
    /// The model description was modified.
    Changed,
    /// The module ran and kept the model as is.
    Unchanged,
    /// The module did not run.
    Unprocessed,
    /// The module could not run to completion.
    Failed,
}
