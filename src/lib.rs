//! # anofox-tramo
//!
//! Automatic identification of RegARIMA models in the TRAMO tradition.
//!
//! Given a regular monthly, quarterly or lower-frequency series, the
//! [`AmiModule`](ami::AmiModule) selects a log/level transformation,
//! calendar regressors, differencing orders, ARMA orders and outliers, and
//! returns an estimated [`PreprocessingModel`](ami::PreprocessingModel).

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::manual_memcpy)]

pub mod ami;
pub mod calendar;
pub mod core;
pub mod error;
pub mod models;
pub mod utils;
pub mod validation;

pub use error::{ModellingError, Result};

pub mod prelude {
    pub use crate::ami::{AmiModule, AmiSpec, AmiStatus, PreprocessingModel, TransformSpec};
    pub use crate::core::{TsData, TsPeriod};
    pub use crate::error::{ModellingError, Result};
    pub use crate::models::arima::SarimaSpec;
    pub use crate::models::regarima::{OutlierKey, OutlierType};
}
