//! Error types for the anofox-tramo library.

use thiserror::Error;

/// Result type alias for modelling operations.
pub type Result<T> = std::result::Result<T, ModellingError>;

/// Errors that can occur while building or identifying a RegARIMA model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModellingError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value or inconsistent configuration.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Missing or non-finite values detected.
    #[error("missing values detected in data")]
    MissingValues,

    /// Periodicity not supported by the calendar machinery.
    #[error("unsupported frequency: {0} (expected one of 1, 2, 3, 4, 6, 12)")]
    UnsupportedFrequency(usize),

    /// A regression variable with the same name is already part of the model.
    #[error("duplicate regression variable: {0}")]
    DuplicateVariable(String),

    /// The cross-product matrix of a regression is not positive definite.
    #[error("singular regression matrix")]
    SingularMatrix,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// No model could be estimated within the iteration cap.
    #[error("estimation did not converge: {0}")]
    NonConvergence(String),
}
