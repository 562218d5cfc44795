//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Grid cell size is not a finite positive number
    #[error("Invalid cell size: {0} (must be finite and greater than zero)")]
    InvalidCellSize(f64),

    /// Vincenty iteration did not converge (nearly antipodal points)
    #[error("Geodesic did not converge after {iterations} iterations")]
    NoConvergence {
        /// Iterations performed before giving up
        iterations: usize,
    },

    /// The input collection is not a list of features
    #[error("Invalid feature input: {0}")]
    InvalidInput(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error while reading features or writing reports
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report format name is not `text` or `json`
    #[error("Unknown report format '{0}' (expected text or json)")]
    UnknownReportFormat(String),
}

/// Error code for integration with rowfinder-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid grid cell size
    InvalidCellSize = 10002,
    /// Geodesic iteration failure
    NoConvergence = 10003,
    /// Input is not a feature list
    InvalidInput = 10004,
    /// JSON parsing error
    JsonParsing = 10005,
    /// IO error
    Io = 10006,
    /// Unknown report format name
    UnknownReportFormat = 10007,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCellSize(_) => GeoErrorCode::InvalidCellSize,
            GeoError::NoConvergence { .. } => GeoErrorCode::NoConvergence,
            GeoError::InvalidInput(_) => GeoErrorCode::InvalidInput,
            GeoError::JsonError(_) => GeoErrorCode::JsonParsing,
            GeoError::Io(_) => GeoErrorCode::Io,
            GeoError::UnknownReportFormat(_) => GeoErrorCode::UnknownReportFormat,
        }
    }
}
