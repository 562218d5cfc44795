//! Structured error handling with context and recovery suggestions
//!
//! This module provides structured error types with:
//! - Detailed error context
//! - Recovery suggestions
//! - Error codes for programmatic handling
//! - Serializable error reports

use rowfinder_geo::GeoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General errors (1xxx)
    Unknown = 1000,
    Internal = 1001,

    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    // Configuration errors (3xxx)
    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    ConfigValidationError = 3003,
    InvalidConfigValue = 3004,

    // Input errors (4xxx)
    InputError = 4000,
    InvalidInput = 4001,
    InputParseError = 4002,

    // Geometry errors (5xxx)
    GeometryError = 5000,
    InvalidCellSize = 5001,
    InvalidCoordinate = 5002,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            4 => "Input",
            5 => "Geometry",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert to a serializable report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.code.code() / 1000 {
            3 => exit_codes::CONFIG_ERROR,
            4 => exit_codes::INPUT_ERROR,
            5 => exit_codes::GEOMETRY_ERROR,
            _ => exit_codes::FAILURE,
        }
    }

    // Convenience constructors

    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the file exists and you have read permissions")
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a rowfinder.toml file or use --config to specify a path")
    }

    pub fn invalid_config_value(field: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfigValue,
            format!("Invalid value for {}: {}", field, message.into()),
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
            .with_suggestion("Input must be a JSON array of feature records")
    }
}

/// Serializable error report for logging and API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 3;
    pub const INPUT_ERROR: i32 = 4;
    pub const GEOMETRY_ERROR: i32 = 5;
}

// Implement From for common error types

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::InputParseError, format!("JSON parse error: {}", err))
            .with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

impl From<GeoError> for Error {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::Io(io) => Error::from(io),
            GeoError::JsonError(json) => Error::from(json),
            GeoError::InvalidInput(_) => Error::invalid_input(err.to_string()).with_source(err),
            GeoError::InvalidCellSize(_) => {
                Error::new(ErrorCode::InvalidCellSize, err.to_string())
                    .with_suggestion("Use a positive cell size such as 0.001 degrees")
                    .with_source(err)
            }
            GeoError::UnknownReportFormat(_) => {
                Error::new(ErrorCode::InvalidConfigValue, err.to_string()).with_source(err)
            }
            GeoError::NoConvergence { .. } => {
                Error::new(ErrorCode::GeometryError, err.to_string()).with_source(err)
            }
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::InvalidCellSize.to_string(), "E5001");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::IoError.category(), "IO");
        assert_eq!(ErrorCode::InvalidInput.category(), "Input");
        assert_eq!(ErrorCode::GeometryError.category(), "Geometry");
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::file_not_found("/path/to/features.json")
            .with_context("While loading features");

        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert!(err.context.is_some());
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_error_report_serialization() {
        let err = Error::config("Bad threshold").with_context("While loading rowfinder.toml");

        let report = err.to_report();
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("E3000"));
        assert!(json.contains("Configuration"));
    }

    #[test]
    fn test_geo_error_conversion() {
        let err: Error = GeoError::InvalidInput("expected an array".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.exit_code(), exit_codes::INPUT_ERROR);

        let err: Error = GeoError::InvalidCellSize(0.0).into();
        assert_eq!(err.code, ErrorCode::InvalidCellSize);
        assert_eq!(err.exit_code(), exit_codes::GEOMETRY_ERROR);

        let err: Error = GeoError::UnknownReportFormat("pdf".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = GeoError::Io(io).into();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert_eq!(err.exit_code(), exit_codes::FAILURE);
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(Error::new(ErrorCode::IoError, "disk full"));
        let err = result.context("While writing report").unwrap_err();
        assert_eq!(err.context.as_deref(), Some("While writing report"));
    }
}
