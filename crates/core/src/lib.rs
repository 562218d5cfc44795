//! Core utilities for rowfinder
//!
//! This crate provides shared functionality for the rowfinder tools:
//!
//! - **Error handling**: Structured errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration for the grid, matcher and reports
//!
//! # Example
//!
//! ```rust,no_run
//! use rowfinder_core::config::Config;
//!
//! let config = Config::load(None).expect("Invalid configuration");
//! let thresholds = config.schema.matching.thresholds();
//! assert!(thresholds.proximity_m >= 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, MatchingConfig, ReportConfig};
    pub use crate::error::{Error, ErrorCode, Result, ResultExt, exit_codes};
}
