//! Shared terminal helpers for rowfinder
//!
//! - Global command-line flags
//! - Status messages and value formatting
//! - Spinners for long-running steps

#![warn(missing_docs)]

pub mod args;
pub mod output;
pub mod progress;

pub use args::{GlobalArgs, OutputFormat};
