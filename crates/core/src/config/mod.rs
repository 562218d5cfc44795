//! Configuration loading and schema definitions
//!
//! Settings for the grid, the matcher and report output.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
