//! Configuration schema definitions

use crate::error::{Error, Result};
use rowfinder_geo::{DEFAULT_CELL_SIZE_DEGREES, MatchThresholds, ReportFormat};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl ConfigSchema {
    /// Check values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        let m = &self.matching;

        if !m.cell_size_degrees.is_finite() || m.cell_size_degrees <= 0.0 {
            return Err(Error::invalid_config_value(
                "matching.cell_size_degrees",
                format!("{} (must be greater than zero)", m.cell_size_degrees),
            ));
        }
        if !m.proximity_threshold_meters.is_finite() || m.proximity_threshold_meters < 0.0 {
            return Err(Error::invalid_config_value(
                "matching.proximity_threshold_meters",
                format!("{} (must not be negative)", m.proximity_threshold_meters),
            ));
        }
        if !m.angle_threshold_degrees.is_finite()
            || !(0.0..=180.0).contains(&m.angle_threshold_degrees)
        {
            return Err(Error::invalid_config_value(
                "matching.angle_threshold_degrees",
                format!("{} (must be between 0 and 180)", m.angle_threshold_degrees),
            ));
        }

        Ok(())
    }
}

/// General run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default feature file when none is given on the command line
    #[serde(default)]
    pub input: Option<String>,

    /// Directory for report files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "outputs".to_string()
}

/// Grid and matcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Grid cell size in degrees
    #[serde(default = "default_cell_size")]
    pub cell_size_degrees: f64,

    /// Maximum midpoint distance in meters
    #[serde(default = "default_proximity")]
    pub proximity_threshold_meters: f64,

    /// Maximum bearing difference in degrees
    #[serde(default = "default_angle")]
    pub angle_threshold_degrees: f64,

    /// Run pair matching at all
    #[serde(default)]
    pub find_pairs: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            cell_size_degrees: default_cell_size(),
            proximity_threshold_meters: default_proximity(),
            angle_threshold_degrees: default_angle(),
            find_pairs: false,
        }
    }
}

impl MatchingConfig {
    /// Matcher thresholds from this configuration
    pub fn thresholds(&self) -> MatchThresholds {
        MatchThresholds::new(self.proximity_threshold_meters, self.angle_threshold_degrees)
    }
}

fn default_cell_size() -> f64 {
    DEFAULT_CELL_SIZE_DEGREES
}

fn default_proximity() -> f64 {
    MatchThresholds::default().proximity_m
}

fn default_angle() -> f64 {
    MatchThresholds::default().angle_deg
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report format
    #[serde(default)]
    pub format: ReportFormat,

    /// Report file name, relative to `general.output_dir`
    #[serde(default = "default_report_file")]
    pub file_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            file_name: default_report_file(),
        }
    }
}

fn default_report_file() -> String {
    "lines_in_same_row.txt".to_string()
}
