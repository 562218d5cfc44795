//! Rendering matched pairs as text or JSON.

use crate::grid::SpatialGrid;
use crate::matcher::MatchedPair;
use crate::{GeoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Output format of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Plain-text blocks, one per pair
    #[default]
    Text,
    /// JSON array of pair objects
    Json,
}

impl FromStr for ReportFormat {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(GeoError::UnknownReportFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Counts describing a matching run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Features in the input
    pub features: usize,
    /// Segments indexed
    pub segments: usize,
    /// Occupied grid cells
    pub cells: usize,
    /// Matched segment pairs
    pub pairs: usize,
    /// Distinct feature-name pairs among the matches
    pub feature_pairs: usize,
}

impl ReportSummary {
    /// Summarizes a grid and the pairs found in it.
    pub fn new(grid: &SpatialGrid, pairs: &[MatchedPair]) -> Self {
        let feature_pairs: BTreeSet<(&str, &str)> =
            pairs.iter().map(MatchedPair::names_sorted).collect();
        Self {
            features: grid.feature_count(),
            segments: grid.segment_count(),
            cells: grid.cell_count(),
            pairs: pairs.len(),
            feature_pairs: feature_pairs.len(),
        }
    }
}

/// Pairs in report order: by owner names, then segment ids.
pub fn sorted_pairs(pairs: &[MatchedPair]) -> Vec<&MatchedPair> {
    let mut sorted: Vec<&MatchedPair> = pairs.iter().collect();
    sorted.sort_by(|a, b| {
        (a.name_a.as_str(), a.name_b.as_str(), a.id_a, a.id_b)
            .cmp(&(b.name_a.as_str(), b.name_b.as_str(), b.id_a, b.id_b))
    });
    sorted
}

/// Renders one text block per pair.
///
/// # Example
/// ```
/// use rowfinder_geo::render_text;
///
/// assert_eq!(render_text(&[]), "");
/// ```
pub fn render_text(pairs: &[MatchedPair]) -> String {
    let mut out = String::new();
    for pair in sorted_pairs(pairs) {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{} and {} share the same ROW", pair.name_a, pair.name_b);
        let _ = writeln!(out, "Segment from {}: {}", pair.name_a, pair.segment_a);
        let _ = writeln!(out, "Segment from {}: {}", pair.name_b, pair.segment_b);
        let _ = writeln!(out, "Distance between segments: {:.2} meters", pair.distance_m);
        let _ = writeln!(out, "Angle difference: {:.2} degrees", pair.angle_diff_deg);
        out.push('\n');
    }
    out
}

/// Renders the pairs as a JSON array, in report order.
pub fn render_json(pairs: &[MatchedPair]) -> serde_json::Value {
    serde_json::Value::Array(
        sorted_pairs(pairs)
            .into_iter()
            .map(|pair| {
                serde_json::json!({
                    "name_a": pair.name_a,
                    "name_b": pair.name_b,
                    "segment_a": pair.segment_a,
                    "segment_b": pair.segment_b,
                    "distance_m": pair.distance_m,
                    "angle_diff_deg": pair.angle_diff_deg,
                })
            })
            .collect(),
    )
}

/// Renders in the requested format.
pub fn render(pairs: &[MatchedPair], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(pairs)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&render_json(pairs))?),
    }
}

/// Writes a report file, creating parent directories as needed.
pub fn write_report(
    path: impl AsRef<Path>,
    pairs: &[MatchedPair],
    format: ReportFormat,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render(pairs, format)?)?;
    tracing::info!(path = %path.display(), pairs = pairs.len(), %format, "report written");
    Ok(())
}
