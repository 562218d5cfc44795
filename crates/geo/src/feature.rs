//! Features, segments and the input boundary that produces them.
//!
//! Input is a JSON array of feature records. Coordinates may be given as
//! numeric `[lat, lon, alt?]` arrays or as KML coordinate text
//! (`lon,lat[,alt]` tuples separated by whitespace):
//!
//! ```json
//! [
//!   {"name": "Line A", "coordinate_sequences": [[[29.95, -95.05, 0.0], [29.951, -95.05]]]},
//!   {
//!     "name": "Line B",
//!     "geometry_type": "LineString",
//!     "coordinates": "-95.05,29.95,0 -95.05,29.951,0"
//!   }
//! ]
//! ```
//!
//! A coordinate that cannot be read is dropped with a warning. It also breaks
//! its line run, so no segment is formed across the gap.

use crate::{Coordinate, GeoError, Result, bearing};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Name given to features whose record carries no name.
pub const UNNAMED_FEATURE: &str = "Unnamed Placemark";

/// One straight edge between two consecutive points of a polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint
    pub start: Coordinate,
    /// Second endpoint
    pub end: Coordinate,
}

impl Segment {
    /// Creates a new segment.
    #[inline]
    pub fn new(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end }
    }

    /// Midpoint of the two endpoints (lat, lon and alt averaged).
    #[inline]
    pub fn midpoint(&self) -> Coordinate {
        self.start.midpoint(&self.end)
    }

    /// Initial bearing from `start` to `end`, in degrees.
    #[inline]
    pub fn bearing(&self) -> f64 {
        bearing(&self.start, &self.end)
    }

    /// Axis-aligned bounding box as `(min_lat, min_lon, max_lat, max_lon)`.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        (
            self.start.latitude.min(self.end.latitude),
            self.start.longitude.min(self.end.longitude),
            self.start.latitude.max(self.end.latitude),
            self.start.longitude.max(self.end.longitude),
        )
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// A named geographic entity with one or more polyline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name, used to label matches
    pub name: String,
    /// One coordinate sequence per disjoint line run
    pub coordinate_sequences: Vec<Vec<Coordinate>>,
}

impl Feature {
    /// Creates a feature from several line runs.
    pub fn new(name: impl Into<String>, coordinate_sequences: Vec<Vec<Coordinate>>) -> Self {
        Self {
            name: name.into(),
            coordinate_sequences,
        }
    }

    /// Creates a feature with a single line run.
    pub fn single(name: impl Into<String>, coordinates: Vec<Coordinate>) -> Self {
        Self::new(name, vec![coordinates])
    }

    /// Consecutive-point segments within each run, in order.
    ///
    /// Runs with fewer than two points contribute nothing, and segments
    /// never join the last point of one run to the first of the next.
    pub fn segments(&self) -> Vec<Segment> {
        self.coordinate_sequences
            .iter()
            .flat_map(|run| run.windows(2).map(|pair| Segment::new(pair[0], pair[1])))
            .collect()
    }

    /// Number of segments [`Feature::segments`] would return.
    pub fn segment_count(&self) -> usize {
        self.coordinate_sequences
            .iter()
            .map(|run| run.len().saturating_sub(1))
            .sum()
    }
}

/// Raw feature record as it arrives from the ETL layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureRecord {
    /// Feature name
    pub name: Option<String>,
    /// KML geometry type (`LineString`, `MultiGeometry`, ...)
    pub geometry_type: Option<String>,
    /// Numeric runs: each point is `[lat, lon]` or `[lat, lon, alt]`
    pub coordinate_sequences: Option<Vec<Vec<Value>>>,
    /// KML coordinate text for a single LineString
    pub coordinates: Option<String>,
    /// KML coordinate text, one entry per MultiGeometry LineString
    pub line_strings: Option<Vec<String>>,
}

impl FeatureRecord {
    /// Converts the record into a [`Feature`].
    ///
    /// Returns `None` for geometry types other than lines.
    pub fn into_feature(self) -> Option<Feature> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_FEATURE.to_string());

        if let Some(kind) = self.geometry_type.as_deref() {
            if kind != "LineString" && kind != "MultiGeometry" {
                debug!(feature = %name, geometry_type = kind, "skipping non-line feature");
                return None;
            }
        }

        let mut runs = Vec::new();

        for sequence in self.coordinate_sequences.unwrap_or_default() {
            runs.extend(split_runs(&name, sequence.iter().map(parse_point)));
        }
        if let Some(text) = self.coordinates.as_deref() {
            runs.extend(parse_kml_coordinates(&name, text));
        }
        for text in self.line_strings.unwrap_or_default() {
            runs.extend(parse_kml_coordinates(&name, &text));
        }

        Some(Feature::new(name, runs))
    }
}

/// Parses KML coordinate text (`lon,lat[,alt]` tuples) into line runs.
///
/// Malformed tuples are skipped with a warning and split the run at that
/// point. Altitude defaults to 0.
///
/// # Example
/// ```
/// use rowfinder_geo::parse_kml_coordinates;
///
/// let runs = parse_kml_coordinates("Line A", "-95.05,29.95,10 -95.05,29.951");
/// assert_eq!(runs.len(), 1);
/// assert_eq!(runs[0][0].latitude, 29.95);
/// assert_eq!(runs[0][0].altitude, 10.0);
/// assert_eq!(runs[0][1].altitude, 0.0);
/// ```
pub fn parse_kml_coordinates(owner: &str, text: &str) -> Vec<Vec<Coordinate>> {
    split_runs(owner, text.split_whitespace().map(parse_kml_tuple))
}

fn parse_kml_tuple(tuple: &str) -> std::result::Result<Coordinate, String> {
    let parts: Vec<&str> = tuple.split(',').map(str::trim).collect();
    if parts.len() < 2 {
        return Err(format!("expected lon,lat[,alt], got '{}'", tuple));
    }

    let number = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| format!("'{}' in '{}': {}", s, tuple, e))
    };

    let lon = number(parts[0])?;
    let lat = number(parts[1])?;
    let alt = match parts.get(2) {
        Some(s) if !s.is_empty() => number(s)?,
        _ => 0.0,
    };

    Ok(Coordinate::new(lat, lon, alt))
}

fn parse_point(value: &Value) -> std::result::Result<Coordinate, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("expected [lat, lon, alt?], got {}", value))?;
    if items.len() < 2 {
        return Err(format!("expected at least 2 values, got {}", value));
    }

    let number = |v: &Value| match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("'{}' is not a float", n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("'{}': {}", s, e)),
        other => Err(format!("'{}' is not numeric", other)),
    };

    let lat = number(&items[0])?;
    let lon = number(&items[1])?;
    let alt = match items.get(2) {
        Some(Value::Null) | None => 0.0,
        Some(v) => number(v)?,
    };

    Ok(Coordinate::new(lat, lon, alt))
}

/// Collects parsed points into runs, breaking the run at each bad point.
fn split_runs<I>(owner: &str, points: I) -> Vec<Vec<Coordinate>>
where
    I: IntoIterator<Item = std::result::Result<Coordinate, String>>,
{
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for point in points {
        let point = point.and_then(|c| {
            if c.is_valid() {
                Ok(c)
            } else {
                Err(format!("out of range or non-finite: {}", c))
            }
        });

        match point {
            Ok(coordinate) => current.push(coordinate),
            Err(reason) => {
                warn!(feature = %owner, %reason, "skipping malformed coordinate");
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }

    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

/// Builds features from an already-parsed JSON value.
///
/// The value must be an array; anything else is a fatal
/// [`GeoError::InvalidInput`]. Individual records that cannot be read are
/// skipped with a warning.
pub fn features_from_value(value: Value) -> Result<Vec<Feature>> {
    let Value::Array(items) = value else {
        return Err(GeoError::InvalidInput(format!(
            "expected a JSON array of features, got {}",
            json_kind(&value)
        )));
    };

    let mut features = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<FeatureRecord>(item) {
            Ok(record) => features.extend(record.into_feature()),
            Err(err) => warn!(index, error = %err, "skipping unreadable feature record"),
        }
    }

    Ok(features)
}

/// Reads a JSON feature file.
pub fn load_features(path: impl AsRef<Path>) -> Result<Vec<Feature>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let value: Value = serde_json::from_str(&content)?;
    features_from_value(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
