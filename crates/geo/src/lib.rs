//! Co-location detection for parallel line features.
//!
//! This crate provides:
//! - Ellipsoidal (Vincenty) and spherical distance, plus initial bearing
//! - A feature model that turns named polylines into segments
//! - A fixed-size lat/lon grid index over those segments
//! - A pair matcher that finds segments sharing a right-of-way
//! - Text and JSON reports of the matched pairs
//!
//! # Example
//!
//! ```
//! use rowfinder_geo::{Coordinate, Feature, MatchThresholds, PairMatcher, SpatialGrid};
//!
//! let a = Feature::single("Line A", vec![
//!     Coordinate::new(29.9500, -95.0500, 0.0),
//!     Coordinate::new(29.9509, -95.0500, 0.0),
//! ]);
//! let b = Feature::single("Line B", vec![
//!     Coordinate::new(29.9500, -95.04995, 0.0),
//!     Coordinate::new(29.9509, -95.04995, 0.0),
//! ]);
//!
//! let grid = SpatialGrid::build(&[a, b], 0.001).unwrap();
//! let pairs = PairMatcher::new(MatchThresholds::default()).find_pairs(&grid);
//! assert_eq!(pairs.len(), 1);
//! ```

mod error;
mod geodesic;
pub mod feature;
pub mod grid;
pub mod matcher;
pub mod report;

pub use error::{GeoError, GeoErrorCode, Result};
pub use feature::{
    Feature, FeatureRecord, Segment, features_from_value, load_features, parse_kml_coordinates,
};
pub use geodesic::{
    EARTH_RADIUS_M, WGS84_A, WGS84_B, WGS84_F, angle_difference, bearing, distance_3d,
    haversine_distance_meters, vincenty_distance,
};
pub use grid::{CellKey, DEFAULT_CELL_SIZE_DEGREES, SegmentId, SpatialGrid};
pub use matcher::{MatchStats, MatchThresholds, MatchedPair, PairMatcher};
pub use report::{ReportFormat, ReportSummary, render, render_json, render_text, write_report};

/// A geographic coordinate with latitude, longitude and altitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
    /// Altitude in meters
    #[serde(default)]
    pub altitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees (-90 to 90)
    /// * `longitude` - Longitude in degrees (-180 to 180)
    /// * `altitude` - Altitude in meters
    #[inline]
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Returns true if the coordinate has finite, in-range values.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.altitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Arithmetic mean of latitude, longitude and altitude.
    #[inline]
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new(
            (self.latitude + other.latitude) / 2.0,
            (self.longitude + other.longitude) / 2.0,
            (self.altitude + other.altitude) / 2.0,
        )
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(&self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self::new(lat, lon, 0.0)
    }
}

impl From<(f64, f64, f64)> for Coordinate {
    fn from((lat, lon, alt): (f64, f64, f64)) -> Self {
        Self::new(lat, lon, alt)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.latitude, self.longitude, self.altitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_creation() {
        let coord = Coordinate::new(29.95, -95.05, 12.0);
        assert_eq!(coord.latitude, 29.95);
        assert_eq!(coord.longitude, -95.05);
        assert_eq!(coord.altitude, 12.0);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0, 0.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0, 0.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0, -10.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0, 0.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_coordinate_from_tuple() {
        let coord: Coordinate = (52.5200, 13.4050).into();
        assert_eq!(coord.latitude, 52.5200);
        assert_eq!(coord.altitude, 0.0);

        let coord: Coordinate = (52.5200, 13.4050, 30.0).into();
        assert_eq!(coord.altitude, 30.0);
    }

    #[test]
    fn test_midpoint_averages_all_axes() {
        let a = Coordinate::new(10.0, 20.0, 0.0);
        let b = Coordinate::new(12.0, 24.0, 100.0);
        let mid = a.midpoint(&b);
        assert_eq!(mid, Coordinate::new(11.0, 22.0, 50.0));
    }

    #[test]
    fn test_display_matches_report_tuple_form() {
        let coord = Coordinate::new(29.95, -95.05, 0.0);
        assert_eq!(coord.to_string(), "(29.95, -95.05, 0)");
    }
}
