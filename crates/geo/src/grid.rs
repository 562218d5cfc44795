//! Fixed-size latitude/longitude grid over line segments.
//!
//! Every segment is stored once in an arena and gets a [`SegmentId`]. Cells
//! hold ids only. A segment is registered in every cell its bounding box
//! overlaps, so a proximity query only needs to look at a cell and its eight
//! neighbors.
//!
//! Cell size is in degrees on both axes. The east-west extent of a cell
//! shrinks with latitude; that distortion is ignored.

use crate::{Feature, GeoError, Result, Segment};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default cell size, roughly 111 m at the equator.
pub const DEFAULT_CELL_SIZE_DEGREES: f64 = 0.001;

/// Integer key of a grid cell: `(floor(lat / g), floor(lon / g))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellKey {
    /// Latitude bucket
    pub lat: i64,
    /// Longitude bucket
    pub lon: i64,
}

impl CellKey {
    /// Creates a key from bucket indices.
    #[inline]
    pub const fn new(lat: i64, lon: i64) -> Self {
        Self { lat, lon }
    }

    /// Key of the cell containing a point.
    #[inline]
    pub fn containing(latitude: f64, longitude: f64, cell_size: f64) -> Self {
        Self::new(bucket(latitude, cell_size), bucket(longitude, cell_size))
    }

    /// This cell and its eight neighbors.
    pub fn neighborhood(self) -> impl Iterator<Item = CellKey> {
        (-1..=1).flat_map(move |d_lat| {
            (-1..=1).map(move |d_lon| CellKey::new(self.lat + d_lat, self.lon + d_lon))
        })
    }
}

#[inline]
fn bucket(value: f64, cell_size: f64) -> i64 {
    (value / cell_size).floor() as i64
}

/// Stable handle to a segment in a [`SpatialGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SegmentId(pub usize);

/// A segment plus the index of the feature that owns it.
#[derive(Debug, Clone)]
struct IndexedSegment {
    segment: Segment,
    feature: usize,
}

/// Grid index mapping cells to the segments that overlap them.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    feature_names: Vec<String>,
    segments: Vec<IndexedSegment>,
    cells: HashMap<CellKey, Vec<SegmentId>>,
}

impl SpatialGrid {
    /// Builds the index from a list of features.
    ///
    /// Segments with an endpoint that is out of range or not finite are
    /// skipped with a warning.
    ///
    /// # Errors
    /// [`GeoError::InvalidCellSize`] when `cell_size` is not finite and positive.
    pub fn build(features: &[Feature], cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GeoError::InvalidCellSize(cell_size));
        }

        let mut grid = Self {
            cell_size,
            feature_names: Vec::with_capacity(features.len()),
            segments: Vec::with_capacity(features.iter().map(Feature::segment_count).sum()),
            cells: HashMap::new(),
        };

        for (feature_index, feature) in features.iter().enumerate() {
            grid.feature_names.push(feature.name.clone());

            for segment in feature.segments() {
                if !segment.start.is_valid() || !segment.end.is_valid() {
                    warn!(
                        feature = %feature.name,
                        %segment,
                        "skipping segment with invalid coordinates"
                    );
                    continue;
                }
                grid.insert(segment, feature_index);
            }
        }

        debug!(
            features = features.len(),
            segments = grid.segments.len(),
            cells = grid.cells.len(),
            cell_size,
            "spatial grid built"
        );

        Ok(grid)
    }

    fn insert(&mut self, segment: Segment, feature: usize) {
        let id = SegmentId(self.segments.len());
        let (min_key, max_key) = self.cell_range(&segment);

        for lat in min_key.lat..=max_key.lat {
            for lon in min_key.lon..=max_key.lon {
                self.cells.entry(CellKey::new(lat, lon)).or_default().push(id);
            }
        }

        self.segments.push(IndexedSegment { segment, feature });
    }

    /// Inclusive corner cells covering the segment's bounding box.
    fn cell_range(&self, segment: &Segment) -> (CellKey, CellKey) {
        let (min_lat, min_lon, max_lat, max_lon) = segment.bounding_box();
        (
            CellKey::containing(min_lat, min_lon, self.cell_size),
            CellKey::containing(max_lat, max_lon, self.cell_size),
        )
    }

    /// Cell size in degrees.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of features the index was built from.
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// True when no segment was indexed.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment behind an id.
    ///
    /// # Panics
    /// If the id did not come from this grid.
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0].segment
    }

    /// Name of the feature owning a segment.
    ///
    /// # Panics
    /// If the id did not come from this grid.
    pub fn owner(&self, id: SegmentId) -> &str {
        &self.feature_names[self.segments[id.0].feature]
    }

    /// Segments registered in a cell, if it is occupied.
    pub fn cell(&self, key: CellKey) -> Option<&[SegmentId]> {
        self.cells.get(&key).map(Vec::as_slice)
    }

    /// Occupied cell keys in ascending order.
    pub fn sorted_keys(&self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self.cells.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Every cell a segment is registered in, in ascending order.
    pub fn cells_for(&self, id: SegmentId) -> Vec<CellKey> {
        let (min_key, max_key) = self.cell_range(self.segment(id));
        (min_key.lat..=max_key.lat)
            .flat_map(|lat| (min_key.lon..=max_key.lon).map(move |lon| CellKey::new(lat, lon)))
            .collect()
    }

    /// Largest number of segments registered in a single cell.
    pub fn max_occupancy(&self) -> usize {
        self.cells.values().map(Vec::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon, 0.0)
    }

    #[test]
    fn test_cell_key_floor_division() {
        assert_eq!(CellKey::containing(0.0005, 0.0015, 0.001), CellKey::new(0, 1));
        assert_eq!(CellKey::containing(-0.0005, -0.0015, 0.001), CellKey::new(-1, -2));
        assert_eq!(CellKey::containing(2.5, -3.5, 1.0), CellKey::new(2, -4));
    }

    #[test]
    fn test_neighborhood_is_three_by_three() {
        let cells: Vec<CellKey> = CellKey::new(5, -2).neighborhood().collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&CellKey::new(5, -2)));
        assert!(cells.contains(&CellKey::new(4, -3)));
        assert!(cells.contains(&CellKey::new(6, -1)));
    }

    #[test]
    fn test_segment_replicated_over_bounding_box() {
        // Bounding box spans cells (0,0) to (2,1)
        let feature = Feature::single("A", vec![coord(0.5, 0.5), coord(2.5, 1.5)]);
        let grid = SpatialGrid::build(&[feature], 1.0).unwrap();

        assert_eq!(grid.segment_count(), 1);
        assert_eq!(grid.cell_count(), 6);

        let id = SegmentId(0);
        let mut expected = Vec::new();
        for lat in 0..=2 {
            for lon in 0..=1 {
                let key = CellKey::new(lat, lon);
                assert_eq!(grid.cell(key), Some(&[id][..]));
                expected.push(key);
            }
        }
        assert_eq!(grid.cells_for(id), expected);
        assert_eq!(grid.sorted_keys(), expected);
    }

    #[test]
    fn test_direction_does_not_change_coverage() {
        let forward = Feature::single("A", vec![coord(0.5, 1.5), coord(2.5, 0.5)]);
        let grid = SpatialGrid::build(&[forward], 1.0).unwrap();
        assert_eq!(grid.cell_count(), 6);
    }

    #[test]
    fn test_antimeridian_segment_spans_every_longitude_bucket() {
        // The bounding box does not wrap, so a short hop across 180° covers the globe
        let feature = Feature::single("A", vec![coord(0.5, 179.5), coord(0.5, -179.5)]);
        let grid = SpatialGrid::build(&[feature], 1.0).unwrap();

        assert_eq!(grid.cell_count(), 360);
        let cells = grid.cells_for(SegmentId(0));
        assert_eq!(cells.first(), Some(&CellKey::new(0, -180)));
        assert_eq!(cells.last(), Some(&CellKey::new(0, 179)));
    }

    #[test]
    fn test_segments_keep_owner_names() {
        let a = Feature::single("A", vec![coord(0.1, 0.1), coord(0.2, 0.2), coord(0.3, 0.3)]);
        let b = Feature::single("B", vec![coord(0.1, 0.1), coord(0.2, 0.2)]);
        let grid = SpatialGrid::build(&[a, b], 1.0).unwrap();

        assert_eq!(grid.segment_count(), 3);
        assert_eq!(grid.feature_count(), 2);
        assert_eq!(grid.owner(SegmentId(0)), "A");
        assert_eq!(grid.owner(SegmentId(1)), "A");
        assert_eq!(grid.owner(SegmentId(2)), "B");
        assert_eq!(grid.cell(CellKey::new(0, 0)).map(<[SegmentId]>::len), Some(3));
        assert_eq!(grid.max_occupancy(), 3);
    }

    #[test]
    fn test_invalid_segments_skipped() {
        let points = vec![coord(0.1, 0.1), coord(f64::NAN, 0.2), coord(0.3, 0.3)];
        let feature = Feature::single("A", points);
        let grid = SpatialGrid::build(&[feature], 1.0).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn test_empty_input_builds_empty_grid() {
        let grid = SpatialGrid::build(&[], DEFAULT_CELL_SIZE_DEGREES).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.max_occupancy(), 0);
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        for size in [0.0, -0.001, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SpatialGrid::build(&[], size),
                Err(GeoError::InvalidCellSize(_))
            ));
        }
    }
}
