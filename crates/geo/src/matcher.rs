//! Pair matching over a [`SpatialGrid`].
//!
//! For every occupied cell, segments are compared with the segments of the
//! same cell and its eight neighbors. A candidate pair is kept when the
//! midpoints are within the proximity threshold and the bearings differ by
//! no more than the angle threshold. Both comparisons are inclusive.
//!
//! Proximity is measured between segment midpoints. That is exact enough for
//! redundant traces of similar length, but it will under- or over-match
//! segments of very different lengths or with offset midpoints.
//!
//! Searching only the 3x3 neighborhood is sound while the cell size is at
//! least the proximity threshold. [`MatchThresholds::check_against_cell_size`]
//! warns when that does not hold. Call it before building the grid.

use crate::grid::{SegmentId, SpatialGrid};
use crate::{Segment, angle_difference, distance_3d};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Approximate length of one degree of latitude, in meters.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Distance and angle limits for a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    /// Maximum midpoint distance in meters
    pub proximity_m: f64,
    /// Maximum bearing difference in degrees
    pub angle_deg: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            proximity_m: 10.0,
            angle_deg: 3.0,
        }
    }
}

impl MatchThresholds {
    /// Creates thresholds from a distance in meters and an angle in degrees.
    pub fn new(proximity_m: f64, angle_deg: f64) -> Self {
        Self {
            proximity_m,
            angle_deg,
        }
    }

    /// Checks that a grid cell is at least as large as the proximity threshold.
    ///
    /// Returns `false` and logs a warning when matches could be missed.
    pub fn check_against_cell_size(&self, cell_size_degrees: f64) -> bool {
        let cell_meters = cell_size_degrees * METERS_PER_DEGREE;
        if cell_meters < self.proximity_m {
            warn!(
                cell_size_degrees,
                cell_meters,
                proximity_m = self.proximity_m,
                "grid cell is smaller than the proximity threshold; matches may be missed"
            );
            return false;
        }
        true
    }
}

/// Two segments judged to share a right-of-way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    /// Owner of the first segment
    pub name_a: String,
    /// Owner of the second segment
    pub name_b: String,
    /// First segment (the lower [`SegmentId`])
    pub segment_a: Segment,
    /// Second segment
    pub segment_b: Segment,
    /// Index handle of `segment_a`
    pub id_a: SegmentId,
    /// Index handle of `segment_b`
    pub id_b: SegmentId,
    /// 3D distance between midpoints, in meters
    pub distance_m: f64,
    /// Circular bearing difference, in degrees
    pub angle_diff_deg: f64,
}

impl MatchedPair {
    /// Feature names ordered alphabetically.
    pub fn names_sorted(&self) -> (&str, &str) {
        if self.name_a <= self.name_b {
            (&self.name_a, &self.name_b)
        } else {
            (&self.name_b, &self.name_a)
        }
    }
}

/// Counters collected during a matching run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    /// Occupied cells visited
    pub cells_visited: usize,
    /// Unique pairs evaluated against the thresholds
    pub comparisons: usize,
    /// Segment compared with itself
    pub self_skips: usize,
    /// Pair already seen through another cell
    pub duplicates_skipped: usize,
    /// Midpoints too far apart
    pub rejected_distance: usize,
    /// Bearings too different
    pub rejected_angle: usize,
    /// Distance or angle not computable
    pub rejected_invalid: usize,
    /// Pairs accepted
    pub matches: usize,
}

enum Outcome {
    Match(MatchedPair),
    TooFar,
    AngleMismatch,
    Invalid,
}

impl MatchStats {
    fn record(&mut self, outcome: &Outcome) {
        self.comparisons += 1;
        match outcome {
            Outcome::Match(_) => self.matches += 1,
            Outcome::TooFar => self.rejected_distance += 1,
            Outcome::AngleMismatch => self.rejected_angle += 1,
            Outcome::Invalid => self.rejected_invalid += 1,
        }
    }
}

/// Finds co-located segment pairs in a grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairMatcher {
    thresholds: MatchThresholds,
}

impl PairMatcher {
    /// Creates a matcher with the given thresholds.
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    /// Finds all matched pairs. Each unordered pair appears once.
    pub fn find_pairs(&self, grid: &SpatialGrid) -> Vec<MatchedPair> {
        self.find_pairs_with_stats(grid).0
    }

    /// Finds all matched pairs and returns the run counters.
    ///
    /// Uses the rayon pool when the `parallel` feature is enabled. The result
    /// is the same set either way.
    pub fn find_pairs_with_stats(&self, grid: &SpatialGrid) -> (Vec<MatchedPair>, MatchStats) {
        #[cfg(feature = "parallel")]
        let result = self.find_pairs_parallel(grid);

        #[cfg(not(feature = "parallel"))]
        let result = self.find_pairs_sequential(grid);

        debug!(
            cells = result.1.cells_visited,
            comparisons = result.1.comparisons,
            duplicates = result.1.duplicates_skipped,
            matches = result.1.matches,
            "pair matching finished"
        );

        result
    }

    /// Single-threaded matching.
    pub fn find_pairs_sequential(&self, grid: &SpatialGrid) -> (Vec<MatchedPair>, MatchStats) {
        let mut stats = MatchStats::default();
        let mut processed: HashSet<(SegmentId, SegmentId)> = HashSet::new();
        let mut pairs = Vec::new();

        for key in grid.sorted_keys() {
            stats.cells_visited += 1;
            let Some(here) = grid.cell(key) else { continue };

            for neighbor in key.neighborhood() {
                let Some(there) = grid.cell(neighbor) else { continue };

                for &first in here {
                    for &second in there {
                        if first == second {
                            stats.self_skips += 1;
                            continue;
                        }
                        let pair = canonical(first, second);
                        if !processed.insert(pair) {
                            stats.duplicates_skipped += 1;
                            continue;
                        }

                        let outcome = self.evaluate(grid, pair);
                        stats.record(&outcome);
                        if let Outcome::Match(matched) = outcome {
                            pairs.push(matched);
                        }
                    }
                }
            }
        }

        (pairs, stats)
    }

    /// Multi-threaded matching.
    ///
    /// Cells are sharded over the rayon pool against the read-only grid.
    /// Candidate keys are merged and deduplicated in one place before the
    /// thresholds are applied.
    #[cfg(feature = "parallel")]
    pub fn find_pairs_parallel(&self, grid: &SpatialGrid) -> (Vec<MatchedPair>, MatchStats) {
        use rayon::prelude::*;

        let keys = grid.sorted_keys();

        let per_cell: Vec<(Vec<(SegmentId, SegmentId)>, usize)> = keys
            .par_iter()
            .map(|&key| {
                let mut candidates = Vec::new();
                let mut self_skips = 0;
                let Some(here) = grid.cell(key) else {
                    return (candidates, self_skips);
                };
                for neighbor in key.neighborhood() {
                    let Some(there) = grid.cell(neighbor) else { continue };
                    for &first in here {
                        for &second in there {
                            if first == second {
                                self_skips += 1;
                            } else {
                                candidates.push(canonical(first, second));
                            }
                        }
                    }
                }
                (candidates, self_skips)
            })
            .collect();

        let mut stats = MatchStats {
            cells_visited: keys.len(),
            ..MatchStats::default()
        };

        let mut candidates = Vec::new();
        for (cell_candidates, self_skips) in per_cell {
            stats.self_skips += self_skips;
            candidates.extend(cell_candidates);
        }

        let total = candidates.len();
        candidates.par_sort_unstable();
        candidates.dedup();
        stats.duplicates_skipped = total - candidates.len();

        let outcomes: Vec<Outcome> = candidates
            .par_iter()
            .map(|&pair| self.evaluate(grid, pair))
            .collect();

        let mut pairs = Vec::new();
        for outcome in outcomes {
            stats.record(&outcome);
            if let Outcome::Match(matched) = outcome {
                pairs.push(matched);
            }
        }

        (pairs, stats)
    }

    fn evaluate(&self, grid: &SpatialGrid, (id_a, id_b): (SegmentId, SegmentId)) -> Outcome {
        let segment_a = grid.segment(id_a);
        let segment_b = grid.segment(id_b);

        let distance = midpoint_distance(segment_a, segment_b);
        if !distance.is_finite() {
            warn!(%segment_a, %segment_b, "midpoint distance is not finite; pair rejected");
            return Outcome::Invalid;
        }
        if distance > self.thresholds.proximity_m {
            return Outcome::TooFar;
        }

        let angle = angle_difference(segment_a.bearing(), segment_b.bearing());
        if !angle.is_finite() {
            warn!(%segment_a, %segment_b, "bearing difference is not finite; pair rejected");
            return Outcome::Invalid;
        }
        if angle > self.thresholds.angle_deg {
            return Outcome::AngleMismatch;
        }

        Outcome::Match(MatchedPair {
            name_a: grid.owner(id_a).to_string(),
            name_b: grid.owner(id_b).to_string(),
            segment_a: *segment_a,
            segment_b: *segment_b,
            id_a,
            id_b,
            distance_m: distance,
            angle_diff_deg: angle,
        })
    }
}

#[inline]
fn canonical(a: SegmentId, b: SegmentId) -> (SegmentId, SegmentId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Midpoint distance, evaluated in a fixed order of the two segments' values
/// so the result does not depend on which one was indexed first.
fn midpoint_distance(a: &Segment, b: &Segment) -> f64 {
    let (first, second) = match compare_segments(a, b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    distance_3d(&first.midpoint(), &second.midpoint())
}

fn compare_segments(a: &Segment, b: &Segment) -> Ordering {
    let values = |s: &Segment| {
        [
            s.start.latitude,
            s.start.longitude,
            s.start.altitude,
            s.end.latitude,
            s.end.longitude,
            s.end.altitude,
        ]
    };
    values(a)
        .iter()
        .zip(values(b).iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}
