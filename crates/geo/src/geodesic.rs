//! Distance and bearing between coordinates.
//!
//! Surface distance uses Vincenty's inverse formula on the WGS-84 ellipsoid,
//! which is accurate to well under a millimeter at the ranges the matcher
//! cares about. Haversine on a sphere is kept as a fallback for the rare
//! nearly-antipodal inputs where Vincenty does not converge.

use crate::{Coordinate, GeoError, Result};

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS-84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS-84 semi-minor axis in meters.
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_TOLERANCE: f64 = 1e-12;

/// Calculates the ellipsoidal surface distance between two coordinates in meters.
///
/// Altitude is ignored. Returns [`GeoError::NoConvergence`] when the
/// iteration fails, which only happens for nearly antipodal points.
///
/// # Example
/// ```
/// use rowfinder_geo::{vincenty_distance, Coordinate};
///
/// let a = Coordinate::new(0.0, 0.0, 0.0);
/// let b = Coordinate::new(1.0, 0.0, 0.0);
///
/// let meters = vincenty_distance(&a, &b).unwrap();
/// assert!((meters - 110_574.389).abs() < 0.01);
/// ```
pub fn vincenty_distance(from: &Coordinate, to: &Coordinate) -> Result<f64> {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let l = lon2 - lon1;
    let u1 = ((1.0 - WGS84_F) * lat1.tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut iterations = 0;

    loop {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();

        if sin_sigma == 0.0 {
            // Coincident points
            return Ok(0.0);
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;

        // Equatorial line: cos_sq_alpha == 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };

        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        iterations += 1;

        if (lambda - lambda_prev).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
            let a = 1.0
                + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

            return Ok(WGS84_B * a * (sigma - delta_sigma));
        }

        if iterations >= VINCENTY_MAX_ITERATIONS || !lambda.is_finite() {
            return Err(GeoError::NoConvergence { iterations });
        }
    }
}

/// Calculates the great-circle distance between two coordinates in meters.
///
/// Uses the Haversine formula on a sphere of radius [`EARTH_RADIUS_M`].
#[inline]
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance in meters combining surface distance with the altitude difference.
///
/// `sqrt(surface² + Δalt²)`, where the surface part is [`vincenty_distance`]
/// between the 2D projections.
pub fn distance_3d(from: &Coordinate, to: &Coordinate) -> f64 {
    let surface = vincenty_distance(from, to).unwrap_or_else(|err| {
        tracing::debug!(%from, %to, error = %err, "falling back to haversine distance");
        haversine_distance_meters(from, to)
    });
    let d_alt = to.altitude - from.altitude;

    (surface * surface + d_alt * d_alt).sqrt()
}

/// Initial compass bearing from `from` to `to`, in degrees within `[0, 360)`.
///
/// Identical points have no defined direction; they yield 0.
///
/// # Example
/// ```
/// use rowfinder_geo::{bearing, Coordinate};
///
/// let origin = Coordinate::new(0.0, 0.0, 0.0);
/// let east = Coordinate::new(0.0, 1.0, 0.0);
/// assert!((bearing(&origin, &east) - 90.0).abs() < 1e-9);
/// ```
pub fn bearing(from: &Coordinate, to: &Coordinate) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();
    let d_lon = lon2 - lon1;

    let x = d_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Circular difference between two bearings, in degrees within `[0, 180]`.
#[inline]
pub fn angle_difference(b1: f64, b2: f64) -> f64 {
    let diff = (b1 - b2).abs();
    diff.min(360.0 - diff)
}
