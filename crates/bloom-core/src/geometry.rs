//! Great-circle distance and radius filtering.

use crate::model::Point;

/// Sphere radius used for all surface distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two latitude/longitude pairs.
pub fn distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
  let phi_a = lat_a.to_radians();
  let phi_b = lat_b.to_radians();
  let d_phi = (lat_b - lat_a).to_radians();
  let d_lambda = (lon_b - lon_a).to_radians();

  let h = (d_phi / 2.0).sin().powi(2)
    + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
  // Rounding can push `h` just outside [0, 1] near antipodes.
  let h = h.clamp(0.0, 1.0);

  2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// [`distance`] between two [`Point`]s.
pub fn distance_between(a: Point, b: Point) -> f64 {
  distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// The points within `radius_m` meters of `center`, boundary included, in
/// their input order.
pub fn within_radius(points: &[Point], center: Point, radius_m: f64) -> Vec<Point> {
  points
    .iter()
    .copied()
    .filter(|p| distance_between(*p, center) <= radius_m)
    .collect()
}
