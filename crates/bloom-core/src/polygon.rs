//! Polygon generation for a set of plant locations.
//!
//! [`generate_polygon`] never fails. Three or more distinct, non-collinear
//! points produce a convex hull; anything else falls back to the distinct
//! points themselves (or a caller-supplied anchor when there are none).
//! Hull failures are logged as warnings and reported through
//! [`PolygonKind::Fallback`].

use std::cmp::Ordering;

use geo::{Area as _, ConvexHull, MultiPoint, Orient, orient::Direction};
use serde::Serialize;

use crate::{
  Error, Result,
  model::{NewAreaCoordinate, Point},
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Why a hull could not be computed for three or more points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HullFailure {
  /// Every point lies on one line, so the hull has no area.
  Collinear,
  /// At least one input coordinate was NaN or infinite.
  NonFinite,
}

/// Which path produced the vertices of a [`PolygonOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum PolygonKind {
  /// A true convex hull with at least three vertices.
  Hull,
  /// Fewer than three distinct points; no hull was attempted.
  Sparse,
  /// Hull computation failed; the fallback point set was returned.
  Fallback(HullFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonOutcome {
  /// Boundary vertices in traversal order. May be empty.
  pub vertices: Vec<Point>,
  pub kind:     PolygonKind,
}

impl PolygonOutcome {
  pub fn is_empty(&self) -> bool { self.vertices.is_empty() }
}

// ─── Generator ───────────────────────────────────────────────────────────────

/// Build the boundary polygon for `points`.
///
/// Hull vertices are returned counter-clockwise (longitude as x, latitude as
/// y), starting at the vertex with the smallest longitude, ties broken by
/// latitude. The closing vertex is not repeated. The result depends only on
/// the set of distinct points, not on their input order.
///
/// `anchor` is returned as the sole vertex when no distinct points remain.
pub fn generate_polygon(points: &[Point], anchor: Option<Point>) -> PolygonOutcome {
  let (distinct, non_finite) = distinct_points(points);

  if non_finite > 0 {
    tracing::warn!(
      non_finite,
      "cannot build polygon: non-finite coordinates, falling back to raw points"
    );
    return fallback(distinct, anchor, PolygonKind::Fallback(HullFailure::NonFinite));
  }

  if distinct.len() < 3 {
    return fallback(distinct, anchor, PolygonKind::Sparse);
  }

  match convex_hull(&distinct) {
    Ok(vertices) => PolygonOutcome { vertices, kind: PolygonKind::Hull },
    Err(reason) => {
      tracing::warn!(
        points = distinct.len(),
        ?reason,
        "cannot build polygon: points are collinear, falling back to raw points"
      );
      fallback(distinct, anchor, PolygonKind::Fallback(reason))
    }
  }
}

fn fallback(distinct: Vec<Point>, anchor: Option<Point>, kind: PolygonKind) -> PolygonOutcome {
  let vertices = match anchor {
    Some(anchor) if distinct.is_empty() && anchor.is_finite() => vec![anchor],
    _ => distinct,
  };
  PolygonOutcome { vertices, kind }
}

/// Sort and deduplicate by exact coordinate equality. Returns the finite
/// distinct points and the number of non-finite inputs that were dropped.
fn distinct_points(points: &[Point]) -> (Vec<Point>, usize) {
  let mut finite: Vec<Point> = points
    .iter()
    .filter(|p| p.is_finite())
    // Adding zero folds -0.0 into 0.0.
    .map(|p| Point::new(p.latitude + 0.0, p.longitude + 0.0))
    .collect();
  let non_finite = points.len() - finite.len();

  finite.sort_by(lon_lat_order);
  finite.dedup();
  (finite, non_finite)
}

fn lon_lat_order(a: &Point, b: &Point) -> Ordering {
  a.longitude
    .total_cmp(&b.longitude)
    .then(a.latitude.total_cmp(&b.latitude))
}

fn convex_hull(points: &[Point]) -> std::result::Result<Vec<Point>, HullFailure> {
  let multi: MultiPoint<f64> = points
    .iter()
    .map(|p| geo::Point::new(p.longitude, p.latitude))
    .collect();

  let hull = multi.convex_hull().orient(Direction::Default);
  if hull.unsigned_area() <= area_tolerance(points) {
    return Err(HullFailure::Collinear);
  }

  let mut ring: Vec<Point> = hull
    .exterior()
    .coords()
    .map(|c| Point::new(c.y, c.x))
    .collect();
  if ring.len() > 1 && ring.first() == ring.last() {
    ring.pop();
  }
  if ring.len() < 3 {
    return Err(HullFailure::Collinear);
  }

  let start = ring
    .iter()
    .enumerate()
    .min_by(|(_, a), (_, b)| lon_lat_order(a, b))
    .map(|(i, _)| i)
    .unwrap_or(0);
  ring.rotate_left(start);
  Ok(ring)
}

/// Areas at or below this are treated as zero.
///
/// Rounding a decimal coordinate to `f64` moves it by up to half an ulp of
/// its magnitude, so a straight line of points can come back as a sliver
/// whose area grows with both the spread and the largest coordinate.
fn area_tolerance(points: &[Point]) -> f64 {
  let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
  let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
  let mut max_abs: f64 = 0.0;
  for p in points {
    min_x = min_x.min(p.longitude);
    max_x = max_x.max(p.longitude);
    min_y = min_y.min(p.latitude);
    max_y = max_y.max(p.latitude);
    max_abs = max_abs.max(p.longitude.abs()).max(p.latitude.abs());
  }
  let extent = (max_x - min_x).max(max_y - min_y);
  extent * max_abs.max(extent) * f64::EPSILON * 64.0
}

// ─── Caller-supplied polygons ────────────────────────────────────────────────

/// Validate user-supplied vertices and return them sorted by `order`.
///
/// Orders must be a permutation of `0..n` and every coordinate finite.
pub fn ordered_vertices(coordinates: &[NewAreaCoordinate]) -> Result<Vec<Point>> {
  if coordinates.is_empty() {
    return Err(Error::EmptyPolygon);
  }

  let mut sorted = coordinates.to_vec();
  sorted.sort_by_key(|c| c.order);

  let contiguous = sorted
    .iter()
    .enumerate()
    .all(|(i, c)| c.order as usize == i);
  if !contiguous {
    return Err(Error::NonContiguousOrder {
      expected: coordinates.len(),
      found:    sorted.iter().map(|c| c.order).collect(),
    });
  }

  sorted
    .into_iter()
    .map(|c| {
      let point = Point::new(c.latitude, c.longitude);
      if point.is_finite() {
        Ok(point)
      } else {
        Err(Error::NonFiniteCoordinate { order: c.order })
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn p(lat: f64, lon: f64) -> Point { Point::new(lat, lon) }

  /// Cross product of (b - a) x (c - a) with longitude as x.
  fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.longitude - a.longitude) * (c.latitude - a.latitude)
      - (b.latitude - a.latitude) * (c.longitude - a.longitude)
  }

  fn encloses(hull: &[Point], q: Point) -> bool {
    (0..hull.len()).all(|i| {
      let a = hull[i];
      let b = hull[(i + 1) % hull.len()];
      cross(a, b, q) >= -1e-9
    })
  }

  fn same_set(a: &[Point], b: &[Point]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
  }

  #[test]
  fn unit_square_hull_is_counter_clockwise_from_origin() {
    let square = [p(0.0, 0.0), p(0.0, 1.0), p(1.0, 1.0), p(1.0, 0.0)];
    let out = generate_polygon(&square, None);

    assert_eq!(out.kind, PolygonKind::Hull);
    assert_eq!(
      out.vertices,
      vec![p(0.0, 0.0), p(0.0, 1.0), p(1.0, 1.0), p(1.0, 0.0)]
    );
  }

  #[test]
  fn hull_order_does_not_depend_on_input_order() {
    let a = [p(1.0, 0.0), p(0.0, 1.0), p(0.0, 0.0), p(1.0, 1.0), p(0.5, 0.5)];
    let b = [p(0.5, 0.5), p(1.0, 1.0), p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0)];
    assert_eq!(generate_polygon(&a, None), generate_polygon(&b, None));
  }

  #[test]
  fn interior_points_are_not_vertices() {
    let pts = [
      p(0.0, 0.0),
      p(0.0, 4.0),
      p(4.0, 4.0),
      p(4.0, 0.0),
      p(2.0, 2.0),
      p(1.0, 3.0),
    ];
    let out = generate_polygon(&pts, None);
    assert_eq!(out.kind, PolygonKind::Hull);
    assert_eq!(out.vertices.len(), 4);
    assert!(!out.vertices.contains(&p(2.0, 2.0)));
  }

  #[test]
  fn hull_encloses_every_input_point() {
    // A deterministic scatter with no three points collinear.
    let pts: Vec<Point> = (0..40)
      .map(|i| {
        let t = i as f64;
        p(45.0 + (t * 0.731).sin() * 0.01, -122.0 + (t * 1.377).cos() * 0.013)
      })
      .collect();

    let out = generate_polygon(&pts, None);
    assert_eq!(out.kind, PolygonKind::Hull);
    assert!(out.vertices.len() >= 3);
    for q in &pts {
      assert!(encloses(&out.vertices, *q), "{q:?} outside hull");
    }
    for v in &out.vertices {
      assert!(pts.contains(v), "hull vertex {v:?} is not an input point");
    }
  }

  #[test]
  fn fewer_than_three_points_are_returned_as_is() {
    let one = [p(10.0, 20.0)];
    let out = generate_polygon(&one, None);
    assert_eq!(out.kind, PolygonKind::Sparse);
    assert_eq!(out.vertices, vec![p(10.0, 20.0)]);

    let two = [p(1.0, 2.0), p(3.0, 4.0)];
    let out = generate_polygon(&two, None);
    assert_eq!(out.kind, PolygonKind::Sparse);
    assert!(same_set(&out.vertices, &two));
  }

  #[test]
  fn duplicates_collapse_before_counting() {
    let pts = [p(5.0, 5.0), p(5.0, 5.0), p(5.0, 5.0), p(6.0, 6.0)];
    let out = generate_polygon(&pts, None);
    assert_eq!(out.kind, PolygonKind::Sparse);
    assert!(same_set(&out.vertices, &[p(5.0, 5.0), p(6.0, 6.0)]));
  }

  #[test]
  fn negative_zero_equals_zero() {
    let pts = [p(0.0, 0.0), p(-0.0, -0.0)];
    let out = generate_polygon(&pts, None);
    assert_eq!(out.vertices.len(), 1);
  }

  #[test]
  fn anchor_is_used_only_without_points() {
    let anchor = p(7.0, 8.0);
    let out = generate_polygon(&[], Some(anchor));
    assert_eq!(out.vertices, vec![anchor]);

    let out = generate_polygon(&[p(1.0, 1.0)], Some(anchor));
    assert_eq!(out.vertices, vec![p(1.0, 1.0)]);

    assert!(generate_polygon(&[], None).is_empty());
  }

  #[test]
  fn collinear_points_fall_back_without_failing() {
    let line = [p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0), p(3.0, 3.0)];
    let out = generate_polygon(&line, Some(p(9.0, 9.0)));

    assert_eq!(out.kind, PolygonKind::Fallback(HullFailure::Collinear));
    assert!(same_set(&out.vertices, &line));
  }

  #[test]
  fn nearly_collinear_decimal_points_fall_back() {
    let line = [p(0.1, 0.2), p(0.3, 0.6), p(0.7, 1.4), p(0.9, 1.8)];
    let out = generate_polygon(&line, None);
    assert_eq!(out.kind, PolygonKind::Fallback(HullFailure::Collinear));
    assert_eq!(out.vertices.len(), 4);
  }

  #[test]
  fn collinear_trail_at_field_coordinates_falls_back() {
    let trail: Vec<Point> = (0..5)
      .map(|k| {
        let k = k as f64;
        p(45.0 + k * 0.001, -122.0 - k * 0.001)
      })
      .collect();
    let out = generate_polygon(&trail, None);
    assert_eq!(out.kind, PolygonKind::Fallback(HullFailure::Collinear));
    assert!(same_set(&out.vertices, &trail));

    let diagonal: Vec<Point> = (0..5)
      .map(|k| {
        let k = k as f64;
        p(40.1 + k * 0.1, -105.3 + k * 0.2)
      })
      .collect();
    let out = generate_polygon(&diagonal, None);
    assert_eq!(out.kind, PolygonKind::Fallback(HullFailure::Collinear));
  }

  #[test]
  fn small_triangle_far_from_origin_is_still_a_hull() {
    // Roughly 10 m on a side.
    let tri = [p(45.0, -122.0), p(45.0001, -122.0), p(45.0, -121.9999)];
    let out = generate_polygon(&tri, None);
    assert_eq!(out.kind, PolygonKind::Hull);
    assert_eq!(out.vertices.len(), 3);
  }

  #[test]
  fn non_finite_points_fall_back() {
    let pts = [p(0.0, 0.0), p(f64::NAN, 1.0), p(1.0, 1.0), p(1.0, 0.0)];
    let out = generate_polygon(&pts, None);
    assert_eq!(out.kind, PolygonKind::Fallback(HullFailure::NonFinite));
    assert_eq!(out.vertices.len(), 3);
    assert!(out.vertices.iter().all(Point::is_finite));
  }

  // ── ordered_vertices ──────────────────────────────────────────────────────

  fn coord(order: u32, lat: f64, lon: f64) -> NewAreaCoordinate {
    NewAreaCoordinate { latitude: lat, longitude: lon, order }
  }

  #[test]
  fn ordered_vertices_sorts_by_order() {
    let coords = [coord(2, 2.0, 2.0), coord(0, 0.0, 0.0), coord(1, 1.0, 1.0)];
    let vertices = ordered_vertices(&coords).unwrap();
    assert_eq!(vertices, vec![p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]);
  }

  #[test]
  fn ordered_vertices_rejects_gaps_and_repeats() {
    let gap = [coord(0, 0.0, 0.0), coord(2, 1.0, 1.0)];
    assert!(matches!(
      ordered_vertices(&gap),
      Err(Error::NonContiguousOrder { expected: 2, .. })
    ));

    let repeat = [coord(0, 0.0, 0.0), coord(0, 1.0, 1.0)];
    assert!(matches!(
      ordered_vertices(&repeat),
      Err(Error::NonContiguousOrder { .. })
    ));
  }

  #[test]
  fn ordered_vertices_rejects_empty_and_non_finite() {
    assert!(matches!(ordered_vertices(&[]), Err(Error::EmptyPolygon)));
    let bad = [coord(0, f64::INFINITY, 0.0)];
    assert!(matches!(
      ordered_vertices(&bad),
      Err(Error::NonFiniteCoordinate { order: 0 })
    ));
  }
}
