//! Relational entities of the phenology store.
//!
//! Sites and observations arrive from the CSV import and are never mutated.
//! Plants are created once per `(site, species)` pair; their `area_id` is the
//! only column the clustering pipeline writes. Areas own their coordinates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type SiteId = i64;
pub type PlantId = i64;
pub type AreaId = i64;
pub type ObservationId = i64;
pub type PhenophaseId = i32;

// ─── Point ───────────────────────────────────────────────────────────────────

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub latitude:  f64,
  pub longitude: f64,
}

impl Point {
  pub const fn new(latitude: f64, longitude: f64) -> Self {
    Self { latitude, longitude }
  }

  pub fn is_finite(&self) -> bool {
    self.latitude.is_finite() && self.longitude.is_finite()
  }
}

// ─── Site ────────────────────────────────────────────────────────────────────

/// An observation station. The id comes from the source data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
  pub id:        SiteId,
  pub latitude:  f64,
  pub longitude: f64,
  /// Meters above sea level.
  pub elevation: i32,
}

impl Site {
  pub fn location(&self) -> Point { Point::new(self.latitude, self.longitude) }
}

// ─── Plant ───────────────────────────────────────────────────────────────────

/// A species instance at a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
  pub id:      PlantId,
  pub site_id: SiteId,
  /// `None` until the plant's site has been clustered into an area.
  pub area_id: Option<AreaId>,
  pub species: String,
}

/// Input to [`crate::store::PhenologyStore::insert_plants`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewPlant {
  pub site_id: SiteId,
  pub species: String,
}

/// A plant joined with the coordinates of its site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantLocation {
  pub plant_id: PlantId,
  pub site_id:  SiteId,
  /// The area the plant belongs to before clustering, if any.
  pub area_id:  Option<AreaId>,
  pub location: Point,
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// A dated phenology record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
  pub id:               ObservationId,
  pub site_id:          SiteId,
  /// Absent when the import could not match the row to a plant.
  pub plant_id:         Option<PlantId>,
  pub phenophase_id:    PhenophaseId,
  pub observation_date: NaiveDate,
  pub is_blooming:      bool,
  pub description:      Option<String>,
}

// ─── Area ────────────────────────────────────────────────────────────────────

/// One vertex of an area's boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaCoordinate {
  pub id:        i64,
  pub area_id:   AreaId,
  pub latitude:  f64,
  pub longitude: f64,
  /// Zero-based position along the boundary.
  pub order:     u32,
}

impl AreaCoordinate {
  pub fn point(&self) -> Point { Point::new(self.latitude, self.longitude) }
}

/// A caller-supplied vertex, as accepted by the create-area API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewAreaCoordinate {
  pub latitude:  f64,
  pub longitude: f64,
  pub order:     u32,
}

/// A derived cluster of co-located plants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
  pub id:          AreaId,
  /// Sorted by `order`, which always runs `0..coordinates.len()`.
  pub coordinates: Vec<AreaCoordinate>,
  /// Generated lazily by the assistant.
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

impl Area {
  pub fn vertices(&self) -> Vec<Point> {
    self.coordinates.iter().map(AreaCoordinate::point).collect()
  }
}
