//! The `PhenologyStore` trait.
//!
//! Implemented by storage backends (e.g. `bloom-store-sqlite`). The
//! clustering driver, the importer and the HTTP API depend on this
//! abstraction, never on a concrete backend.

use std::future::Future;

use crate::model::{
  Area, AreaId, NewPlant, Observation, Plant, PlantId, PlantLocation, Point, Site,
  SiteId,
};

/// Abstraction over a phenology store backend.
///
/// Sites and observations are append-only. The only in-place update is a
/// plant's `area_id`, written by [`PhenologyStore::materialize_area`] and
/// cleared by [`PhenologyStore::delete_area`].
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait PhenologyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Sites ─────────────────────────────────────────────────────────────

  /// Insert sites whose ids are not present yet. Returns how many were
  /// inserted; existing sites are left untouched.
  fn insert_sites(
    &self,
    sites: Vec<Site>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_site(
    &self,
    id: SiteId,
  ) -> impl Future<Output = Result<Option<Site>, Self::Error>> + Send + '_;

  /// All sites, ordered by id.
  fn list_sites(&self) -> impl Future<Output = Result<Vec<Site>, Self::Error>> + Send + '_;

  // ── Plants ────────────────────────────────────────────────────────────

  /// Insert plants whose `(site_id, species)` pair is not present yet.
  /// Returns how many were inserted.
  fn insert_plants(
    &self,
    plants: Vec<NewPlant>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All plants, ordered by id.
  fn list_plants(&self) -> impl Future<Output = Result<Vec<Plant>, Self::Error>> + Send + '_;

  /// Every plant joined with its site's coordinates, ordered by plant id.
  fn plant_locations(
    &self,
  ) -> impl Future<Output = Result<Vec<PlantLocation>, Self::Error>> + Send + '_;

  /// Plants currently assigned to `area_id`, ordered by id.
  fn area_plants(
    &self,
    area_id: AreaId,
  ) -> impl Future<Output = Result<Vec<Plant>, Self::Error>> + Send + '_;

  // ── Observations ──────────────────────────────────────────────────────

  /// Insert observations whose ids are not present yet. Returns how many
  /// were inserted.
  fn insert_observations(
    &self,
    observations: Vec<Observation>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Full observation history of a plant, ordered by date then id.
  fn plant_observations(
    &self,
    plant_id: PlantId,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;

  // ── Areas ─────────────────────────────────────────────────────────────

  /// Create an area with `vertices` as its boundary (in order) and assign
  /// every plant in `plant_ids` to it.
  ///
  /// All-or-nothing: if any write fails, or any plant id does not exist,
  /// no area, coordinate or plant reassignment is persisted.
  fn materialize_area(
    &self,
    vertices: Vec<Point>,
    plant_ids: Vec<PlantId>,
  ) -> impl Future<Output = Result<Area, Self::Error>> + Send + '_;

  /// Retrieve an area with its coordinates sorted by order.
  fn get_area(
    &self,
    id: AreaId,
  ) -> impl Future<Output = Result<Option<Area>, Self::Error>> + Send + '_;

  /// All areas, ordered by id, each with its coordinates sorted by order.
  fn list_areas(&self) -> impl Future<Output = Result<Vec<Area>, Self::Error>> + Send + '_;

  /// Delete an area and its coordinates and detach its plants. Returns
  /// `false` if the area does not exist.
  fn delete_area(
    &self,
    id: AreaId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Store a generated description. Returns `false` if the area does not
  /// exist.
  fn set_area_description(
    &self,
    id: AreaId,
    description: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
