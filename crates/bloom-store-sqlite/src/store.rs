//! [`SqliteStore`], the SQLite implementation of [`PhenologyStore`].

use std::{collections::BTreeMap, path::Path};

use bloom_core::{
  model::{
    Area, AreaCoordinate, AreaId, NewPlant, Observation, Plant, PlantId, PlantLocation,
    Point, Site, SiteId,
  },
  store::PhenologyStore,
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{
    RawArea, RawObservation, coordinate_from_row, encode_date, encode_dt, plant_from_row,
    site_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bloom store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Result of the area transaction, decided inside the connection closure.
enum Materialized {
  Committed { area_id: AreaId, coordinates: Vec<AreaCoordinate> },
  /// Rolled back because these plant ids matched no row.
  MissingPlants(Vec<PlantId>),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of coordinate rows stored for `area_id`.
  #[cfg(test)]
  pub(crate) async fn coordinate_count(&self, area_id: AreaId) -> Result<i64> {
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM area_coordinates WHERE area_id = ?1",
          rusqlite::params![area_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count)
  }
}

const AREA_COLUMNS: &str = "id, description, created_at";
const COORDINATE_COLUMNS: &str = "id, area_id, latitude, longitude, vertex_order";
const OBSERVATION_COLUMNS: &str =
  "id, site_id, plant_id, phenophase_id, observation_date, is_blooming, description";

// ─── PhenologyStore impl ─────────────────────────────────────────────────────

impl PhenologyStore for SqliteStore {
  type Error = Error;

  // ── Sites ─────────────────────────────────────────────────────────────────

  async fn insert_sites(&self, sites: Vec<Site>) -> Result<usize> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO sites (id, latitude, longitude, elevation)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for site in &sites {
            inserted += stmt.execute(rusqlite::params![
              site.id,
              site.latitude,
              site.longitude,
              site.elevation,
            ])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  async fn get_site(&self, id: SiteId) -> Result<Option<Site>> {
    let site = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, latitude, longitude, elevation FROM sites WHERE id = ?1",
              rusqlite::params![id],
              site_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(site)
  }

  async fn list_sites(&self) -> Result<Vec<Site>> {
    let sites = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, latitude, longitude, elevation FROM sites ORDER BY id")?;
        let rows = stmt
          .query_map([], site_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(sites)
  }

  // ── Plants ────────────────────────────────────────────────────────────────

  async fn insert_plants(&self, plants: Vec<NewPlant>) -> Result<usize> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO plants (site_id, species) VALUES (?1, ?2)")?;
          for plant in &plants {
            inserted += stmt.execute(rusqlite::params![plant.site_id, plant.species])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  async fn list_plants(&self) -> Result<Vec<Plant>> {
    let plants = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, site_id, area_id, species FROM plants ORDER BY id")?;
        let rows = stmt
          .query_map([], plant_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(plants)
  }

  async fn plant_locations(&self) -> Result<Vec<PlantLocation>> {
    let locations = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT p.id, p.site_id, p.area_id, s.latitude, s.longitude
           FROM plants p
           JOIN sites  s ON s.id = p.site_id
           ORDER BY p.id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(PlantLocation {
              plant_id: row.get(0)?,
              site_id:  row.get(1)?,
              area_id:  row.get(2)?,
              location: Point::new(row.get(3)?, row.get(4)?),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(locations)
  }

  async fn area_plants(&self, area_id: AreaId) -> Result<Vec<Plant>> {
    let plants = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, site_id, area_id, species FROM plants WHERE area_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![area_id], plant_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(plants)
  }

  // ── Observations ──────────────────────────────────────────────────────────

  async fn insert_observations(&self, observations: Vec<Observation>) -> Result<usize> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT OR IGNORE INTO observations ({OBSERVATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
          ))?;
          for obs in &observations {
            inserted += stmt.execute(rusqlite::params![
              obs.id,
              obs.site_id,
              obs.plant_id,
              obs.phenophase_id,
              encode_date(obs.observation_date),
              obs.is_blooming,
              obs.description,
            ])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  async fn plant_observations(&self, plant_id: PlantId) -> Result<Vec<Observation>> {
    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OBSERVATION_COLUMNS} FROM observations
           WHERE plant_id = ?1
           ORDER BY observation_date, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![plant_id], RawObservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  // ── Areas ─────────────────────────────────────────────────────────────────

  async fn materialize_area(
    &self,
    vertices: Vec<Point>,
    plant_ids: Vec<PlantId>,
  ) -> Result<Area> {
    if vertices.is_empty() {
      return Err(Error::EmptyPolygon);
    }

    let created_at = Utc::now();
    let at_str = encode_dt(created_at);

    // The transaction rolls back when dropped without `commit`, which covers
    // both `?` exits and the missing-plant exit.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO areas (created_at) VALUES (?1)", rusqlite::params![at_str])?;
        let area_id = tx.last_insert_rowid();

        let mut coordinates = Vec::with_capacity(vertices.len());
        let mut missing = Vec::new();
        {
          let mut insert = tx.prepare(
            "INSERT INTO area_coordinates (area_id, latitude, longitude, vertex_order)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (order, vertex) in (0u32..).zip(&vertices) {
            insert.execute(rusqlite::params![
              area_id,
              vertex.latitude,
              vertex.longitude,
              order
            ])?;
            coordinates.push(AreaCoordinate {
              id: tx.last_insert_rowid(),
              area_id,
              latitude: vertex.latitude,
              longitude: vertex.longitude,
              order,
            });
          }

          let mut reassign = tx.prepare("UPDATE plants SET area_id = ?1 WHERE id = ?2")?;
          for plant_id in &plant_ids {
            if reassign.execute(rusqlite::params![area_id, plant_id])? == 0 {
              missing.push(*plant_id);
            }
          }
        }

        if !missing.is_empty() {
          return Ok(Materialized::MissingPlants(missing));
        }
        tx.commit()?;
        Ok(Materialized::Committed { area_id, coordinates })
      })
      .await?;

    match outcome {
      Materialized::Committed { area_id, coordinates } => Ok(Area {
        id: area_id,
        coordinates,
        description: None,
        created_at,
      }),
      Materialized::MissingPlants(ids) => Err(Error::PlantsNotFound(ids)),
    }
  }

  async fn get_area(&self, id: AreaId) -> Result<Option<Area>> {
    let raw: Option<RawArea> = self
      .conn
      .call(move |conn| {
        let head = conn
          .query_row(
            &format!("SELECT {AREA_COLUMNS} FROM areas WHERE id = ?1"),
            rusqlite::params![id],
            |row| {
              Ok(RawArea {
                id:          row.get(0)?,
                description: row.get(1)?,
                created_at:  row.get(2)?,
                coordinates: Vec::new(),
              })
            },
          )
          .optional()?;

        let Some(mut raw) = head else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {COORDINATE_COLUMNS} FROM area_coordinates
           WHERE area_id = ?1
           ORDER BY vertex_order"
        ))?;
        raw.coordinates = stmt
          .query_map(rusqlite::params![id], coordinate_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawArea::into_area).transpose()
  }

  async fn list_areas(&self) -> Result<Vec<Area>> {
    let raws: Vec<RawArea> = self
      .conn
      .call(|conn| {
        let mut coordinates: BTreeMap<AreaId, Vec<AreaCoordinate>> = BTreeMap::new();
        {
          let mut stmt = conn.prepare(&format!(
            "SELECT {COORDINATE_COLUMNS} FROM area_coordinates
             ORDER BY area_id, vertex_order"
          ))?;
          for coordinate in stmt.query_map([], coordinate_from_row)? {
            let coordinate = coordinate?;
            coordinates.entry(coordinate.area_id).or_default().push(coordinate);
          }
        }

        let mut stmt =
          conn.prepare(&format!("SELECT {AREA_COLUMNS} FROM areas ORDER BY id"))?;
        let rows = stmt
          .query_map([], |row| {
            let id: AreaId = row.get(0)?;
            Ok(RawArea {
              id,
              description: row.get(1)?,
              created_at: row.get(2)?,
              coordinates: coordinates.remove(&id).unwrap_or_default(),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArea::into_area).collect()
  }

  async fn delete_area(&self, id: AreaId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("UPDATE plants SET area_id = NULL WHERE area_id = ?1", rusqlite::params![id])?;
        tx.execute("DELETE FROM area_coordinates WHERE area_id = ?1", rusqlite::params![id])?;
        let deleted = tx.execute("DELETE FROM areas WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
      })
      .await?;
    Ok(deleted)
  }

  async fn set_area_description(&self, id: AreaId, description: String) -> Result<bool> {
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE areas SET description = ?1 WHERE id = ?2",
          rusqlite::params![description, id],
        )?)
      })
      .await?;
    Ok(updated > 0)
  }
}
