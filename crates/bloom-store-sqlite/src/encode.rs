//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as
//! `YYYY-MM-DD`. Rows are first read into `Raw*` structs inside the
//! connection closure and converted afterwards, so parse failures surface as
//! store errors rather than `rusqlite` errors.

use bloom_core::model::{Area, AreaCoordinate, Observation, Plant, Site};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

pub fn site_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Site> {
  Ok(Site {
    id:        row.get(0)?,
    latitude:  row.get(1)?,
    longitude: row.get(2)?,
    elevation: row.get(3)?,
  })
}

pub fn plant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Plant> {
  Ok(Plant {
    id:      row.get(0)?,
    site_id: row.get(1)?,
    area_id: row.get(2)?,
    species: row.get(3)?,
  })
}

pub fn coordinate_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AreaCoordinate> {
  Ok(AreaCoordinate {
    id:        row.get(0)?,
    area_id:   row.get(1)?,
    latitude:  row.get(2)?,
    longitude: row.get(3)?,
    order:     row.get(4)?,
  })
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// An `observations` row before its date column is parsed.
pub struct RawObservation {
  pub id:               i64,
  pub site_id:          i64,
  pub plant_id:         Option<i64>,
  pub phenophase_id:    i32,
  pub observation_date: String,
  pub is_blooming:      bool,
  pub description:      Option<String>,
}

impl RawObservation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      site_id:          row.get(1)?,
      plant_id:         row.get(2)?,
      phenophase_id:    row.get(3)?,
      observation_date: row.get(4)?,
      is_blooming:      row.get(5)?,
      description:      row.get(6)?,
    })
  }

  pub fn into_observation(self) -> Result<Observation> {
    Ok(Observation {
      id:               self.id,
      site_id:          self.site_id,
      plant_id:         self.plant_id,
      phenophase_id:    self.phenophase_id,
      observation_date: decode_date(&self.observation_date)?,
      is_blooming:      self.is_blooming,
      description:      self.description,
    })
  }
}

/// An `areas` row plus its coordinates, before `created_at` is parsed.
pub struct RawArea {
  pub id:          i64,
  pub description: Option<String>,
  pub created_at:  String,
  pub coordinates: Vec<AreaCoordinate>,
}

impl RawArea {
  pub fn into_area(self) -> Result<Area> {
    Ok(Area {
      id:          self.id,
      coordinates: self.coordinates,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
