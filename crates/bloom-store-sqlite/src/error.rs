//! Error type for `bloom-store-sqlite`.

use bloom_core::model::PlantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An area must have at least one vertex.
  #[error("cannot create an area without vertices")]
  EmptyPolygon,

  /// Reassignment named plants that do not exist; nothing was written.
  #[error("plants not found: {0:?}")]
  PlantsNotFound(Vec<PlantId>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
