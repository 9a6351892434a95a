//! Error types for `bloom-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("a polygon needs at least one vertex")]
  EmptyPolygon,

  #[error("vertex orders must be exactly 0..{expected}, got {found:?}")]
  NonContiguousOrder { expected: usize, found: Vec<u32> },

  #[error("vertex {order} has a non-finite coordinate")]
  NonFiniteCoordinate { order: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
