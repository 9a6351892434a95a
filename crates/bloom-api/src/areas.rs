//! Handlers for `/areas` endpoints.
//!
//! | Method   | Path          | Notes |
//! |----------|---------------|-------|
//! | `GET`    | `/areas`      | Coordinates sorted by `order` |
//! | `POST`   | `/areas`      | Body: `{"coordinates":[...],"plant_ids":[...]}` |
//! | `GET`    | `/areas/{id}` | Area view; 404 if not found |
//! | `DELETE` | `/areas/{id}` | 204; 404 if not found |

use std::{collections::HashSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bloom_core::{
  model::{Area, AreaId, NewAreaCoordinate, PlantId},
  polygon::ordered_vertices,
  store::PhenologyStore,
  view::{AreaView, load_area_view},
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /areas`
pub async fn list<S: PhenologyStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Area>>, ApiError> {
  let areas = store.list_areas().await.map_err(ApiError::store)?;
  Ok(Json(areas))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub coordinates: Vec<NewAreaCoordinate>,
  #[serde(default)]
  pub plant_ids:   Vec<PlantId>,
}

/// `POST /areas`
///
/// Coordinates may arrive in any order but their `order` fields must be
/// exactly `0..n`. Listed plants are moved into the new area.
pub async fn create<S: PhenologyStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let vertices =
    ordered_vertices(&body.coordinates).map_err(|e| ApiError::BadRequest(e.to_string()))?;

  if !body.plant_ids.is_empty() {
    let known: HashSet<PlantId> = store
      .list_plants()
      .await
      .map_err(ApiError::store)?
      .into_iter()
      .map(|p| p.id)
      .collect();
    let unknown: Vec<_> =
      body.plant_ids.iter().filter(|id| !known.contains(id)).copied().collect();
    if !unknown.is_empty() {
      return Err(ApiError::BadRequest(format!("unknown plant ids: {unknown:?}")));
    }
  }

  let area = store
    .materialize_area(vertices, body.plant_ids)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(area_id = area.id, vertices = area.coordinates.len(), "area created");

  let view = find_view(&*store, area.id).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /areas/{id}`
pub async fn get_one<S: PhenologyStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<AreaId>,
) -> Result<Json<AreaView>, ApiError> {
  Ok(Json(find_view(&*store, id).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /areas/{id}`
pub async fn delete_one<S: PhenologyStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<AreaId>,
) -> Result<StatusCode, ApiError> {
  if store.delete_area(id).await.map_err(ApiError::store)? {
    tracing::info!(area_id = id, "area deleted");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(not_found(id))
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

pub(crate) fn not_found(id: AreaId) -> ApiError {
  ApiError::NotFound(format!("area {id} not found"))
}

pub(crate) async fn find_view<S: PhenologyStore>(
  store: &S,
  id: AreaId,
) -> Result<AreaView, ApiError> {
  load_area_view(store, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))
}
