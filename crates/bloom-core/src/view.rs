//! The area read model, assembled on every request and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  model::{AreaCoordinate, AreaId, Observation, Plant, Site},
  monthly::monthly_summary,
  store::PhenologyStore,
};

/// A member plant with its site and monthly-reduced observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantView {
  #[serde(flatten)]
  pub plant:        Plant,
  /// `None` only if the site row has vanished underneath the plant.
  pub site:         Option<Site>,
  /// At most one observation per month, most recent first.
  pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaView {
  pub id:          AreaId,
  pub coordinates: Vec<AreaCoordinate>,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub plants:      Vec<PlantView>,
}

/// Load `area_id` with its plants, their sites and their monthly summaries.
/// Returns `None` if the area does not exist.
pub async fn load_area_view<S: PhenologyStore>(
  store: &S,
  area_id: AreaId,
) -> Result<Option<AreaView>, S::Error> {
  let Some(area) = store.get_area(area_id).await? else {
    return Ok(None);
  };

  let mut plants = Vec::new();
  for plant in store.area_plants(area_id).await? {
    let site = store.get_site(plant.site_id).await?;
    let history = store.plant_observations(plant.id).await?;
    plants.push(PlantView {
      plant,
      site,
      observations: monthly_summary(&history),
    });
  }

  Ok(Some(AreaView {
    id: area.id,
    coordinates: area.coordinates,
    description: area.description,
    created_at: area.created_at,
    plants,
  }))
}
