//! Per-site clustering: one polygon and one area per site's plant set.
//!
//! Groups are materialized one at a time, each in its own store
//! transaction. A group that fails is logged and recorded in the
//! [`ClusterReport`]; groups already committed stay committed and the loop
//! moves on.
//!
//! Running again over the same store moves every plant into a fresh area.
//! An area left without plants by that move is deleted once the new area
//! has committed, so reruns do not accumulate stale areas. Areas that still
//! hold plants from other sites are kept.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
  model::{AreaId, PlantId, PlantLocation, Point, Site, SiteId},
  polygon::{PolygonKind, generate_polygon},
  store::PhenologyStore,
};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
  /// Offer the site's own location as the fallback vertex.
  pub use_site_anchor: bool,
  /// Groups with more plant locations than this are skipped.
  pub max_points:      usize,
}

impl Default for ClusterOptions {
  fn default() -> Self {
    Self { use_site_anchor: true, max_points: 10_000 }
  }
}

// ─── Grouping ────────────────────────────────────────────────────────────────

/// All plant locations belonging to one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteGroup {
  pub site:   Site,
  pub plants: Vec<PlantLocation>,
}

impl SiteGroup {
  pub fn points(&self) -> Vec<Point> { self.plants.iter().map(|p| p.location).collect() }

  pub fn plant_ids(&self) -> Vec<PlantId> { self.plants.iter().map(|p| p.plant_id).collect() }

  /// Distinct areas the group's plants belonged to before clustering.
  pub fn previous_areas(&self) -> BTreeSet<AreaId> {
    self.plants.iter().filter_map(|p| p.area_id).collect()
  }
}

/// Group `locations` under their sites, one group per site (including sites
/// with no plants), ordered by site id.
///
/// Locations that reference an unknown site are dropped with a warning.
pub fn group_by_site(sites: Vec<Site>, locations: Vec<PlantLocation>) -> Vec<SiteGroup> {
  let mut groups: BTreeMap<SiteId, SiteGroup> = sites
    .into_iter()
    .map(|site| (site.id, SiteGroup { site, plants: Vec::new() }))
    .collect();

  for location in locations {
    match groups.get_mut(&location.site_id) {
      Some(group) => group.plants.push(location),
      None => tracing::warn!(
        plant_id = location.plant_id,
        site_id = location.site_id,
        "plant references an unknown site; not clustered"
      ),
    }
  }

  groups.into_values().collect()
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GroupOutcome {
  Created {
    area_id:  AreaId,
    vertices: usize,
    plants:   usize,
    polygon:  PolygonKind,
    /// Previous areas deleted because this group emptied them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    replaced: Vec<AreaId>,
  },
  /// The site has no plants.
  Empty,
  /// The polygon generator returned no vertices.
  NoVertices,
  Oversized { points: usize },
  Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
  pub site_id: SiteId,
  #[serde(flatten)]
  pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterReport {
  pub groups: Vec<GroupResult>,
}

impl ClusterReport {
  /// Ids of the areas created by this run, in processing order.
  pub fn created_areas(&self) -> Vec<AreaId> {
    self
      .groups
      .iter()
      .filter_map(|g| match g.outcome {
        GroupOutcome::Created { area_id, .. } => Some(area_id),
        _ => None,
      })
      .collect()
  }

  pub fn failed(&self) -> impl Iterator<Item = &GroupResult> {
    self
      .groups
      .iter()
      .filter(|g| matches!(g.outcome, GroupOutcome::Failed { .. }))
  }

  /// Groups whose hull computation fell back to raw points.
  pub fn fallbacks(&self) -> usize {
    self
      .groups
      .iter()
      .filter(|g| {
        matches!(
          g.outcome,
          GroupOutcome::Created { polygon: PolygonKind::Fallback(_), .. }
        )
      })
      .count()
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// Build and persist one area per non-empty group, in the given order.
pub async fn cluster_sites<S: PhenologyStore>(
  store: &S,
  groups: Vec<SiteGroup>,
  options: &ClusterOptions,
) -> ClusterReport {
  let mut report = ClusterReport::default();

  for group in groups {
    let site_id = group.site.id;
    let outcome = cluster_group(store, &group, options).await;
    report.groups.push(GroupResult { site_id, outcome });
  }

  tracing::info!(
    groups = report.groups.len(),
    areas = report.created_areas().len(),
    fallbacks = report.fallbacks(),
    failed = report.failed().count(),
    "clustering finished"
  );
  report
}

async fn cluster_group<S: PhenologyStore>(
  store: &S,
  group: &SiteGroup,
  options: &ClusterOptions,
) -> GroupOutcome {
  let site_id = group.site.id;

  if group.plants.is_empty() {
    return GroupOutcome::Empty;
  }
  if group.plants.len() > options.max_points {
    tracing::warn!(
      site_id,
      points = group.plants.len(),
      max_points = options.max_points,
      "site group exceeds the point cap; skipped"
    );
    return GroupOutcome::Oversized { points: group.plants.len() };
  }

  let anchor = options.use_site_anchor.then(|| group.site.location());
  let polygon = generate_polygon(&group.points(), anchor);
  if polygon.is_empty() {
    return GroupOutcome::NoVertices;
  }

  let vertices = polygon.vertices.len();
  let plant_ids = group.plant_ids();
  let plants = plant_ids.len();

  match store.materialize_area(polygon.vertices, plant_ids).await {
    Ok(area) => {
      tracing::info!(site_id, area_id = area.id, vertices, plants, "area created");
      let replaced = prune_emptied(store, group.previous_areas(), area.id).await;
      GroupOutcome::Created {
        area_id: area.id,
        vertices,
        plants,
        polygon: polygon.kind,
        replaced,
      }
    }
    Err(e) => {
      tracing::error!(site_id, error = %e, "failed to materialize area; group rolled back");
      GroupOutcome::Failed { message: e.to_string() }
    }
  }
}

/// Delete each of `candidates` that no longer holds any plant.
///
/// Runs after the new area has committed. A failure here leaves a stale
/// area behind but never undoes the group.
async fn prune_emptied<S: PhenologyStore>(
  store: &S,
  candidates: BTreeSet<AreaId>,
  new_area: AreaId,
) -> Vec<AreaId> {
  let mut replaced = Vec::new();
  for area_id in candidates.into_iter().filter(|&id| id != new_area) {
    match store.area_plants(area_id).await {
      Ok(plants) if plants.is_empty() => match store.delete_area(area_id).await {
        Ok(true) => {
          tracing::info!(area_id, replaced_by = new_area, "emptied area deleted");
          replaced.push(area_id);
        }
        Ok(false) => {}
        Err(e) => tracing::warn!(area_id, error = %e, "failed to delete emptied area"),
      },
      Ok(_) => {}
      Err(e) => tracing::warn!(area_id, error = %e, "failed to check previous area"),
    }
  }
  replaced
}

/// Load every site and plant location from `store` and cluster them.
pub async fn run_clustering<S: PhenologyStore>(
  store: &S,
  options: &ClusterOptions,
) -> Result<ClusterReport, S::Error> {
  let sites = store.list_sites().await?;
  let locations = store.plant_locations().await?;
  let groups = group_by_site(sites, locations);
  Ok(cluster_sites(store, groups, options).await)
}
