//! Integration tests for `SqliteStore` against an in-memory database.

use bloom_core::{
  cluster::{
    ClusterOptions, GroupOutcome, SiteGroup, cluster_sites, run_clustering,
  },
  model::{NewPlant, Observation, PlantLocation, Point, Site},
  polygon::PolygonKind,
  store::PhenologyStore,
  view::load_area_view,
};
use chrono::NaiveDate;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn site(id: i64, lat: f64, lon: f64) -> Site {
  Site { id, latitude: lat, longitude: lon, elevation: 250 }
}

fn plant(site_id: i64, species: &str) -> NewPlant {
  NewPlant { site_id, species: species.into() }
}

fn date(s: &str) -> NaiveDate {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn obs(id: i64, plant_id: Option<i64>, day: &str) -> Observation {
  Observation {
    id,
    site_id: 1,
    plant_id,
    phenophase_id: 501,
    observation_date: date(day),
    is_blooming: true,
    description: Some("Open flowers".into()),
  }
}

/// One site holding `species.len()` plants; returns the plant ids.
async fn seed_site(s: &SqliteStore, site_id: i64, species: &[&str]) -> Vec<i64> {
  s.insert_sites(vec![site(site_id, 40.0, -105.0)]).await.unwrap();
  s.insert_plants(species.iter().map(|sp| plant(site_id, sp)).collect())
    .await
    .unwrap();
  s.list_plants()
    .await
    .unwrap()
    .into_iter()
    .filter(|p| p.site_id == site_id)
    .map(|p| p.id)
    .collect()
}

// ─── Sites, plants, observations ─────────────────────────────────────────────

#[tokio::test]
async fn site_inserts_are_idempotent() {
  let s = store().await;

  let first = s
    .insert_sites(vec![site(1, 40.0, -105.0), site(2, 41.0, -106.0)])
    .await
    .unwrap();
  assert_eq!(first, 2);

  let again = s
    .insert_sites(vec![site(1, 0.0, 0.0), site(3, 42.0, -107.0)])
    .await
    .unwrap();
  assert_eq!(again, 1);

  // The first row for site 1 is kept.
  let one = s.get_site(1).await.unwrap().unwrap();
  assert_eq!(one.latitude, 40.0);
  assert_eq!(s.list_sites().await.unwrap().len(), 3);
}

#[tokio::test]
async fn get_site_missing_returns_none() {
  let s = store().await;
  assert!(s.get_site(404).await.unwrap().is_none());
}

#[tokio::test]
async fn plants_are_unique_per_site_and_species() {
  let s = store().await;
  s.insert_sites(vec![site(1, 40.0, -105.0), site(2, 41.0, -106.0)])
    .await
    .unwrap();

  let inserted = s
    .insert_plants(vec![
      plant(1, "Acer rubrum"),
      plant(1, "Acer rubrum"),
      plant(2, "Acer rubrum"),
    ])
    .await
    .unwrap();
  assert_eq!(inserted, 2);

  let plants = s.list_plants().await.unwrap();
  assert_eq!(plants.len(), 2);
  assert!(plants.iter().all(|p| p.area_id.is_none()));
}

#[tokio::test]
async fn plant_locations_join_site_coordinates() {
  let s = store().await;
  s.insert_sites(vec![site(7, 44.5, -72.25)]).await.unwrap();
  s.insert_plants(vec![plant(7, "Cornus florida")]).await.unwrap();

  let locations = s.plant_locations().await.unwrap();
  assert_eq!(locations.len(), 1);
  assert_eq!(locations[0].site_id, 7);
  assert_eq!(locations[0].location, Point::new(44.5, -72.25));
  assert_eq!(locations[0].area_id, None);
}

#[tokio::test]
async fn observations_round_trip_and_orphans_are_kept() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["Prunus serotina"]).await;
  let plant_id = ids[0];

  let inserted = s
    .insert_observations(vec![
      obs(100, Some(plant_id), "2024-03-02"),
      obs(101, Some(plant_id), "2024-01-15"),
      obs(102, None, "2024-02-10"),
    ])
    .await
    .unwrap();
  assert_eq!(inserted, 3);

  // Same ids again are ignored.
  let again = s
    .insert_observations(vec![obs(100, Some(plant_id), "2024-03-02")])
    .await
    .unwrap();
  assert_eq!(again, 0);

  let history = s.plant_observations(plant_id).await.unwrap();
  let dates: Vec<_> = history.iter().map(|o| o.observation_date).collect();
  assert_eq!(dates, [date("2024-01-15"), date("2024-03-02")]);
  assert_eq!(history[0].description.as_deref(), Some("Open flowers"));
}

// ─── Areas ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn materialize_area_writes_vertices_in_order() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["A", "B"]).await;

  let vertices = vec![Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0)];
  let area = s.materialize_area(vertices.clone(), ids.clone()).await.unwrap();
  assert_eq!(area.vertices(), vertices);
  assert!(area.description.is_none());

  let fetched = s.get_area(area.id).await.unwrap().unwrap();
  let orders: Vec<_> = fetched.coordinates.iter().map(|c| c.order).collect();
  assert_eq!(orders, [0, 1, 2]);
  assert_eq!(fetched.vertices(), vertices);

  let members = s.area_plants(area.id).await.unwrap();
  assert_eq!(members.iter().map(|p| p.id).collect::<Vec<_>>(), ids);
}

#[tokio::test]
async fn materialize_area_rejects_empty_polygon() {
  let s = store().await;
  let result = s.materialize_area(vec![], vec![]).await;
  assert!(matches!(result, Err(Error::EmptyPolygon)));
  assert!(s.list_areas().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_plant_rolls_back_the_whole_area() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["A"]).await;

  let result = s
    .materialize_area(vec![Point::new(1.0, 2.0)], vec![ids[0], 9_999])
    .await;
  match result {
    Err(Error::PlantsNotFound(missing)) => assert_eq!(missing, [9_999]),
    other => panic!("expected PlantsNotFound, got {other:?}"),
  }

  assert!(s.list_areas().await.unwrap().is_empty());
  let plants = s.list_plants().await.unwrap();
  assert!(plants[0].area_id.is_none());
}

#[tokio::test]
async fn nan_vertex_rolls_back_the_whole_area() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["A"]).await;

  let result = s
    .materialize_area(vec![Point::new(1.0, 2.0), Point::new(f64::NAN, 0.0)], ids)
    .await;
  assert!(matches!(result, Err(Error::Database(_))));
  assert!(s.list_areas().await.unwrap().is_empty());
  assert!(s.list_plants().await.unwrap()[0].area_id.is_none());
}

#[tokio::test]
async fn list_areas_orders_by_id_with_coordinates() {
  let s = store().await;
  let a = s.materialize_area(vec![Point::new(1.0, 1.0)], vec![]).await.unwrap();
  let b = s
    .materialize_area(vec![Point::new(2.0, 2.0), Point::new(3.0, 3.0)], vec![])
    .await
    .unwrap();

  let areas = s.list_areas().await.unwrap();
  assert_eq!(areas.iter().map(|a| a.id).collect::<Vec<_>>(), [a.id, b.id]);
  assert_eq!(areas[0].coordinates.len(), 1);
  assert_eq!(areas[1].vertices(), b.vertices());
}

#[tokio::test]
async fn description_can_be_set_once_area_exists() {
  let s = store().await;
  let area = s.materialize_area(vec![Point::new(1.0, 1.0)], vec![]).await.unwrap();

  assert!(s.set_area_description(area.id, "Early spring bloom".into()).await.unwrap());
  assert!(!s.set_area_description(area.id + 1, "nobody".into()).await.unwrap());

  let fetched = s.get_area(area.id).await.unwrap().unwrap();
  assert_eq!(fetched.description.as_deref(), Some("Early spring bloom"));
}

#[tokio::test]
async fn delete_missing_area_returns_false() {
  let s = store().await;
  assert!(!s.delete_area(12).await.unwrap());
}

#[tokio::test]
async fn area_ids_are_not_reused_after_delete() {
  let s = store().await;
  let first = s.materialize_area(vec![Point::new(1.0, 1.0)], vec![]).await.unwrap();
  assert!(s.delete_area(first.id).await.unwrap());

  let second = s.materialize_area(vec![Point::new(1.0, 1.0)], vec![]).await.unwrap();
  assert!(second.id > first.id);
}

// ─── End-to-end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn square_site_becomes_a_four_vertex_area() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["A", "B", "C", "D"]).await;

  // Plants at one site share its location; spread them by hand.
  let corners = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)];
  let group = SiteGroup {
    site:   site(1, 40.0, -105.0),
    plants: ids
      .iter()
      .zip(corners)
      .map(|(&plant_id, (lat, lon))| PlantLocation {
        plant_id,
        site_id: 1,
        area_id: None,
        location: Point::new(lat, lon),
      })
      .collect(),
  };

  let report = cluster_sites(&s, vec![group], &ClusterOptions::default()).await;
  let [area_id] = report.created_areas()[..] else {
    panic!("expected one area, got {report:?}");
  };
  assert!(matches!(
    report.groups[0].outcome,
    GroupOutcome::Created { polygon: PolygonKind::Hull, vertices: 4, plants: 4, .. }
  ));

  let area = s.get_area(area_id).await.unwrap().unwrap();
  let orders: Vec<_> = area.coordinates.iter().map(|c| c.order).collect();
  assert_eq!(orders, [0, 1, 2, 3]);
  assert_eq!(s.coordinate_count(area_id).await.unwrap(), 4);

  let plants = s.list_plants().await.unwrap();
  assert!(plants.iter().all(|p| p.area_id == Some(area_id)));
}

#[tokio::test]
async fn single_plant_site_becomes_a_one_vertex_area() {
  let s = store().await;
  s.insert_sites(vec![site(1, 10.0, 20.0)]).await.unwrap();
  s.insert_plants(vec![plant(1, "Syringa vulgaris")]).await.unwrap();

  let options = ClusterOptions { use_site_anchor: false, ..Default::default() };
  let report = run_clustering(&s, &options).await.unwrap();
  let area_id = report.created_areas()[0];

  let area = s.get_area(area_id).await.unwrap().unwrap();
  assert_eq!(area.vertices(), [Point::new(10.0, 20.0)]);
  assert_eq!(s.coordinate_count(area_id).await.unwrap(), 1);
}

#[tokio::test]
async fn clustering_skips_sites_without_plants() {
  let s = store().await;
  s.insert_sites(vec![site(1, 10.0, 20.0), site(2, 11.0, 21.0)])
    .await
    .unwrap();
  s.insert_plants(vec![plant(2, "Acer saccharum")]).await.unwrap();

  let report = run_clustering(&s, &ClusterOptions::default()).await.unwrap();
  assert_eq!(report.groups[0].outcome, GroupOutcome::Empty);
  assert_eq!(report.created_areas().len(), 1);
  assert_eq!(s.list_areas().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rerunning_clustering_replaces_previous_areas() {
  let s = store().await;
  s.insert_sites(vec![site(1, 10.0, 20.0), site(2, 11.0, 21.0)])
    .await
    .unwrap();
  s.insert_plants(vec![plant(1, "Acer saccharum"), plant(2, "Cornus florida")])
    .await
    .unwrap();

  let first = run_clustering(&s, &ClusterOptions::default()).await.unwrap();
  let first_areas = first.created_areas();
  assert_eq!(first_areas.len(), 2);

  let second = run_clustering(&s, &ClusterOptions::default()).await.unwrap();
  let second_areas = second.created_areas();
  assert_eq!(second_areas.len(), 2);
  for (result, old) in second.groups.iter().zip(&first_areas) {
    match &result.outcome {
      GroupOutcome::Created { replaced, .. } => assert_eq!(replaced, &[*old]),
      other => panic!("unexpected {other:?}"),
    }
  }

  let ids: Vec<_> = s.list_areas().await.unwrap().iter().map(|a| a.id).collect();
  assert_eq!(ids, second_areas);
  for old in first_areas {
    assert_eq!(s.coordinate_count(old).await.unwrap(), 0);
  }
}

#[tokio::test]
async fn area_shared_with_another_site_survives_reclustering() {
  let s = store().await;
  s.insert_sites(vec![site(1, 10.0, 20.0), site(2, 11.0, 21.0)])
    .await
    .unwrap();
  s.insert_plants(vec![plant(1, "Acer saccharum"), plant(2, "Cornus florida")])
    .await
    .unwrap();
  let plants = s.list_plants().await.unwrap();
  let shared = s
    .materialize_area(
      vec![Point::new(10.0, 20.0), Point::new(11.0, 21.0)],
      plants.iter().map(|p| p.id).collect(),
    )
    .await
    .unwrap();

  // Site 1 alone moves out; site 2's plant still holds the shared area.
  let group = SiteGroup {
    site:   site(1, 10.0, 20.0),
    plants: s
      .plant_locations()
      .await
      .unwrap()
      .into_iter()
      .filter(|l| l.site_id == 1)
      .collect(),
  };
  let report = cluster_sites(&s, vec![group], &ClusterOptions::default()).await;
  assert!(matches!(
    &report.groups[0].outcome,
    GroupOutcome::Created { replaced, .. } if replaced.is_empty()
  ));
  assert!(s.get_area(shared.id).await.unwrap().is_some());
  assert_eq!(s.area_plants(shared.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failing_group_does_not_stop_later_groups() {
  let s = store().await;
  let ids = seed_site(&s, 2, &["A"]).await;

  let bad = SiteGroup {
    site:   site(1, 0.0, 0.0),
    plants: vec![PlantLocation {
      plant_id: 9_999,
      site_id:  1,
      area_id:  None,
      location: Point::new(0.0, 0.0),
    }],
  };
  let good = SiteGroup {
    site:   site(2, 40.0, -105.0),
    plants: vec![PlantLocation {
      plant_id: ids[0],
      site_id:  2,
      area_id:  None,
      location: Point::new(40.0, -105.0),
    }],
  };

  let report = cluster_sites(&s, vec![bad, good], &ClusterOptions::default()).await;
  assert_eq!(report.failed().count(), 1);
  assert_eq!(report.created_areas().len(), 1);
  assert_eq!(s.list_areas().await.unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_group_is_skipped() {
  let s = store().await;
  seed_site(&s, 1, &["A", "B", "C"]).await;

  let options = ClusterOptions { max_points: 2, ..Default::default() };
  let report = run_clustering(&s, &options).await.unwrap();
  assert_eq!(report.groups[0].outcome, GroupOutcome::Oversized { points: 3 });
  assert!(s.list_areas().await.unwrap().is_empty());
}

#[tokio::test]
async fn area_view_reduces_observations_to_months() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["Forsythia"]).await;
  let plant_id = ids[0];
  s.insert_observations(vec![
    obs(1, Some(plant_id), "2024-01-05"),
    obs(2, Some(plant_id), "2024-01-20"),
    obs(3, Some(plant_id), "2024-02-01"),
  ])
  .await
  .unwrap();

  let area = s
    .materialize_area(vec![Point::new(40.0, -105.0)], vec![plant_id])
    .await
    .unwrap();

  let view = load_area_view(&s, area.id).await.unwrap().unwrap();
  assert_eq!(view.plants.len(), 1);
  let member = &view.plants[0];
  assert_eq!(member.site.as_ref().map(|s| s.id), Some(1));
  let dates: Vec<_> = member.observations.iter().map(|o| o.observation_date).collect();
  assert_eq!(dates, [date("2024-02-01"), date("2024-01-20")]);

  assert!(load_area_view(&s, area.id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_an_area_releases_its_plants() {
  let s = store().await;
  let ids = seed_site(&s, 1, &["A", "B", "C"]).await;
  let area = s
    .materialize_area(
      vec![Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0)],
      ids.clone(),
    )
    .await
    .unwrap();
  assert_eq!(s.area_plants(area.id).await.unwrap().len(), 3);

  assert!(s.delete_area(area.id).await.unwrap());

  assert!(s.get_area(area.id).await.unwrap().is_none());
  assert_eq!(s.coordinate_count(area.id).await.unwrap(), 0);
  let plants = s.list_plants().await.unwrap();
  assert_eq!(plants.len(), 3);
  assert!(plants.iter().all(|p| p.area_id.is_none()));
}
