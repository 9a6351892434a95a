//! CSV import for phenology exports.
//!
//! A file is read into [`CsvRecord`]s, normalized into a [`Batch`] of unique
//! sites, `(site, species)` plants and observation drafts, and then written
//! through any [`PhenologyStore`]. Every step skips rows the store already
//! holds, so importing the same file twice is a no-op.
//!
//! Observations are linked to plants by `(site_id, species)` after the plants
//! are written; rows with no matching plant are stored with `plant_id = None`
//! and counted in [`ImportReport::unmapped`].

mod record;

use std::{
  collections::{HashMap, HashSet},
  io::Read,
};

use bloom_core::{
  model::{
    NewPlant, Observation, ObservationId, PhenophaseId, PlantId, Site, SiteId,
  },
  store::PhenologyStore,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use record::{CsvRecord, parse_date};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed CSV or a row that does not match [`CsvRecord`].
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Options & report ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
  /// Phenophase ids that count as "blooming".
  pub blooming_phenophases: Vec<PhenophaseId>,
}

impl Default for IngestOptions {
  fn default() -> Self { Self { blooming_phenophases: vec![500, 501] } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
  pub rows:                  usize,
  pub sites_inserted:        usize,
  pub plants_inserted:       usize,
  pub observations_inserted: usize,
  /// Observations stored without a plant.
  pub unmapped:              usize,
}

// ─── Normalization ───────────────────────────────────────────────────────────

/// An observation row before it has been linked to a plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationDraft {
  pub id:               ObservationId,
  pub site_id:          SiteId,
  pub species:          String,
  pub phenophase_id:    PhenophaseId,
  pub observation_date: NaiveDate,
  pub is_blooming:      bool,
  pub description:      Option<String>,
}

/// The unique entities found in a set of rows, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
  pub sites:        Vec<Site>,
  pub plants:       Vec<NewPlant>,
  pub observations: Vec<ObservationDraft>,
}

/// Read every row of a CSV document with a header line.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<CsvRecord>> {
  let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
  let records = rdr.deserialize().collect::<Result<Vec<CsvRecord>, _>>()?;
  Ok(records)
}

/// Split rows into unique sites and plants plus one draft per row.
///
/// The first row seen for a site id supplies its coordinates and elevation.
pub fn normalize(records: Vec<CsvRecord>, options: &IngestOptions) -> Batch {
  let blooming: HashSet<PhenophaseId> =
    options.blooming_phenophases.iter().copied().collect();
  let mut seen_sites = HashSet::new();
  let mut seen_plants = HashSet::new();
  let mut batch = Batch::default();

  for r in records {
    if seen_sites.insert(r.site_id) {
      batch.sites.push(Site {
        id:        r.site_id,
        latitude:  r.latitude,
        longitude: r.longitude,
        elevation: r.elevation.round() as i32,
      });
    }

    let plant = NewPlant { site_id: r.site_id, species: r.species.clone() };
    if seen_plants.insert(plant.clone()) {
      batch.plants.push(plant);
    }

    batch.observations.push(ObservationDraft {
      id:               r.observation_id,
      site_id:          r.site_id,
      species:          r.species,
      phenophase_id:    r.phenophase_id,
      observation_date: r.date,
      is_blooming:      blooming.contains(&r.phenophase_id),
      description:      r.description.filter(|d| !d.is_empty()),
    });
  }

  batch
}

/// Resolve each draft's plant through `plants`, keyed by `(site_id,
/// species)`. Returns the observations and the number left unmapped.
pub fn link_observations(
  drafts: Vec<ObservationDraft>,
  plants: &HashMap<(SiteId, String), PlantId>,
) -> (Vec<Observation>, usize) {
  let mut unmapped = 0;
  let observations = drafts
    .into_iter()
    .map(|d| {
      let plant_id = plants.get(&(d.site_id, d.species)).copied();
      if plant_id.is_none() {
        unmapped += 1;
      }
      Observation {
        id: d.id,
        site_id: d.site_id,
        plant_id,
        phenophase_id: d.phenophase_id,
        observation_date: d.observation_date,
        is_blooming: d.is_blooming,
        description: d.description,
      }
    })
    .collect();
  (observations, unmapped)
}

// ─── Import ──────────────────────────────────────────────────────────────────

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}

/// Read a CSV document from `reader` and write it through `store`.
///
/// The whole document is parsed before anything is written; a malformed row
/// aborts the import with nothing stored.
pub async fn import<S, R>(store: &S, reader: R, options: &IngestOptions) -> Result<ImportReport>
where
  S: PhenologyStore,
  R: Read,
{
  let records = read_records(reader)?;
  let rows = records.len();
  let batch = normalize(records, options);

  let sites_inserted = store.insert_sites(batch.sites).await.map_err(store_err)?;
  let plants_inserted = store.insert_plants(batch.plants).await.map_err(store_err)?;

  let mapping: HashMap<(SiteId, String), PlantId> = store
    .list_plants()
    .await
    .map_err(store_err)?
    .into_iter()
    .map(|p| ((p.site_id, p.species), p.id))
    .collect();

  let (observations, unmapped) = link_observations(batch.observations, &mapping);
  if unmapped > 0 {
    tracing::warn!(unmapped, "observations without a matching plant stored unmapped");
  }
  let observations_inserted =
    store.insert_observations(observations).await.map_err(store_err)?;

  let report = ImportReport {
    rows,
    sites_inserted,
    plants_inserted,
    observations_inserted,
    unmapped,
  };
  tracing::info!(
    rows,
    sites = sites_inserted,
    plants = plants_inserted,
    observations = observations_inserted,
    "import finished"
  );
  Ok(report)
}
