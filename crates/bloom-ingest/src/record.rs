//! One row of the phenology CSV export.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, de};

use bloom_core::model::{ObservationId, PhenophaseId, SiteId};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// A raw CSV row. Unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CsvRecord {
  #[serde(rename = "Observation_ID")]
  pub observation_id:  ObservationId,
  #[serde(rename = "Site_ID")]
  pub site_id:         SiteId,
  #[serde(rename = "Latitude")]
  pub latitude:        f64,
  #[serde(rename = "Longitude")]
  pub longitude:       f64,
  /// Exported as a decimal; rounded to whole meters on import.
  #[serde(rename = "Elevation_in_Meters")]
  pub elevation:       f64,
  #[serde(rename = "Species")]
  pub species:         String,
  #[serde(rename = "Phenophase_ID")]
  pub phenophase_id:   PhenophaseId,
  #[serde(rename = "Observation_Date", deserialize_with = "deserialize_date")]
  pub date:            NaiveDate,
  #[serde(rename = "Phenophase_Description", default)]
  pub description:     Option<String>,
}

/// Parse `YYYY-MM-DD` or `MM/DD/YYYY`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn deserialize_date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
  let raw = String::deserialize(d)?;
  parse_date(&raw).ok_or_else(|| de::Error::custom(format!("unrecognised date {raw:?}")))
}
