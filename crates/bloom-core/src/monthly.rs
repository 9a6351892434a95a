//! Read-side reduction of a plant's observation history.

use std::collections::BTreeMap;

use chrono::Datelike as _;

use crate::model::Observation;

/// How many distinct months [`monthly_summary`] keeps.
pub const MAX_MONTHS: usize = 12;

/// Collapse `observations` to the latest observation of each calendar month,
/// most recent first, keeping at most [`MAX_MONTHS`] months.
///
/// When several observations share a month's latest date, the first one in
/// input order wins.
pub fn monthly_summary(observations: &[Observation]) -> Vec<Observation> {
  let mut latest: BTreeMap<(i32, u32), &Observation> = BTreeMap::new();

  for obs in observations {
    let key = (obs.observation_date.year(), obs.observation_date.month());
    latest
      .entry(key)
      .and_modify(|kept| {
        if obs.observation_date > kept.observation_date {
          *kept = obs;
        }
      })
      .or_insert(obs);
  }

  // Keys ascend by (year, month); one survivor per month means walking them
  // backwards already yields strictly descending dates.
  latest
    .into_values()
    .rev()
    .take(MAX_MONTHS)
    .cloned()
    .collect()
}
