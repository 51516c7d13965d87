#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Merges a statistics snapshot with cached coordinates.
//!
//! Each record is keyed by its display name and joined with the cached
//! resolution for that name. City-state subdivisions collapse into one
//! entity: the first subdivision wins and its state-level incidence
//! becomes the entity's weight, since a single borough's figure does not
//! represent the city. Output follows snapshot order; sorting is left to
//! the presentation layer.
//!
//! No geocoding happens here. A display name missing from the cache is
//! an [`MergeError::UnresolvedDistrict`]: [`merge`] logs and skips it,
//! [`try_merge`] aborts.

use std::collections::BTreeSet;

use covid_map_coordinates::CoordinateMap;
use covid_map_district_models::{DistrictKind, DistrictRecord, MergedEntity};
use thiserror::Error;

/// Errors from merging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The display name has no coordinate cache entry.
    #[error("District '{display_name}' is not in the coordinate cache")]
    UnresolvedDistrict {
        /// Display name that was looked up.
        display_name: String,
    },
}

/// Merges records with cached coordinates, skipping districts that are
/// not in the cache.
///
/// Skipped districts are logged as warnings. This usually means the
/// statistics service renamed a district after the cache was built; a
/// cache update or rebuild picks it up.
#[must_use]
pub fn merge(records: &[DistrictRecord], cache: &CoordinateMap) -> Vec<MergedEntity> {
    let mut dropped = 0_usize;
    let entities = merge_with(records, cache, |err| {
        log::warn!("Skipping district: {err}");
        dropped += 1;
        Ok(())
    })
    .unwrap_or_default();

    if dropped > 0 {
        log::warn!(
            "{dropped} of {} districts were missing from the coordinate cache",
            records.len()
        );
    }
    entities
}

/// Merges records with cached coordinates, failing on the first district
/// that is not in the cache.
///
/// # Errors
///
/// Returns [`MergeError::UnresolvedDistrict`] for the first record whose
/// display name has no cache entry.
pub fn try_merge(
    records: &[DistrictRecord],
    cache: &CoordinateMap,
) -> Result<Vec<MergedEntity>, MergeError> {
    merge_with(records, cache, Err)
}

/// Shared merge loop. `on_unresolved` decides whether a missing cache
/// entry is skipped (`Ok`) or aborts the merge (`Err`).
fn merge_with<F>(
    records: &[DistrictRecord],
    cache: &CoordinateMap,
    mut on_unresolved: F,
) -> Result<Vec<MergedEntity>, MergeError>
where
    F: FnMut(MergeError) -> Result<(), MergeError>,
{
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut entities = Vec::with_capacity(records.len());

    for record in records {
        let display_name = record.display_name();
        if !seen.insert(display_name.clone()) {
            if record.kind() == DistrictKind::Standard {
                log::debug!("Duplicate district '{display_name}' in snapshot; keeping the first");
            }
            continue;
        }

        let Some(resolution) = cache.get(&display_name) else {
            on_unresolved(MergeError::UnresolvedDistrict { display_name })?;
            continue;
        };

        let weight = match record.kind() {
            DistrictKind::Standard => record.cases7_per_100k,
            DistrictKind::AggregatedCityState => record.cases7_bl_per_100k,
        };

        entities.push(MergedEntity {
            display_name,
            resolution,
            weight,
            state: record.state.clone(),
            state_weight: record.cases7_bl_per_100k,
        });
    }

    Ok(entities)
}

#[cfg(test)]
mod tests {
    use covid_map_district_models::{CITY_STATE_NAME, Coordinate, Resolution};

    use super::*;

    fn record(nuts: &str, name: &str, suffix: &str, own: f64, state: f64) -> DistrictRecord {
        DistrictRecord {
            nuts: nuts.to_string(),
            name: name.to_string(),
            kind_suffix: suffix.to_string(),
            state: if name.contains("Berlin") { "Berlin" } else { "Brandenburg" }.to_string(),
            cases7_per_100k: own,
            cases7_bl_per_100k: state,
            population: None,
            cases: None,
            deaths: None,
            last_update: None,
        }
    }

    fn found(lat: f64, lon: f64) -> Resolution {
        Resolution::Found(Coordinate::new(lat, lon))
    }

    fn example_records() -> Vec<DistrictRecord> {
        vec![
            record("X1", "Musterstadt", "Kreis", 120.5, 95.0),
            record("X2", "Berlin-Mitte", "Bezirk", 210.0, 180.0),
            record("X2", "Berlin-Pankow", "Bezirk", 150.0, 180.0),
        ]
    }

    fn example_cache() -> CoordinateMap {
        [
            ("Musterstadt Kreis".to_string(), found(52.1, 13.0)),
            ("Berlin".to_string(), found(52.5, 13.4)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn worked_example() {
        let entities = merge(&example_records(), &example_cache());
        assert_eq!(entities.len(), 2);

        assert_eq!(entities[0].display_name, "Musterstadt Kreis");
        assert_eq!(entities[0].resolution, found(52.1, 13.0));
        assert!((entities[0].weight - 120.5).abs() < f64::EPSILON);

        assert_eq!(entities[1].display_name, CITY_STATE_NAME);
        assert_eq!(entities[1].resolution, found(52.5, 13.4));
        assert!((entities[1].weight - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn city_state_uses_first_record_state_incidence() {
        let records = vec![
            record("X2", "Berlin Mitte", "Bezirk", 210.0, 175.0),
            record("X1", "Musterstadt", "Kreis", 120.5, 95.0),
            record("X2", "Berlin Pankow", "Bezirk", 150.0, 999.0),
            record("X2", "Berlin Spandau", "Bezirk", 90.0, 999.0),
        ];
        let entities = merge(&records, &example_cache());

        let berlin: Vec<_> = entities
            .iter()
            .filter(|e| e.display_name == CITY_STATE_NAME)
            .collect();
        assert_eq!(berlin.len(), 1);
        assert!((berlin[0].weight - 175.0).abs() < f64::EPSILON);
        assert_eq!(entities[0].display_name, CITY_STATE_NAME);
    }

    #[test]
    fn drops_names_missing_from_cache() {
        let mut records = example_records();
        records.insert(1, record("X9", "Neustadt", "Landkreis", 50.0, 60.0));

        let entities = merge(&records, &example_cache());
        let names: Vec<&str> = entities.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, ["Musterstadt Kreis", "Berlin"]);
    }

    #[test]
    fn try_merge_aborts_on_missing_name() {
        let mut records = example_records();
        records.push(record("X9", "Neustadt", "Landkreis", 50.0, 60.0));

        assert_eq!(
            try_merge(&records, &example_cache()),
            Err(MergeError::UnresolvedDistrict {
                display_name: "Neustadt Landkreis".to_string()
            })
        );
        assert_eq!(try_merge(&example_records(), &example_cache()).unwrap().len(), 2);
    }

    #[test]
    fn every_shared_name_appears_exactly_once() {
        let records = vec![
            record("X1", "Musterstadt", "Kreis", 1.0, 2.0),
            record("X1", "Musterstadt", "Kreis", 3.0, 4.0),
            record("X3", "Altdorf", "Landkreis", 5.0, 6.0),
            record("X2", "Berlin Mitte", "Bezirk", 7.0, 8.0),
        ];
        let mut cache = example_cache();
        cache.insert("Altdorf Landkreis".to_string(), Resolution::NotFound);
        cache.insert("Unused Kreis".to_string(), found(1.0, 1.0));

        let entities = merge(&records, &cache);
        let names: Vec<&str> = entities.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, ["Musterstadt Kreis", "Altdorf Landkreis", "Berlin"]);
        assert_eq!(entities[1].resolution, Resolution::NotFound);
        assert!((entities[0].weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn carries_state_columns() {
        let entities = merge(&example_records(), &example_cache());
        assert_eq!(entities[0].state, "Brandenburg");
        assert!((entities[0].state_weight - 95.0).abs() < f64::EPSILON);
        assert_eq!(entities[1].state, "Berlin");
    }
}
