#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the covid map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the merge output so the API contract can evolve independently.

use chrono::{DateTime, NaiveDateTime, Utc};
use covid_map_district_models::{Coordinate, MergedEntity};
use covid_map_presentation::overlay::MapOverlay;
use covid_map_presentation::table::{SortColumn, SortDirection, TableRow};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Number of entries in the loaded coordinate cache.
    pub cached_districts: usize,
}

/// When the data behind a response was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSnapshotInfo {
    /// When the server fetched the statistics.
    pub fetched_at: DateTime<Utc>,
    /// When the RKI last updated them, if published.
    pub last_update: Option<NaiveDateTime>,
    /// Number of districts in the statistics snapshot.
    pub source_records: usize,
    /// Number of merged entities.
    pub entities: usize,
}

/// A merged district as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistrict {
    /// Display name.
    pub name: String,
    /// Location, if the geocoder found one.
    pub location: Option<Coordinate>,
    /// 7-day incidence per 100k used for the map.
    pub weight: f64,
    /// Federal state.
    pub state: String,
    /// State 7-day incidence per 100k.
    pub state_weight: f64,
}

impl From<MergedEntity> for ApiDistrict {
    fn from(entity: MergedEntity) -> Self {
        Self {
            location: entity.resolution.coordinate(),
            name: entity.display_name,
            weight: entity.weight,
            state: entity.state,
            state_weight: entity.state_weight,
        }
    }
}

/// `GET /api/districts` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistricts {
    /// Snapshot metadata.
    pub snapshot: ApiSnapshotInfo,
    /// Merged districts in snapshot order.
    pub districts: Vec<ApiDistrict>,
}

/// `GET /api/overlay` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOverlay {
    /// Snapshot metadata.
    pub snapshot: ApiSnapshotInfo,
    /// Map overlay.
    pub overlay: MapOverlay,
}

/// Query parameters for the table endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQueryParams {
    /// Column to sort by. Defaults to the district name.
    pub sort: Option<SortColumn>,
    /// Sort direction. Defaults to ascending.
    pub direction: Option<SortDirection>,
}

/// `GET /api/table` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTable {
    /// Snapshot metadata.
    pub snapshot: ApiSnapshotInfo,
    /// Column the rows are sorted by.
    pub sort: SortColumn,
    /// Sort direction.
    pub direction: SortDirection,
    /// Sorted rows.
    pub rows: Vec<TableRow>,
}

/// Error body for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use covid_map_district_models::Resolution;

    use super::*;

    #[test]
    fn district_hides_missing_location() {
        let district = ApiDistrict::from(MergedEntity {
            display_name: "Nirgendwo Landkreis".to_string(),
            resolution: Resolution::NotFound,
            weight: 5.0,
            state: "Bayern".to_string(),
            state_weight: 7.0,
        });
        let json = serde_json::to_value(&district).unwrap();
        assert_eq!(json["name"], "Nirgendwo Landkreis");
        assert!(json["location"].is_null());
        assert_eq!(json["stateWeight"], 7.0);
    }

    #[test]
    fn table_params_parse_lowercase_values() {
        let params: TableQueryParams =
            serde_json::from_str(r#"{"sort":"cases7_per_100k","direction":"desc"}"#).unwrap();
        assert_eq!(params.sort, Some(SortColumn::Cases7Per100k));
        assert_eq!(params.direction, Some(SortDirection::Desc));

        let empty: TableQueryParams = serde_json::from_str("{}").unwrap();
        assert!(empty.sort.is_none());
        assert!(empty.direction.is_none());
    }
}
