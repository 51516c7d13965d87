#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District statistics, coordinate, and merge types.
//!
//! These types are shared by every stage of the pipeline: the statistics
//! fetcher produces [`DistrictRecord`]s, the coordinate cache stores
//! [`Resolution`]s keyed by display name, and the merge engine emits
//! [`MergedEntity`]s for the presentation layer.
//!
//! The city-state aggregation policy lives in [`DistrictKind::classify`]
//! and nowhere else.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Substring in a district name that marks it as a subdivision of the
/// city-state (e.g. `"Berlin Mitte"`, `"Berlin Pankow"`).
pub const CITY_STATE_MARKER: &str = "Berlin";

/// Display name of the single synthetic entity that all city-state
/// subdivisions collapse into.
pub const CITY_STATE_NAME: &str = "Berlin";

/// One district as reported by the RKI statistics service.
///
/// Field names follow the `ArcGIS` attribute names of the
/// `RKI_Landkreisdaten` feature layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictRecord {
    /// NUTS-3 code (e.g. `"DE212"`).
    #[serde(rename = "NUTS")]
    pub nuts: String,
    /// District name (e.g. `"München"`).
    #[serde(rename = "GEN")]
    pub name: String,
    /// District type (e.g. `"Kreisfreie Stadt"`, `"Landkreis"`).
    #[serde(rename = "BEZ")]
    pub kind_suffix: String,
    /// Federal state name.
    #[serde(rename = "BL")]
    pub state: String,
    /// 7-day incidence per 100k residents for this district.
    pub cases7_per_100k: f64,
    /// 7-day incidence per 100k residents for the federal state.
    pub cases7_bl_per_100k: f64,
    /// Population.
    #[serde(rename = "EWZ", default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    /// Cumulative case count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases: Option<u64>,
    /// Cumulative death count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u64>,
    /// Free-text update stamp as published (e.g. `"16.10.2026, 00:00 Uhr"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}

impl DistrictRecord {
    /// Classifies this record. Shorthand for [`DistrictKind::classify`].
    #[must_use]
    pub fn kind(&self) -> DistrictKind {
        DistrictKind::classify(self)
    }

    /// Returns the display name used as the cache and merge key.
    ///
    /// Standard districts are named `"<name> <type>"`; every city-state
    /// subdivision maps to [`CITY_STATE_NAME`].
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind() {
            DistrictKind::Standard => format!("{} {}", self.name, self.kind_suffix),
            DistrictKind::AggregatedCityState => CITY_STATE_NAME.to_string(),
        }
    }
}

/// How a district participates in resolution and merging.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DistrictKind {
    /// An ordinary district, geocoded via its postal code.
    Standard,
    /// A city-state subdivision, collapsed into one synthetic entity that
    /// carries the state-level incidence.
    AggregatedCityState,
}

impl DistrictKind {
    /// Classifies a record by checking its name for [`CITY_STATE_MARKER`].
    #[must_use]
    pub fn classify(record: &DistrictRecord) -> Self {
        if record.name.contains(CITY_STATE_MARKER) {
            Self::AggregatedCityState
        } else {
            Self::Standard
        }
    }
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// The `(0, 0)` point legacy consumers use to mean "not found".
    pub const SENTINEL: Self = Self::new(0.0, 0.0);

    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Outcome of resolving a display name to a location.
///
/// Serialized as `[lat, lon]` when found and `null` otherwise, which keeps
/// the cache document readable and compatible with plain coordinate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<(f64, f64)>", into = "Option<(f64, f64)>")]
pub enum Resolution {
    /// The geocoder returned a location.
    Found(Coordinate),
    /// The geocoder had no match.
    NotFound,
}

impl Resolution {
    /// Returns the coordinate if one was found.
    #[must_use]
    pub const fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Found(c) => Some(*c),
            Self::NotFound => None,
        }
    }

    /// Whether a coordinate was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns the coordinate, or [`Coordinate::SENTINEL`] when not found.
    #[must_use]
    pub const fn or_sentinel(&self) -> Coordinate {
        match self {
            Self::Found(c) => *c,
            Self::NotFound => Coordinate::SENTINEL,
        }
    }
}

impl From<Option<(f64, f64)>> for Resolution {
    fn from(value: Option<(f64, f64)>) -> Self {
        value.map_or(Self::NotFound, |(lat, lon)| {
            Self::Found(Coordinate::new(lat, lon))
        })
    }
}

impl From<Resolution> for Option<(f64, f64)> {
    fn from(value: Resolution) -> Self {
        value.coordinate().map(|c| (c.latitude, c.longitude))
    }
}

/// One map/table entity after merging statistics with cached coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedEntity {
    /// Unique display name.
    pub display_name: String,
    /// Cached location.
    pub resolution: Resolution,
    /// Incidence used as the map weight. For the city-state entity this
    /// is the state-level incidence.
    pub weight: f64,
    /// Federal state name.
    pub state: String,
    /// State-level 7-day incidence per 100k.
    pub state_weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, suffix: &str) -> DistrictRecord {
        DistrictRecord {
            nuts: "DE000".to_string(),
            name: name.to_string(),
            kind_suffix: suffix.to_string(),
            state: "Brandenburg".to_string(),
            cases7_per_100k: 10.0,
            cases7_bl_per_100k: 20.0,
            population: None,
            cases: None,
            deaths: None,
            last_update: None,
        }
    }

    #[test]
    fn classifies_city_state_subdivisions() {
        assert_eq!(
            record("Berlin Mitte", "Bezirk").kind(),
            DistrictKind::AggregatedCityState
        );
        assert_eq!(record("Potsdam", "Kreisfreie Stadt").kind(), DistrictKind::Standard);
    }

    #[test]
    fn display_name_joins_name_and_suffix() {
        assert_eq!(record("Potsdam", "Kreisfreie Stadt").display_name(), "Potsdam Kreisfreie Stadt");
        assert_eq!(record("Berlin Pankow", "Bezirk").display_name(), CITY_STATE_NAME);
    }

    #[test]
    fn deserializes_arcgis_attributes() {
        let value = serde_json::json!({
            "NUTS": "DE212",
            "GEN": "München",
            "BEZ": "Kreisfreie Stadt",
            "BL": "Bayern",
            "cases7_per_100k": 42.5,
            "cases7_bl_per_100k": 38.0,
            "EWZ": 1_484_226,
            "last_update": "16.10.2026, 00:00 Uhr",
            "OBJECTID": 224
        });
        let rec: DistrictRecord = serde_json::from_value(value).unwrap();
        assert_eq!(rec.nuts, "DE212");
        assert_eq!(rec.display_name(), "München Kreisfreie Stadt");
        assert_eq!(rec.population, Some(1_484_226));
        assert!(rec.deaths.is_none());
    }

    #[test]
    fn resolution_serializes_as_pair_or_null() {
        let found = Resolution::Found(Coordinate::new(52.5, 13.4));
        assert_eq!(serde_json::to_value(found).unwrap(), serde_json::json!([52.5, 13.4]));
        assert_eq!(
            serde_json::to_value(Resolution::NotFound).unwrap(),
            serde_json::Value::Null
        );

        let back: Resolution = serde_json::from_str("null").unwrap();
        assert_eq!(back, Resolution::NotFound);
        assert_eq!(back.or_sentinel(), Coordinate::SENTINEL);
    }

    #[test]
    fn legacy_zero_pair_loads_as_found() {
        let legacy: Resolution = serde_json::from_str("[0, 0]").unwrap();
        assert_eq!(legacy, Resolution::Found(Coordinate::SENTINEL));
    }
}
