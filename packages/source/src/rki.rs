//! RKI `Landkreisdaten` fetcher.
//!
//! The service is an `ArcGIS` `FeatureServer` layer with one feature per
//! district. Features wrap their fields in `{ "attributes": {...} }`;
//! geometry is not requested since coordinates come from the geocoding
//! cache.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use covid_map_district_models::DistrictRecord;
use serde::Deserialize as _;

use crate::{SourceError, StatisticsSourceConfig, retry};

/// Query parameters selecting every field of every district.
const QUERY_PARAMS: &[(&str, &str)] = &[
    ("where", "1=1"),
    ("outFields", "*"),
    ("outSR", "4326"),
    ("f", "json"),
];

/// Format of the `last_update` attribute (e.g. `"16.10.2026, 00:00 Uhr"`).
const LAST_UPDATE_FORMAT: &str = "%d.%m.%Y, %H:%M Uhr";

/// The full set of district records from one fetch.
#[derive(Debug, Clone)]
pub struct StatisticsSnapshot {
    /// One record per district, in service order.
    pub records: Vec<DistrictRecord>,
    /// When this snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
    /// When the RKI last updated the data, if published.
    pub last_update: Option<NaiveDateTime>,
}

/// Pulls statistics snapshots from the configured endpoint.
#[derive(Debug, Clone)]
pub struct StatisticsFetcher {
    client: reqwest::Client,
    config: StatisticsSourceConfig,
}

impl StatisticsFetcher {
    /// Creates a fetcher for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: StatisticsSourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a fetcher for the embedded RKI configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn rki() -> Result<Self, SourceError> {
        Self::new(crate::rki_source())
    }

    /// The endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &StatisticsSourceConfig {
        &self.config
    }

    /// Fetches the current snapshot of all districts.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UpstreamUnavailable`] if the service cannot
    /// be reached after retries or answers with an error payload, and
    /// [`SourceError::Normalization`] if a feature cannot be decoded.
    pub async fn fetch(&self) -> Result<StatisticsSnapshot, SourceError> {
        log::info!("{}: fetching district statistics", self.config.name);

        let body =
            retry::send_json(|| self.client.get(&self.config.query_url).query(QUERY_PARAMS))
                .await?;
        let records = parse_features(&body)?;
        let last_update = records
            .iter()
            .find_map(|r| r.last_update.as_deref())
            .and_then(parse_last_update);

        log::info!(
            "{}: fetched {} districts (last update: {})",
            self.config.name,
            records.len(),
            last_update.map_or_else(|| "unknown".to_string(), |t| t.to_string()),
        );

        Ok(StatisticsSnapshot {
            records,
            fetched_at: Utc::now(),
            last_update,
        })
    }
}

/// Decodes the `features` array of an `ArcGIS` query response.
///
/// # Errors
///
/// Returns [`SourceError::UpstreamUnavailable`] for an `ArcGIS` error
/// payload and [`SourceError::Normalization`] for a missing `features`
/// array or an undecodable feature.
pub fn parse_features(body: &serde_json::Value) -> Result<Vec<DistrictRecord>, SourceError> {
    // ArcGIS reports failures with HTTP 200 and an `error` object.
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(serde_json::Value::as_i64);
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        return Err(SourceError::UpstreamUnavailable {
            message: format!("ArcGIS error {}: {message}", code.unwrap_or_default()),
        });
    }

    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::Normalization {
            message: "response has no features array".to_string(),
        })?;

    if is_truncated(body) {
        log::warn!(
            "ArcGIS truncated the response at {} features; some districts are missing",
            features.len()
        );
    }

    features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let attrs = feature
                .get("attributes")
                .ok_or_else(|| SourceError::Normalization {
                    message: format!("feature {i} has no attributes"),
                })?;
            DistrictRecord::deserialize(attrs).map_err(|e| SourceError::Normalization {
                message: format!("feature {i}: {e}"),
            })
        })
        .collect()
}

/// Whether `ArcGIS` cut the result short at its transfer limit
/// (`exceededTransferLimit`).
#[must_use]
pub fn is_truncated(body: &serde_json::Value) -> bool {
    body.get("exceededTransferLimit")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Parses the RKI `last_update` stamp.
#[must_use]
pub fn parse_last_update(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), LAST_UPDATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(nuts: &str, name: &str, bez: &str, own: f64, state: f64) -> serde_json::Value {
        serde_json::json!({
            "attributes": {
                "NUTS": nuts,
                "GEN": name,
                "BEZ": bez,
                "BL": "Berlin",
                "cases7_per_100k": own,
                "cases7_bl_per_100k": state,
                "last_update": "16.10.2026, 00:00 Uhr"
            }
        })
    }

    #[test]
    fn parses_features_in_order() {
        let body = serde_json::json!({
            "features": [
                feature("DE300", "Berlin Mitte", "Bezirk", 201.3, 180.0),
                feature("DE300", "Berlin Pankow", "Bezirk", 150.2, 180.0),
            ]
        });
        let records = parse_features(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Berlin Mitte");
        assert_eq!(records[1].name, "Berlin Pankow");
        assert!((records[1].cases7_bl_per_100k - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn surfaces_arcgis_error_payload() {
        let body = serde_json::json!({
            "error": { "code": 400, "message": "Invalid query parameters", "details": [] }
        });
        let err = parse_features(&body).unwrap_err();
        match err {
            SourceError::UpstreamUnavailable { message } => {
                assert!(message.contains("400"));
                assert!(message.contains("Invalid query"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_features_is_normalization_error() {
        let body = serde_json::json!({ "objectIdFieldName": "OBJECTID" });
        assert!(matches!(
            parse_features(&body),
            Err(SourceError::Normalization { .. })
        ));
    }

    #[test]
    fn bad_feature_names_its_index() {
        let body = serde_json::json!({
            "features": [
                feature("DE212", "München", "Kreisfreie Stadt", 1.0, 2.0),
                { "attributes": { "GEN": "Broken" } }
            ]
        });
        match parse_features(&body).unwrap_err() {
            SourceError::Normalization { message } => assert!(message.starts_with("feature 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_response_still_parses() {
        let body = serde_json::json!({
            "exceededTransferLimit": true,
            "features": [feature("DE300", "Berlin", "Kreisfreie Stadt", 80.0, 80.0)]
        });
        assert!(is_truncated(&body));
        let records = parse_features(&body).unwrap();
        assert_eq!(records.len(), 1);

        let complete = serde_json::json!({ "features": [] });
        assert!(!is_truncated(&complete));
        let explicit = serde_json::json!({ "exceededTransferLimit": false, "features": [] });
        assert!(!is_truncated(&explicit));
    }

    #[test]
    fn parses_last_update_stamp() {
        let ts = parse_last_update("16.10.2026, 00:00 Uhr").unwrap();
        assert_eq!(ts.to_string(), "2026-10-16 00:00:00");
        assert!(parse_last_update("yesterday").is_none());
    }
}
