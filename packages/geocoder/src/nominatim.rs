//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on
//! the public instance, and requests must carry an identifying
//! `User-Agent`. [`NominatimGeocoder`] enforces the configured spacing and
//! retries transient failures with exponential backoff.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::service_registry::{GeocodingService, ProviderConfig};
use crate::{GeocodeError, GeocodedLocation, Geocoder};

/// How long to back off after the service answers HTTP 429.
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Geocodes a free-form query using Nominatim.
///
/// The caller is responsible for rate limiting (see `rate_limit_ms` in the
/// service TOML configuration).
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
    country_code: &str,
) -> Result<Option<GeocodedLocation>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("q", query),
            ("countrycodes", country_code),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }
    if status.is_server_error() {
        return Err(GeocodeError::Unavailable {
            message: format!("HTTP {status}"),
        });
    }

    let body: serde_json::Value = resp.error_for_status()?.json().await?;
    parse_response(&body)
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedLocation>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedLocation {
        latitude: lat,
        longitude: lon,
        matched_name: display_name,
    }))
}

/// Rate-limited, retrying Nominatim client.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_code: String,
    query_suffix: String,
    rate_limit: Duration,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Builds a client from a service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_service(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let ProviderConfig::Nominatim {
            base_url,
            user_agent,
            country_code,
            rate_limit_ms,
            timeout_secs,
            max_retries,
        } = &service.provider;

        let client = reqwest::Client::builder()
            .user_agent(user_agent.as_str())
            .timeout(Duration::from_secs(*timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.clone(),
            country_code: country_code.clone(),
            query_suffix: service.query_suffix.clone(),
            rate_limit: Duration::from_millis(*rate_limit_ms),
            max_retries: *max_retries,
            last_request: Mutex::new(None),
        })
    }

    /// Builds a client from the highest-priority enabled service in the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::NotConfigured`] if no service is enabled, or
    /// [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_registry() -> Result<Self, GeocodeError> {
        let service =
            crate::service_registry::primary_service().ok_or(GeocodeError::NotConfigured)?;
        log::debug!("Using geocoding service '{}' ({})", service.id, service.name);
        Self::from_service(&service)
    }

    /// Sleeps until at least `rate_limit` has passed since the previous
    /// request, then records the new request time.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        let mut attempt = 0;
        loop {
            self.throttle().await;

            let result =
                geocode_freeform(&self.client, &self.base_url, query, &self.country_code).await;

            let err = match result {
                Ok(location) => return Ok(location),
                Err(e) if !is_transient(&e) => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_retries {
                log::error!("Nominatim gave up on '{query}' after {attempt} retries: {err}");
                return Err(GeocodeError::Unavailable {
                    message: err.to_string(),
                });
            }
            attempt += 1;

            let delay = if matches!(err, GeocodeError::RateLimited) {
                RATE_LIMIT_COOLDOWN
            } else {
                Duration::from_secs(1u64 << attempt)
            };
            log::warn!(
                "Nominatim error for '{query}': {err} (retry {attempt}/{} in {delay:?})",
                self.max_retries
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn query_suffix(&self) -> &str {
        &self.query_suffix
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &GeocodeError) -> bool {
    match e {
        GeocodeError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        GeocodeError::RateLimited | GeocodeError::Unavailable { .. } => true,
        GeocodeError::Parse { .. } | GeocodeError::NotConfigured => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "48.1371",
            "lon": "11.5754",
            "display_name": "80331, Altstadt-Lehel, München, Bayern, Deutschland"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 48.1371).abs() < 1e-4);
        assert!((result.longitude - 11.5754).abs() < 1e-4);
        assert!(result.matched_name.unwrap().contains("München"));
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_body() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_missing_lon() {
        let body = serde_json::json!([{ "lat": "52.5" }]);
        assert!(parse_response(&body).is_err());
    }

    #[test]
    fn classifies_transient_errors() {
        assert!(is_transient(&GeocodeError::RateLimited));
        assert!(is_transient(&GeocodeError::Unavailable {
            message: "HTTP 503".to_string()
        }));
        assert!(!is_transient(&GeocodeError::Parse {
            message: "bad".to_string()
        }));
    }

    #[test]
    fn builds_from_registry() {
        let geocoder = NominatimGeocoder::from_registry().unwrap();
        assert_eq!(geocoder.query_suffix(), " Germany");
        assert_eq!(geocoder.country_code, "de");
    }

    fn unreachable_service(rate_limit_ms: u64, max_retries: u32) -> GeocodingService {
        toml::de::from_str(&format!(
            r#"
            id = "test"
            name = "Test"
            priority = 1

            [provider]
            type = "nominatim"
            base_url = "http://127.0.0.1:9/search"
            user_agent = "test"
            country_code = "de"
            rate_limit_ms = {rate_limit_ms}
            timeout_secs = 2
            max_retries = {max_retries}
            "#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn throttle_spaces_requests() {
        let geocoder = NominatimGeocoder::from_service(&unreachable_service(50, 0)).unwrap();

        let start = Instant::now();
        geocoder.throttle().await;
        geocoder.throttle().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable_without_retries() {
        let geocoder = NominatimGeocoder::from_service(&unreachable_service(0, 0)).unwrap();

        let start = Instant::now();
        let result = geocoder.geocode("80331 Germany").await;
        assert!(matches!(result, Err(GeocodeError::Unavailable { .. })), "{result:?}");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn retries_once_before_giving_up() {
        let geocoder = NominatimGeocoder::from_service(&unreachable_service(0, 1)).unwrap();

        let start = Instant::now();
        let result = geocoder.geocode("80331 Germany").await;
        let elapsed = start.elapsed();
        assert!(matches!(result, Err(GeocodeError::Unavailable { .. })), "{result:?}");
        // One 2s backoff means two attempts; a third would add another 4s.
        assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "{elapsed:?}");
    }
}
