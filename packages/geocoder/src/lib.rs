#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding client for district coordinates.
//!
//! Turns free-text location queries (a postal code or city name plus a
//! country suffix) into latitude/longitude pairs using the public
//! Nominatim / `OpenStreetMap` service. The provider is configured via a
//! TOML file in `services/` and loaded through the [`service_registry`].
//!
//! Callers depend on the [`Geocoder`] trait rather than the concrete
//! client, so the coordinate resolver can be driven by an in-memory
//! geocoder in tests.

pub mod nominatim;
pub mod service_registry;

use async_trait::async_trait;
use thiserror::Error;

/// A geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched place name returned by the geocoder.
    pub matched_name: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The service kept failing after all retries.
    #[error("Geocoding service unavailable: {message}")]
    Unavailable {
        /// Description of the last failure.
        message: String,
    },

    /// No enabled geocoding service is configured.
    #[error("No geocoding service configured")]
    NotConfigured,
}

/// A free-text geocoder.
///
/// `Ok(None)` means the service answered but found nothing; that is not
/// an error.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes a free-text query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service cannot be reached or its
    /// response cannot be parsed.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>, GeocodeError>;

    /// Text appended to every query to scope it to the target country.
    fn query_suffix(&self) -> &str {
        ""
    }
}
