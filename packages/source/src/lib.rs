#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! RKI district statistics fetcher.
//!
//! Pulls the current snapshot of per-district 7-day incidence figures
//! from the RKI `Landkreisdaten` `ArcGIS` feature service. Every call is an
//! idempotent full pull; there is no pagination or incremental state.

pub mod progress;
pub mod retry;
pub mod rki;

use serde::Deserialize;

/// Errors that can occur while fetching statistics.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service could not be reached, kept failing, or answered with
    /// an error payload.
    #[error("Statistics service unavailable: {message}")]
    UpstreamUnavailable {
        /// Description of the last failure.
        message: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}

/// Statistics endpoint configuration, loaded from `sources/*.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsSourceConfig {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name used in log messages.
    pub name: String,
    /// `FeatureServer` layer query URL, without query parameters.
    pub query_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    60
}

const RKI_TOML: &str = include_str!("../sources/rki.toml");

/// Returns the embedded RKI source configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the config is embedded).
#[must_use]
pub fn rki_source() -> StatisticsSourceConfig {
    toml::de::from_str(RKI_TOML).unwrap_or_else(|e| panic!("Failed to parse rki.toml: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_rki_source() {
        let source = rki_source();
        assert_eq!(source.id, "rki_landkreise");
        assert!(source.query_url.ends_with("/FeatureServer/0/query"));
        assert!(!source.query_url.contains('?'));
        assert!(source.timeout_secs > 0);
    }
}
