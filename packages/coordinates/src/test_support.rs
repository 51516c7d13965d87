//! In-memory geocoder and record builders for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use covid_map_district_models::DistrictRecord;
use covid_map_geocoder::{GeocodeError, GeocodedLocation, Geocoder};

/// Answers queries from a fixed table and records every query it sees.
#[derive(Default)]
pub struct FakeGeocoder {
    answers: BTreeMap<String, (f64, f64)>,
    fail: bool,
    seen: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn with(mut self, query: &str, lat: f64, lon: f64) -> Self {
        self.answers.insert(query.to_string(), (lat, lon));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        self.seen.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(GeocodeError::Unavailable {
                message: "HTTP 503".to_string(),
            });
        }
        Ok(self
            .answers
            .get(query)
            .map(|&(latitude, longitude)| GeocodedLocation {
                latitude,
                longitude,
                matched_name: None,
            }))
    }

    fn query_suffix(&self) -> &str {
        " Germany"
    }
}

pub fn record(nuts: &str, name: &str, suffix: &str, own: f64, state: f64) -> DistrictRecord {
    DistrictRecord {
        nuts: nuts.to_string(),
        name: name.to_string(),
        kind_suffix: suffix.to_string(),
        state: "Testland".to_string(),
        cases7_per_100k: own,
        cases7_bl_per_100k: state,
        population: None,
        cases: None,
        deaths: None,
        last_update: None,
    }
}
