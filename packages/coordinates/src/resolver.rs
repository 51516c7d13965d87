//! District → coordinate resolution.

use covid_map_crosswalk::Crosswalk;
use covid_map_district_models::{
    CITY_STATE_NAME, Coordinate, DistrictKind, DistrictRecord, Resolution,
};
use covid_map_geocoder::{GeocodeError, Geocoder};
use thiserror::Error;

/// Errors from resolving a single district.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The district's NUTS-3 code is not in the crosswalk.
    #[error("NUTS-3 code '{code}' of district '{district}' is not in the crosswalk")]
    Lookup {
        /// The missing NUTS-3 code.
        code: String,
        /// Display name of the district.
        district: String,
    },

    /// The geocoder could not be reached or answered garbage.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Resolves district records to display names and locations.
pub struct CoordinateResolver<G> {
    crosswalk: Crosswalk,
    geocoder: G,
}

impl<G: Geocoder> CoordinateResolver<G> {
    /// Creates a resolver from a loaded crosswalk and a geocoder.
    #[must_use]
    pub const fn new(crosswalk: Crosswalk, geocoder: G) -> Self {
        Self {
            crosswalk,
            geocoder,
        }
    }

    /// The crosswalk used for standard districts.
    #[must_use]
    pub const fn crosswalk(&self) -> &Crosswalk {
        &self.crosswalk
    }

    /// The underlying geocoder.
    #[must_use]
    pub const fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// Builds the free-text geocoding query for a record.
    ///
    /// City-state subdivisions are queried by the city-state name; other
    /// districts by the postal code the crosswalk maps their NUTS-3 code
    /// to. The geocoder's country suffix is appended to both.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] if a standard district's NUTS-3
    /// code has no crosswalk entry.
    pub fn geocode_query(&self, record: &DistrictRecord) -> Result<String, ResolveError> {
        let basis = match record.kind() {
            DistrictKind::AggregatedCityState => CITY_STATE_NAME,
            DistrictKind::Standard => {
                self.crosswalk
                    .postal_code(&record.nuts)
                    .ok_or_else(|| ResolveError::Lookup {
                        code: record.nuts.clone(),
                        district: record.display_name(),
                    })?
            }
        };
        Ok(format!("{basis}{}", self.geocoder.query_suffix()))
    }

    /// Resolves a record to `(display name, resolution)`.
    ///
    /// A geocoder miss is not an error: it yields
    /// [`Resolution::NotFound`] and a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] for a NUTS-3 code missing from
    /// the crosswalk and [`ResolveError::Geocode`] if the geocoder fails.
    pub async fn resolve(
        &self,
        record: &DistrictRecord,
    ) -> Result<(String, Resolution), ResolveError> {
        let display_name = record.display_name();
        let query = self.geocode_query(record)?;

        let resolution = match self.geocoder.geocode(&query).await? {
            Some(location) => {
                log::debug!(
                    "'{display_name}' -> ({}, {}) via '{query}'",
                    location.latitude,
                    location.longitude
                );
                Resolution::Found(Coordinate::new(location.latitude, location.longitude))
            }
            None => {
                log::warn!("No coordinates for '{query}' ({display_name})");
                Resolution::NotFound
            }
        };

        Ok((display_name, resolution))
    }
}
