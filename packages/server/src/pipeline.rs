//! Fetch, coordinate and merge steps shared by the server and the CLI.

use std::sync::Arc;

use covid_map_coordinates::paths;
use covid_map_coordinates::{CacheError, CoordinateCache, CoordinateMap, CoordinateResolver};
use covid_map_crosswalk::{Crosswalk, CrosswalkError};
use covid_map_district_models::{DistrictRecord, MergedEntity};
use covid_map_geocoder::GeocodeError;
use covid_map_geocoder::nominatim::NominatimGeocoder;
use covid_map_source::SourceError;
use covid_map_source::progress::ProgressCallback;
use covid_map_source::rki::{StatisticsFetcher, StatisticsSnapshot};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Errors from preparing or producing merged district data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching statistics failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Loading the crosswalk table failed.
    #[error(transparent)]
    Crosswalk(#[from] CrosswalkError),

    /// Setting up the geocoder failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// Reading or building the coordinate cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// How to treat an existing coordinate cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum CacheMode {
    /// Use the existing document; build one only if it is missing.
    #[default]
    Ensure,
    /// Geocode only districts missing from the existing document.
    Update,
    /// Discard the existing document and geocode everything.
    Rebuild,
}

/// A statistics snapshot and its merge with the coordinate cache.
#[derive(Debug, Clone)]
pub struct MergedSnapshot {
    /// The raw snapshot.
    pub snapshot: StatisticsSnapshot,
    /// Merged entities in snapshot order.
    pub entities: Vec<MergedEntity>,
}

/// Creates a resolver from the crosswalk on disk and the configured
/// geocoding service.
///
/// # Errors
///
/// Returns [`PipelineError::Crosswalk`] if the crosswalk cannot be read
/// and [`PipelineError::Geocode`] if no geocoder is configured.
pub fn default_resolver() -> Result<CoordinateResolver<NominatimGeocoder>, PipelineError> {
    let crosswalk_path = paths::crosswalk_path();
    log::info!("Loading crosswalk from {}", crosswalk_path.display());
    let crosswalk = Crosswalk::load(&crosswalk_path)?;
    let geocoder = NominatimGeocoder::from_registry()?;
    Ok(CoordinateResolver::new(crosswalk, geocoder))
}

/// Produces a coordinate map for `records` according to `mode`.
///
/// With [`CacheMode::Ensure`] and an existing document, neither the
/// crosswalk nor the geocoder is touched.
///
/// # Errors
///
/// See [`default_resolver`] and the [`CoordinateCache`] operations.
pub async fn prepare_coordinates(
    cache: &CoordinateCache,
    records: &[DistrictRecord],
    mode: CacheMode,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CoordinateMap, PipelineError> {
    if mode == CacheMode::Ensure && cache.exists() {
        return Ok(cache.load()?);
    }

    let resolver = default_resolver()?;
    let map = match mode {
        CacheMode::Ensure => cache.ensure(records, &resolver, progress).await?,
        CacheMode::Update => cache.update(records, &resolver, progress).await?,
        CacheMode::Rebuild => cache.rebuild(records, &resolver, progress).await?,
    };
    Ok(map)
}

/// Loads the coordinate cache, fetching a snapshot and building the
/// cache first if no document exists.
///
/// # Errors
///
/// See [`prepare_coordinates`]; also [`PipelineError::Source`] if the
/// snapshot needed for a first build cannot be fetched.
pub async fn load_or_build_coordinates(
    fetcher: &StatisticsFetcher,
    cache: &CoordinateCache,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CoordinateMap, PipelineError> {
    if cache.exists() {
        return Ok(cache.load()?);
    }
    let snapshot = fetcher.fetch().await?;
    prepare_coordinates(cache, &snapshot.records, CacheMode::Ensure, progress).await
}

/// Fetches a fresh snapshot and merges it with `coordinates`.
///
/// # Errors
///
/// Returns [`SourceError`] if the statistics cannot be fetched.
pub async fn fetch_merged(
    fetcher: &StatisticsFetcher,
    coordinates: &CoordinateMap,
) -> Result<MergedSnapshot, SourceError> {
    let snapshot = fetcher.fetch().await?;
    let entities = covid_map_merge::merge(&snapshot.records, coordinates);
    log::debug!(
        "Merged {} records into {} entities",
        snapshot.records.len(),
        entities.len()
    );
    Ok(MergedSnapshot { snapshot, entities })
}
