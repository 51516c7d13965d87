//! Persistent coordinate cache.
//!
//! The cache is a pretty-printed JSON object mapping display names to
//! `[lat, lon]` pairs, or `null` for names the geocoder could not find:
//!
//! ```json
//! {
//!   "Flensburg Kreisfreie Stadt": [54.7833, 9.4333],
//!   "Berlin": [52.517, 13.3889],
//!   "Nirgendwo Landkreis": null
//! }
//! ```
//!
//! Entries keep the order districts were first seen in the statistics
//! snapshot so rebuilt documents diff cleanly. The document is written in
//! one shot (temporary file + rename); a build that fails or is
//! interrupted leaves the previous document, or none, in place.
//!
//! Concurrent processes building the same cache file are not supported.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use covid_map_district_models::{DistrictRecord, Resolution};
use covid_map_geocoder::Geocoder;
use covid_map_source::progress::ProgressCallback;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::{CoordinateResolver, ResolveError};

/// Errors from reading or writing the coordinate cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cache document exists yet; build it first.
    #[error("Coordinate cache not found at {path}")]
    Missing {
        /// Expected location.
        path: PathBuf,
    },

    /// The cache document is not valid JSON of the expected shape.
    #[error("Coordinate cache at {path} is corrupt: {source}")]
    Corrupt {
        /// Location of the bad document.
        path: PathBuf,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// Reading or writing the document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the document failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A district could not be resolved; nothing was written.
    #[error("Failed to resolve district: {0}")]
    Resolve(#[from] ResolveError),
}

/// Display name → resolution, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordinateMap {
    entries: IndexMap<String, Resolution>,
}

impl CoordinateMap {
    /// Returns the cached resolution for a display name.
    #[must_use]
    pub fn get(&self, display_name: &str) -> Option<Resolution> {
        self.entries.get(display_name).copied()
    }

    /// Whether a display name has an entry (found or not).
    #[must_use]
    pub fn contains(&self, display_name: &str) -> bool {
        self.entries.contains_key(display_name)
    }

    /// Adds or replaces an entry. New names go to the end.
    pub fn insert(&mut self, display_name: String, resolution: Resolution) {
        self.entries.insert(display_name, resolution);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with a coordinate.
    #[must_use]
    pub fn found_count(&self) -> usize {
        self.entries.values().filter(|r| r.is_found()).count()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Resolution)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, Resolution)> for CoordinateMap {
    fn from_iter<I: IntoIterator<Item = (String, Resolution)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Handle to the coordinate cache document on disk.
#[derive(Debug, Clone)]
pub struct CoordinateCache {
    path: PathBuf,
}

impl CoordinateCache {
    /// Creates a handle for a cache document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a handle for the default location (see [`crate::paths`]).
    #[must_use]
    pub fn at_default_path() -> Self {
        Self::new(crate::paths::coordinates_path())
    }

    /// Location of the cache document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the cache document exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the cache document.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Missing`] if the document does not exist and
    /// [`CacheError::Corrupt`] if it cannot be parsed.
    pub fn load(&self) -> Result<CoordinateMap, CacheError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let map: CoordinateMap =
            serde_json::from_str(&text).map_err(|source| CacheError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        log::debug!(
            "Loaded {} cached coordinates ({} found) from {}",
            map.len(),
            map.found_count(),
            self.path.display()
        );
        Ok(map)
    }

    /// Resolves every distinct display name in `records` and writes the
    /// result as a new document.
    ///
    /// Issues one geocoding request per distinct name, so this is slow.
    /// Progress is reported per name.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Resolve`] if any district fails to resolve,
    /// in which case nothing is written, or [`CacheError::Io`] if the
    /// document cannot be written.
    pub async fn build<G: Geocoder>(
        &self,
        records: &[DistrictRecord],
        resolver: &CoordinateResolver<G>,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<CoordinateMap, CacheError> {
        log::info!("Building coordinate cache at {}", self.path.display());
        let (map, _) = resolve_missing(CoordinateMap::default(), records, resolver, progress).await?;
        self.write(&map)?;
        Ok(map)
    }

    /// Discards the current document and builds a new one.
    ///
    /// This is the only way cached coordinates are invalidated.
    ///
    /// # Errors
    ///
    /// See [`Self::build`]. On error the previous document is untouched.
    pub async fn rebuild<G: Geocoder>(
        &self,
        records: &[DistrictRecord],
        resolver: &CoordinateResolver<G>,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<CoordinateMap, CacheError> {
        if self.exists() {
            log::info!("Discarding existing coordinate cache at {}", self.path.display());
        }
        self.build(records, resolver, progress).await
    }

    /// Resolves only the display names missing from the existing
    /// document and appends them. Existing entries are kept as they are.
    ///
    /// Builds from scratch if no document exists.
    ///
    /// # Errors
    ///
    /// See [`Self::build`]; also [`CacheError::Corrupt`] if the existing
    /// document cannot be parsed.
    pub async fn update<G: Geocoder>(
        &self,
        records: &[DistrictRecord],
        resolver: &CoordinateResolver<G>,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<CoordinateMap, CacheError> {
        if !self.exists() {
            return self.build(records, resolver, progress).await;
        }
        let existing = self.load()?;
        let (map, added) = resolve_missing(existing, records, resolver, progress).await?;
        if added > 0 {
            log::info!("Adding {added} new districts to {}", self.path.display());
            self.write(&map)?;
        } else {
            log::info!("Coordinate cache is up to date");
        }
        Ok(map)
    }

    /// Loads the document, building it first if it does not exist.
    ///
    /// # Errors
    ///
    /// See [`Self::build`] and [`Self::load`].
    pub async fn ensure<G: Geocoder>(
        &self,
        records: &[DistrictRecord],
        resolver: &CoordinateResolver<G>,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<CoordinateMap, CacheError> {
        if self.exists() {
            self.load()
        } else {
            log::info!("No coordinate cache at {}", self.path.display());
            self.build(records, resolver, progress).await
        }
    }

    /// Writes the whole map via a sibling temporary file and a rename.
    fn write(&self, map: &CoordinateMap) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            crate::paths::ensure_dir(parent)?;
        }

        let json = serde_json::to_string_pretty(map)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, json)?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        log::info!(
            "Wrote {} coordinates ({} found) to {}",
            map.len(),
            map.found_count(),
            self.path.display()
        );
        Ok(())
    }
}

/// Resolves each display name in `records` that `map` lacks, once per
/// name, in first-seen order. Returns the extended map and the number of
/// names added.
async fn resolve_missing<G: Geocoder>(
    mut map: CoordinateMap,
    records: &[DistrictRecord],
    resolver: &CoordinateResolver<G>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(CoordinateMap, usize), CacheError> {
    let mut pending: IndexMap<String, &DistrictRecord> = IndexMap::new();
    for record in records {
        let name = record.display_name();
        if !map.contains(&name) {
            pending.entry(name).or_insert(record);
        }
    }

    progress.set_total(pending.len() as u64);
    progress.set_message("Geocoding districts".to_string());

    let added = pending.len();
    for (name, record) in pending {
        progress.set_message(name);
        let (display_name, resolution) = resolver.resolve(record).await?;
        map.insert(display_name, resolution);
        progress.inc(1);
    }

    progress.finish(format!("Geocoded {added} districts"));
    Ok((map, added))
}
