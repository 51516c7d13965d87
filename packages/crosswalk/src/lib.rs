#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! NUTS-3 to postal code crosswalk.
//!
//! Loads the Eurostat `pc2020_DE_NUTS-2021_v3.0.csv` correspondence table,
//! a semicolon-separated file whose `NUTS3` and `CODE` values are wrapped in
//! single quotes:
//!
//! ```text
//! NUTS3;CODE
//! 'DE212';'80331'
//! 'DE212';'80333'
//! ```
//!
//! Each NUTS-3 region maps to many postal codes. Only the first one seen
//! is kept; it serves as a representative geocoding key for the region.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Header of the NUTS-3 code column.
pub const NUTS3_FIELD: &str = "NUTS3";

/// Header of the postal code column.
pub const CODE_FIELD: &str = "CODE";

/// Errors from loading the crosswalk table.
#[derive(Debug, Error)]
pub enum CrosswalkError {
    /// The file could not be opened.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The CSV reader failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The table is missing a required column or a row is malformed.
    #[error("Malformed crosswalk table: {message}")]
    DataFormat {
        /// Description of what is wrong.
        message: String,
    },
}

/// Lookup table from NUTS-3 code to a representative postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Crosswalk {
    entries: BTreeMap<String, String>,
}

impl Crosswalk {
    /// Loads the crosswalk from a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`CrosswalkError`] if the file cannot be read or is not a
    /// well-formed crosswalk table.
    pub fn load(path: &Path) -> Result<Self, CrosswalkError> {
        let file = std::fs::File::open(path).map_err(|source| CrosswalkError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let crosswalk = Self::from_reader(file)?;
        log::info!(
            "Loaded {} NUTS-3 regions from {}",
            crosswalk.len(),
            path.display()
        );
        Ok(crosswalk)
    }

    /// Parses a crosswalk table from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`CrosswalkError::DataFormat`] if the `NUTS3` or `CODE`
    /// column is missing or a row is too short, and
    /// [`CrosswalkError::Csv`] for lower-level CSV failures.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CrosswalkError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(clean_value).collect();
        let nuts_idx = column_index(&headers, NUTS3_FIELD)?;
        let code_idx = column_index(&headers, CODE_FIELD)?;

        let mut entries = BTreeMap::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let (Some(nuts), Some(code)) = (record.get(nuts_idx), record.get(code_idx)) else {
                // +2: one for the header row, one for 1-based line numbers
                return Err(CrosswalkError::DataFormat {
                    message: format!("line {} has {} fields", row + 2, record.len()),
                });
            };
            let (nuts, code) = (clean_value(nuts), clean_value(code));
            if nuts.is_empty() || code.is_empty() {
                log::debug!("Skipping line {} with an empty NUTS3 or CODE value", row + 2);
                continue;
            }
            entries.entry(nuts).or_insert(code);
        }

        Ok(Self { entries })
    }

    /// Returns the postal code recorded for a NUTS-3 code.
    #[must_use]
    pub fn postal_code(&self, nuts: &str) -> Option<&str> {
        self.entries.get(nuts).map(String::as_str)
    }

    /// Number of distinct NUTS-3 codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Crosswalk {
    /// Builds a crosswalk from pairs, keeping the first code per key.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut entries = BTreeMap::new();
        for (nuts, code) in iter {
            entries.entry(nuts).or_insert(code);
        }
        Self { entries }
    }
}

fn column_index(headers: &[String], name: &str) -> Result<usize, CrosswalkError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| CrosswalkError::DataFormat {
            message: format!("missing required column '{name}' (found {headers:?})"),
        })
}

/// Trims whitespace and the single quotes the source file wraps values in.
fn clean_value(value: &str) -> String {
    value.trim().trim_matches('\'').trim().to_string()
}
