#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the data directory.
//!
//! By default all files live in the project root's `data/` directory.
//! `COVID_MAP_DATA_DIR` moves the whole directory, and
//! `COVID_MAP_COORDINATES_PATH` / `COVID_MAP_CROSSWALK_PATH` override
//! individual files.

use std::path::{Path, PathBuf};

/// File name of the coordinate cache document.
pub const COORDINATES_FILENAME: &str = "german_county_coordinates.json";

/// File name of the Eurostat NUTS-3 / postal code correspondence table.
pub const CROSSWALK_FILENAME: &str = "pc2020_DE_NUTS-2021_v3.0.csv";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`, falling back to
/// the current directory.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    env_path("COVID_MAP_DATA_DIR").unwrap_or_else(|| project_root().join("data"))
}

/// Returns the coordinate cache path.
#[must_use]
pub fn coordinates_path() -> PathBuf {
    data_file("COVID_MAP_COORDINATES_PATH", COORDINATES_FILENAME)
}

/// Returns the crosswalk table path.
#[must_use]
pub fn crosswalk_path() -> PathBuf {
    data_file("COVID_MAP_CROSSWALK_PATH", CROSSWALK_FILENAME)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// `filename` in the data directory unless `override_var` names a path.
fn data_file(override_var: &str, filename: &str) -> PathBuf {
    env_path(override_var).unwrap_or_else(|| data_dir().join(filename))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_root_contains_packages() {
        assert!(project_root().join("packages").is_dir());
    }

    #[test]
    fn canonical_file_names() {
        assert_eq!(COORDINATES_FILENAME, "german_county_coordinates.json");
        assert_eq!(CROSSWALK_FILENAME, "pc2020_DE_NUTS-2021_v3.0.csv");
    }

    #[test]
    fn data_file_defaults_into_data_dir() {
        let path = data_file("COVID_MAP_UNSET_TEST_PATH", COORDINATES_FILENAME);
        assert_eq!(path, data_dir().join("german_county_coordinates.json"));

        let path = data_file("COVID_MAP_UNSET_TEST_PATH", CROSSWALK_FILENAME);
        assert_eq!(path, data_dir().join("pc2020_DE_NUTS-2021_v3.0.csv"));
    }

    #[test]
    fn unset_override_is_ignored() {
        assert_eq!(env_path("COVID_MAP_UNSET_TEST_PATH"), None);
    }
}
