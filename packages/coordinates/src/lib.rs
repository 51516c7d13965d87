#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District coordinate resolution and caching.
//!
//! The [`resolver`] turns a district record into a display name and a
//! location: standard districts go through the NUTS-3 → postal code
//! crosswalk and are geocoded by postal code, while city-state
//! subdivisions are geocoded once under the city-state name.
//!
//! Geocoding is slow and rate-limited, so results are persisted by the
//! [`cache`] as a JSON document keyed by display name. The document is
//! built once per deployment and only rebuilt on request.

pub mod cache;
pub mod paths;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use cache::{CacheError, CoordinateCache, CoordinateMap};
pub use resolver::{CoordinateResolver, ResolveError};
