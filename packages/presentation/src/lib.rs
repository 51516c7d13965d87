#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Presentation adapters for merged districts.
//!
//! [`overlay`] turns merged entities into a renderer-agnostic map overlay
//! (circle markers plus weighted heat points) and [`table`] into sortable
//! table rows. Both are plain serializable data; the server hands them to
//! the browser as JSON.

pub mod overlay;
pub mod table;

/// Rounds to two decimal places for display.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
