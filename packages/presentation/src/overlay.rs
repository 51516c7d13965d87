//! Map overlay: circle markers and heat points.

use covid_map_district_models::{Coordinate, MergedEntity};
use serde::{Deserialize, Serialize};

use crate::round2;

/// Initial map centre, roughly the geographic centre of Germany.
pub const START_POSITION: Coordinate = Coordinate::new(50.993_763, 10.162_379);

/// Map viewport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    /// Initial centre.
    pub center: Coordinate,
    /// Initial zoom level.
    pub zoom: u8,
    /// Minimum zoom level.
    pub min_zoom: u8,
    /// Maximum zoom level.
    pub max_zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: START_POSITION,
            zoom: 6,
            min_zoom: 6,
            max_zoom: 9,
        }
    }
}

/// A circle marker with a hover tooltip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMarker {
    /// Marker position.
    pub center: Coordinate,
    /// Stroke colour.
    pub color: String,
    /// `"<district> <incidence>"`.
    pub tooltip: String,
}

/// A weighted heat-map point, serialized as `[lat, lon, weight]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 3]", from = "[f64; 3]")]
pub struct HeatPoint {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// 7-day incidence per 100k.
    pub weight: f64,
}

impl From<HeatPoint> for [f64; 3] {
    fn from(p: HeatPoint) -> Self {
        [p.latitude, p.longitude, p.weight]
    }
}

impl From<[f64; 3]> for HeatPoint {
    fn from([latitude, longitude, weight]: [f64; 3]) -> Self {
        Self {
            latitude,
            longitude,
            weight,
        }
    }
}

/// Heat layer rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatLayerOptions {
    /// Point radius in pixels.
    pub radius: u32,
    /// Zoom level at which points reach full intensity.
    pub max_zoom: u8,
    /// Minimum point opacity.
    pub min_opacity: f64,
}

impl Default for HeatLayerOptions {
    fn default() -> Self {
        Self {
            radius: 50,
            max_zoom: 10,
            min_opacity: 0.1,
        }
    }
}

/// Everything a map renderer needs to draw the districts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOverlay {
    /// Viewport.
    pub view: MapView,
    /// One marker per located district.
    pub circles: Vec<CircleMarker>,
    /// One heat point per located district.
    pub heat_points: Vec<HeatPoint>,
    /// Heat layer options.
    pub heat_options: HeatLayerOptions,
    /// Districts left off the map because they have no coordinate.
    pub unlocated: Vec<String>,
}

/// Tooltip text for a district marker.
#[must_use]
pub fn tooltip(display_name: &str, weight: f64) -> String {
    format!("{display_name} {}", round2(weight))
}

/// Builds the map overlay from merged entities, in entity order.
///
/// Entities whose resolution is `NotFound` are listed in
/// [`MapOverlay::unlocated`] instead of being drawn at `(0, 0)`.
#[must_use]
pub fn build_overlay(entities: &[MergedEntity]) -> MapOverlay {
    let mut circles = Vec::with_capacity(entities.len());
    let mut heat_points = Vec::with_capacity(entities.len());
    let mut unlocated = Vec::new();

    for entity in entities {
        let Some(center) = entity.resolution.coordinate() else {
            log::debug!("'{}' has no coordinate; not drawn", entity.display_name);
            unlocated.push(entity.display_name.clone());
            continue;
        };

        circles.push(CircleMarker {
            center,
            color: "white".to_string(),
            tooltip: tooltip(&entity.display_name, entity.weight),
        });
        heat_points.push(HeatPoint {
            latitude: center.latitude,
            longitude: center.longitude,
            weight: entity.weight,
        });
    }

    MapOverlay {
        view: MapView::default(),
        circles,
        heat_points,
        heat_options: HeatLayerOptions::default(),
        unlocated,
    }
}
