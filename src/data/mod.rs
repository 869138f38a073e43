//! Catalog and base map loading from GeoJSON.

use crate::geo::LatLng;
use crate::overlay::{
    CatalogError, Category, Citation, Geometry, MarkerKind, OverlayGroup, OverlayRegistry, Period,
};
use geojson::{Feature, GeoJson, JsonObject, Value};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Catalog compiled into the binary
pub const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.geojson");

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("catalog must be a FeatureCollection")]
    NotFeatureCollection,
}

/// Per-feature properties of a catalog entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureProps {
    id: String,
    name: String,
    color: String,
    reference: String,
    #[serde(default)]
    reference_url: Option<String>,
    #[serde(default)]
    period_key: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default = "full_opacity")]
    opacity: f64,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    marker: Option<MarkerKind>,
    #[serde(default)]
    order: Option<u32>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    label_at: Option<Vec<f64>>,
}

fn full_opacity() -> f64 {
    1.0
}

/// Load the built-in catalog
pub fn load_builtin() -> Result<OverlayRegistry, DataError> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Load a replacement catalog from disk
pub fn load_catalog_file(path: &Path) -> Result<OverlayRegistry, DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = parse_catalog(&content)?;
    info!("loaded catalog {} ({} overlays)", path.display(), registry.len());
    Ok(registry)
}

/// Parse a catalog FeatureCollection. Broken features are reported through
/// [`OverlayRegistry::rejected`] instead of failing the whole load.
pub fn parse_catalog(content: &str) -> Result<OverlayRegistry, DataError> {
    let geojson: GeoJson = content.parse()?;
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(DataError::NotFeatureCollection);
    };

    let periods: Vec<Period> = foreign_list(fc.foreign_members.as_ref(), "periods");
    let categories: Vec<Category> = foreign_list(fc.foreign_members.as_ref(), "categories");

    let mut groups = Vec::with_capacity(fc.features.len());
    let mut rejected = Vec::new();
    for (index, feature) in fc.features.iter().enumerate() {
        match feature_to_group(feature) {
            Ok(group) => groups.push(group),
            Err(reason) => {
                let err = CatalogError::Malformed { index, reason };
                warn!("skipping overlay: {err}");
                rejected.push(err);
            }
        }
    }

    Ok(OverlayRegistry::with_rejected(periods, categories, groups, rejected))
}

/// Deserialize a top-level list, treating absence or a bad shape as empty
fn foreign_list<T: for<'de> Deserialize<'de>>(members: Option<&JsonObject>, key: &str) -> Vec<T> {
    let Some(value) = members.and_then(|m| m.get(key)) else {
        return Vec::new();
    };
    match serde_json::from_value(value.clone()) {
        Ok(list) => list,
        Err(e) => {
            warn!("ignoring catalog {key}: {e}");
            Vec::new()
        }
    }
}

fn feature_to_group(feature: &Feature) -> Result<OverlayGroup, String> {
    let props = feature
        .properties
        .clone()
        .ok_or_else(|| "missing properties".to_string())?;
    let props: FeatureProps =
        serde_json::from_value(serde_json::Value::Object(props)).map_err(|e| e.to_string())?;
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| format!("{}: missing geometry", props.id))?;
    let geometry = convert_geometry(&geometry.value).map_err(|e| format!("{}: {e}", props.id))?;

    let label_at = match props.label_at.as_deref() {
        None => None,
        Some(pos) => Some(position(pos).map_err(|e| format!("{}: labelAt {e}", props.id))?),
    };

    Ok(OverlayGroup {
        id: props.id,
        period_key: props.period_key,
        category: props.category,
        display_name: props.name,
        base_opacity: props.opacity,
        color: props.color,
        geometry,
        reference: Citation::new(props.reference, props.reference_url),
        period: props.period,
        description: props.description,
        note: props.note,
        marker: props.marker,
        order: props.order,
        label: props.label,
        label_at,
    })
}

/// GeoJSON positions are [lng, lat]
fn position(pos: &[f64]) -> Result<LatLng, String> {
    match pos {
        [lng, lat, ..] => Ok(LatLng::new(*lat, *lng)),
        _ => Err(format!("position needs 2 values, got {}", pos.len())),
    }
}

fn positions(coords: &[Vec<f64>]) -> Result<Vec<LatLng>, String> {
    coords.iter().map(|c| position(c)).collect()
}

fn convert_geometry(value: &Value) -> Result<Geometry, String> {
    match value {
        Value::Point(pos) => Ok(Geometry::Point(position(pos)?)),
        Value::LineString(coords) => Ok(Geometry::Polyline(positions(coords)?)),
        Value::Polygon(rings) => {
            let exterior = rings.first().ok_or_else(|| "polygon has no rings".to_string())?;
            let mut ring = positions(exterior)?;
            // Closing vertex repeats the first
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            Ok(Geometry::Polygon(ring))
        }
        _ => Err("only Point, LineString and Polygon are supported".to_string()),
    }
}

/// A geographic line (sequence of lat/lng coordinates)
pub type LineString = Vec<LatLng>;

/// Coastline outlines drawn under every overlay
#[derive(Debug, Clone, Default)]
pub struct BaseMap {
    pub coastlines: Vec<LineString>,
}

impl BaseMap {
    /// Natural Earth coastlines from `dir` when present, else the built-in outline
    pub fn load(dir: Option<&Path>) -> Self {
        if let Some(dir) = dir {
            for filename in ["ne_10m_coastline.json", "ne_50m_coastline.json", "ne_110m_coastline.json"] {
                let path = dir.join(filename);
                if !path.exists() {
                    continue;
                }
                match load_coastlines(&path) {
                    Ok(lines) => {
                        info!("loaded {} coastlines from {}", lines.len(), path.display());
                        return Self { coastlines: lines };
                    }
                    Err(e) => warn!("failed to load {}: {e}", path.display()),
                }
            }
        }
        Self::builtin()
    }

    /// Simplified Eastern Mediterranean, Red Sea and Persian Gulf shores
    pub fn builtin() -> Self {
        let shores: [&[(f64, f64)]; 5] = [
            // Levant and Egyptian coast (lat, lng)
            &[
                (36.9, 28.0), (36.6, 30.6), (36.2, 32.5), (36.7, 34.6), (36.8, 36.0),
                (35.5, 35.8), (34.4, 35.8), (33.3, 35.2), (32.8, 35.0), (32.0, 34.75),
                (31.3, 34.2), (31.1, 33.3), (31.5, 32.0), (31.3, 30.0), (31.0, 28.5),
                (32.2, 24.0), (32.6, 23.0), (32.8, 21.5),
            ],
            // Anatolian and Aegean coast
            &[
                (36.9, 28.0), (37.8, 27.2), (38.7, 26.8), (39.7, 26.1), (40.4, 26.7),
                (41.0, 28.9), (41.2, 29.1),
            ],
            // Red Sea and Gulf of Suez
            &[
                (29.9, 32.6), (28.2, 33.4), (27.8, 34.2), (29.5, 34.9), (28.0, 34.6),
                (26.0, 36.5), (22.0, 39.1), (18.0, 41.0), (15.0, 42.7), (12.6, 43.4),
            ],
            &[
                (29.9, 32.6), (27.2, 33.8), (24.0, 35.6), (20.0, 37.3), (15.6, 39.5),
                (12.6, 43.2),
            ],
            // Persian Gulf
            &[
                (29.9, 48.6), (29.0, 48.1), (27.0, 49.7), (25.5, 50.6), (24.2, 51.6),
                (24.3, 54.3), (25.6, 56.3), (27.2, 56.4), (27.0, 54.0), (28.9, 50.8),
                (30.1, 49.5), (29.9, 48.6),
            ],
        ];

        Self {
            coastlines: shores
                .iter()
                .map(|line| line.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect())
                .collect(),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.coastlines.is_empty()
    }
}

/// Load coastline GeoJSON data
fn load_coastlines(path: &Path) -> anyhow::Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(&geometry.value, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(&geometry.value, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(&geometry.value, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(value: &Value, add_line: &mut F)
where
    F: FnMut(LineString),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString {
        coords.iter().filter_map(|c| position(c).ok()).collect()
    };
    match value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|c| add_line(to_line(c))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(&g.value, add_line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads_clean() {
        let reg = load_builtin().unwrap();
        assert!(reg.rejected().is_empty(), "{:?}", reg.rejected());
        assert_eq!(reg.periods().len(), 4);
        assert_eq!(reg.base_overlays().count(), 2);
        assert!(reg.get("abraham-promised").is_some());
        assert_eq!(reg.by_period("united-kingdom").count(), 2);
    }

    #[test]
    fn test_polygon_ring_closure_dropped() {
        let reg = load_builtin().unwrap();
        let g = reg.get("joshua-conquest").unwrap();
        let pts = g.geometry.points();
        assert_eq!(pts.len(), 7);
        assert_eq!(pts[0], LatLng::new(33.25, 35.65));
    }

    #[test]
    fn test_feature_without_id_rejected() {
        let text = r##"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[35.2,31.7]},
             "properties":{"name":"No id","color":"#fff","reference":"x"}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[35.2,31.7]},
             "properties":{"id":"ok","name":"Ok","color":"#fff","reference":"x"}}
        ]}"##;
        let reg = parse_catalog(text).unwrap();
        assert_eq!(reg.len(), 1);
        assert!(matches!(reg.rejected()[0], CatalogError::Malformed { index: 0, .. }));
    }

    #[test]
    fn test_two_point_ring_rejected() {
        let text = r##"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[35.0,31.0],[35.5,31.5],[35.0,31.0]]]},
             "properties":{"id":"sliver","name":"Sliver","color":"#fff","reference":"x","periodKey":"p"}}
        ]}"##;
        let reg = parse_catalog(text).unwrap();
        assert!(reg.is_empty());
        assert!(matches!(reg.rejected()[0], CatalogError::TooFewPoints { got: 2, .. }));
    }

    #[test]
    fn test_not_a_collection() {
        let text = r#"{"type":"Point","coordinates":[35.2,31.7]}"#;
        assert!(matches!(parse_catalog(text), Err(DataError::NotFeatureCollection)));
    }

    #[test]
    fn test_base_map_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let base = BaseMap::load(Some(dir.path()));
        assert!(base.has_data());
        assert_eq!(base.coastlines.len(), BaseMap::builtin().coastlines.len());
    }
}
