use std::path::Path;

use anyhow::{bail, Result};
use geo::{Coord, MultiLineString, MultiPolygon};
use regex::Regex;

use crate::layers::Attributes;

/// Geometry of a feature as read from disk, before it is typed.
#[derive(Clone, Debug, PartialEq)]
pub enum RawGeometry {
    Empty,
    Points(Vec<Coord<f64>>),
    Lines(MultiLineString<f64>),
    Polygons(MultiPolygon<f64>),
}

impl RawGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            RawGeometry::Empty => "empty",
            RawGeometry::Points(_) => "point",
            RawGeometry::Lines(_) => "line",
            RawGeometry::Polygons(_) => "polygon",
        }
    }
}

/// One feature with its untyped attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFeature {
    pub geometry: RawGeometry,
    pub attributes: Attributes,
}

/// Features of one file plus the EPSG code it declares.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawLayer {
    pub features: Vec<RawFeature>,
    pub epsg: Option<u32>,
}

impl RawLayer {
    /// True if at least one feature carries `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.features.iter().any(|feature| feature.attributes.contains_key(field))
    }
}

/// Read a GeoJSON (`.geojson`, `.json`) or shapefile (`.shp`) layer.
pub fn read_layer(path: &Path) -> Result<RawLayer> {
    let extension = path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("geojson") | Some("json") => super::geojson::read_geojson(path),
        Some("shp") => super::shp::read_shapefile(path),
        _ => bail!("[io::read_layer] Unsupported layer format: {}", path.display()),
    }
}

/// EPSG code named in a CRS string such as `EPSG:5514`, `urn:ogc:def:crs:EPSG::5514`
/// or a WKT `AUTHORITY["EPSG","5514"]` / `ID["EPSG",5514]`. For WKT the last
/// (outermost) authority wins.
pub(crate) fn parse_epsg(text: &str) -> Option<u32> {
    let wkt = Regex::new(r#"(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).ok()?;
    if let Some(caps) = wkt.captures_iter(text).last() {
        return caps[1].parse().ok();
    }
    let urn = Regex::new(r"EPSG:+(\d+)").ok()?;
    urn.captures(text).and_then(|caps| caps[1].parse().ok())
}
