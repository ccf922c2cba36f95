use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::io::raw::{parse_epsg, RawFeature, RawGeometry, RawLayer};

/// Read a GeoJSON FeatureCollection from `path`.
pub(crate) fn read_geojson(path: &Path) -> Result<RawLayer> {
    let file = File::open(path)
        .with_context(|| format!("[io::geojson::read] Failed to open {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[io::geojson::read] Failed to parse {}", path.display()))?;
    parse_feature_collection(&value)
        .with_context(|| format!("[io::geojson::read] Invalid GeoJSON in {}", path.display()))
}

/// Parse a GeoJSON FeatureCollection value.
pub(crate) fn parse_feature_collection(value: &Value) -> Result<RawLayer> {
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("expected a FeatureCollection with a `features` array"))?;
    let epsg = value["crs"]["properties"]["name"].as_str().and_then(parse_epsg);

    let features = features.iter().enumerate()
        .map(|(i, feature)| {
            let geometry = parse_geometry(&feature["geometry"])
                .with_context(|| format!("feature {i} has an invalid geometry"))?;
            let attributes = feature["properties"].as_object().cloned().unwrap_or_default();
            Ok(RawFeature { geometry, attributes })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RawLayer { features, epsg })
}

/// Parse a `[x, y, ...]` position.
fn parse_position(value: &Value) -> Result<Coord<f64>> {
    let pair = value.as_array().filter(|pair| pair.len() >= 2)
        .ok_or_else(|| anyhow!("Invalid position: expected [x, y]"))?;
    let x = pair[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
    let y = pair[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
    Ok(Coord { x, y })
}

fn parse_positions(value: &Value) -> Result<Vec<Coord<f64>>> {
    value.as_array()
        .ok_or_else(|| anyhow!("Invalid coordinates: expected an array of positions"))?
        .iter()
        .map(parse_position)
        .collect()
}

/// Parse a ring, closing it if needed.
fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let mut points = parse_positions(value)?;
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

/// Parse `[exterior, hole, hole, ...]`.
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value.as_array().ok_or_else(|| anyhow!("Invalid Polygon: expected an array of rings"))?;
    let (exterior, interiors) = rings.split_first()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))?;
    Ok(Polygon::new(parse_ring(exterior)?, interiors.iter().map(parse_ring).collect::<Result<_>>()?))
}

fn parse_geometry(geometry: &Value) -> Result<RawGeometry> {
    fn many(value: &Value) -> Result<&Vec<Value>> {
        value.as_array().ok_or_else(|| anyhow!("Invalid coordinates: expected an array"))
    }

    if geometry.is_null() { return Ok(RawGeometry::Empty) }
    let coords = &geometry["coordinates"];

    Ok(match geometry["type"].as_str() {
        Some("Point") => RawGeometry::Points(vec![parse_position(coords)?]),
        Some("MultiPoint") => RawGeometry::Points(parse_positions(coords)?),
        Some("LineString") => RawGeometry::Lines(MultiLineString::new(vec![LineString(parse_positions(coords)?)])),
        Some("MultiLineString") => RawGeometry::Lines(MultiLineString::new(
            many(coords)?.iter().map(|line| parse_positions(line).map(LineString)).collect::<Result<_>>()?
        )),
        Some("Polygon") => RawGeometry::Polygons(MultiPolygon::new(vec![parse_polygon(coords)?])),
        Some("MultiPolygon") => RawGeometry::Polygons(MultiPolygon::new(
            many(coords)?.iter().map(parse_polygon).collect::<Result<_>>()?
        )),
        Some(other) => bail!("Unsupported geometry type: {other}"),
        None => bail!("Geometry without a type"),
    })
}

fn ring_json(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

/// GeoJSON geometry of a MultiPolygon.
pub(crate) fn multipolygon_json(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = mp.0.iter()
        .map(|polygon| {
            let mut rings = vec![ring_json(polygon.exterior())];
            rings.extend(polygon.interiors().iter().map(ring_json));
            Value::Array(rings)
        })
        .collect();
    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// GeoJSON geometry of a LineString.
pub(crate) fn linestring_json(line: &LineString<f64>) -> Value {
    json!({ "type": "LineString", "coordinates": ring_json(line) })
}

/// GeoJSON geometry of a Point.
pub(crate) fn point_json(c: Coord<f64>) -> Value {
    json!({ "type": "Point", "coordinates": [c.x, c.y] })
}

/// A Feature from a geometry and its properties.
pub(crate) fn feature(geometry: Value, properties: Map<String, Value>) -> Value {
    json!({ "type": "Feature", "geometry": geometry, "properties": properties })
}

/// A FeatureCollection, with a named `crs` member when the EPSG code is known.
pub(crate) fn feature_collection(features: Vec<Value>, epsg: Option<u32>) -> Value {
    let mut collection = json!({ "type": "FeatureCollection", "features": features });
    if let Some(epsg) = epsg {
        collection["crs"] = json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{epsg}") }
        });
    }
    collection
}

/// Write a GeoJSON value to `path`.
pub(crate) fn write_geojson(value: &Value, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::geojson::write] Failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("[io::geojson::write] Failed to write GeoJSON to {}", path.display()))
}
