use std::path::Path;

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde_json::{Number, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Reader, Shape};

use crate::io::raw::{parse_epsg, RawFeature, RawGeometry, RawLayer};
use crate::layers::Attributes;

/// Read every shape and record of a `.shp` file. The EPSG code comes from
/// the sibling `.prj` file when there is one.
pub(crate) fn read_shapefile(path: &Path) -> Result<RawLayer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp::read] Failed to open shapefile: {}", path.display()))?;

    let mut features = Vec::with_capacity(reader.shape_count()?);
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp::read] Error reading shape {i} of {}", path.display()))?;
        features.push(RawFeature { geometry: shape_to_geometry(shape), attributes: record_to_attributes(record) });
    }

    let epsg = std::fs::read_to_string(path.with_extension("prj")).ok()
        .and_then(|wkt| parse_epsg(&wkt));
    Ok(RawLayer { features, epsg })
}

/// Shapefile points of every dimension carry planar `x` and `y`.
macro_rules! coords {
    ($points:expr) => {
        $points.iter().map(|p| Coord { x: p.x, y: p.y }).collect::<Vec<Coord<f64>>>()
    };
}

macro_rules! polygons {
    ($polygon:expr) => {{
        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for ring in $polygon.rings() {
            let mut points = coords!(ring.points());
            if !points.is_empty() && points[0] != points[points.len() - 1] {
                points.push(points[0]);
            }
            match (ring, polygons.last_mut()) {
                (PolygonRing::Inner(_), Some(outer)) => outer.interiors_push(LineString(points)),
                _ => polygons.push(Polygon::new(LineString(points), vec![])),
            }
        }
        MultiPolygon::new(polygons)
    }};
}

fn shape_to_geometry(shape: Shape) -> RawGeometry {
    match shape {
        Shape::NullShape => RawGeometry::Empty,
        Shape::Point(p) => RawGeometry::Points(vec![Coord { x: p.x, y: p.y }]),
        Shape::PointM(p) => RawGeometry::Points(vec![Coord { x: p.x, y: p.y }]),
        Shape::PointZ(p) => RawGeometry::Points(vec![Coord { x: p.x, y: p.y }]),
        Shape::Multipoint(mp) => RawGeometry::Points(coords!(mp.points())),
        Shape::MultipointM(mp) => RawGeometry::Points(coords!(mp.points())),
        Shape::MultipointZ(mp) => RawGeometry::Points(coords!(mp.points())),
        Shape::Polyline(line) => RawGeometry::Lines(MultiLineString::new(
            line.parts().iter().map(|part| LineString(coords!(part))).collect()
        )),
        Shape::PolylineM(line) => RawGeometry::Lines(MultiLineString::new(
            line.parts().iter().map(|part| LineString(coords!(part))).collect()
        )),
        Shape::PolylineZ(line) => RawGeometry::Lines(MultiLineString::new(
            line.parts().iter().map(|part| LineString(coords!(part))).collect()
        )),
        Shape::Polygon(polygon) => RawGeometry::Polygons(polygons!(polygon)),
        Shape::PolygonM(polygon) => RawGeometry::Polygons(polygons!(polygon)),
        Shape::PolygonZ(polygon) => RawGeometry::Polygons(polygons!(polygon)),
        Shape::Multipatch(_) => RawGeometry::Empty,
    }
}

fn number(n: f64) -> Value {
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// dBase fields as JSON values. Dates and empty fields become null.
fn record_to_attributes(record: Record) -> Attributes {
    record.into_iter()
        .map(|(field, value)| {
            let value = match value {
                FieldValue::Character(Some(s)) => Value::String(s.trim().to_string()),
                FieldValue::Numeric(Some(n)) => number(n),
                FieldValue::Float(Some(n)) => number(n as f64),
                FieldValue::Integer(n) => Value::from(n),
                FieldValue::Double(n) => number(n),
                FieldValue::Currency(n) => number(n),
                FieldValue::Logical(Some(b)) => Value::Bool(b),
                FieldValue::Memo(s) => Value::String(s),
                _ => Value::Null,
            };
            (field, value)
        })
        .collect()
}
