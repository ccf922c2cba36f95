use anyhow::{bail, Result};
use geo::{MultiLineString, MultiPolygon};
use log::warn;
use serde_json::Value;

use crate::error::{AccessError, FeatureIssue, Stage};
use crate::io::raw::{RawGeometry, RawLayer};
use crate::layers::{District, Layer, Park, PopulationPoint, RoadFeature};

/// Which attribute columns carry the values the pipeline needs.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMap {
    /// Population count per point. Points are counted when unset.
    pub population: Option<String>,
    /// Demographic group columns on the population layer.
    pub groups: Vec<String>,
    pub district_id: String,
    pub district_name: Option<String>,
    pub road_class: Option<String>,
    pub walkable: Option<String>,
    /// Supplied park area, used instead of the polygon area.
    pub park_area: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            population: None,
            groups: Vec::new(),
            district_id: "id".into(),
            district_name: None,
            road_class: Some("highway".into()),
            walkable: None,
            park_area: None,
        }
    }
}

/// A number, or a string holding one.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Fail with `MissingAttribute` when no feature of the layer carries `field`.
fn require_field(raw: &RawLayer, layer: &str, field: &str) -> Result<()> {
    if !raw.features.is_empty() && !raw.has_field(field) {
        return Err(AccessError::MissingAttribute { layer: layer.to_string(), field: field.to_string() }.into());
    }
    Ok(())
}

pub fn roads(raw: RawLayer, name: &str, fields: &FieldMap) -> Result<Layer<RoadFeature>> {
    if let Some(field) = &fields.road_class {
        require_field(&raw, name, field)?;
    }

    let mut features = Vec::with_capacity(raw.features.len());
    for (i, feature) in raw.features.into_iter().enumerate() {
        let geometry = match feature.geometry {
            RawGeometry::Lines(lines) => lines,
            RawGeometry::Empty => MultiLineString::new(vec![]),
            other => bail!("[io::fields::roads] feature {i} of {name} is a {}, expected a line", other.kind()),
        };
        let class = fields.road_class.as_ref().and_then(|field| feature.attributes.get(field)).and_then(as_text);
        let walkable = fields.walkable.as_ref().and_then(|field| feature.attributes.get(field)).and_then(as_bool);
        features.push(RoadFeature { geometry, class, walkable, attributes: feature.attributes });
    }
    Ok(Layer::new(name, features).with_epsg(raw.epsg))
}

pub fn parks(raw: RawLayer, name: &str, fields: &FieldMap) -> Result<Layer<Park>> {
    if let Some(field) = &fields.park_area {
        require_field(&raw, name, field)?;
    }

    let mut features = Vec::with_capacity(raw.features.len());
    for (i, feature) in raw.features.into_iter().enumerate() {
        let geometry = polygons(feature.geometry, name, i)?;
        let area = fields.park_area.as_ref().and_then(|field| feature.attributes.get(field)).and_then(as_number);
        features.push(Park { geometry, area, attributes: feature.attributes });
    }
    Ok(Layer::new(name, features).with_epsg(raw.epsg))
}

/// Population points. Multi-point features are exploded and every part keeps
/// the feature's attributes. Features without geometry or without a numeric
/// population are skipped and listed in [`Layer::skipped`].
pub fn population(raw: RawLayer, name: &str, fields: &FieldMap) -> Result<Layer<PopulationPoint>> {
    if let Some(field) = &fields.population {
        require_field(&raw, name, field)?;
    }
    let groups: Vec<&String> = fields.groups.iter()
        .filter(|field| {
            let present = raw.features.is_empty() || raw.has_field(field);
            if !present { warn!("[io::fields::population] group field `{field}` not found in {name}, dropped") }
            present
        })
        .collect();

    let skip = |feature: usize, reason: String| FeatureIssue {
        stage: Stage::Setup,
        layer: name.to_string(),
        feature,
        reason,
    };
    let mut features = Vec::with_capacity(raw.features.len());
    let mut skipped = Vec::new();
    for (i, feature) in raw.features.into_iter().enumerate() {
        let locations = match feature.geometry {
            RawGeometry::Points(points) if !points.is_empty() => points,
            RawGeometry::Points(_) | RawGeometry::Empty => {
                skipped.push(skip(i, "empty geometry".to_string()));
                continue;
            }
            other => bail!("[io::fields::population] feature {i} of {name} is a {}, expected a point", other.kind()),
        };

        let population = match &fields.population {
            Some(field) => match feature.attributes.get(field).and_then(as_number) {
                Some(value) if value.is_finite() => value,
                _ => {
                    skipped.push(skip(i, format!("no numeric `{field}` value")));
                    continue;
                }
            },
            None => 1.0,
        };
        let values: Vec<(String, f64)> = groups.iter()
            .map(|&field| {
                let value = feature.attributes.get(field).and_then(as_number).filter(|v| v.is_finite());
                (field.clone(), value.unwrap_or(0.0))
            })
            .collect();

        for location in locations {
            features.push(PopulationPoint {
                location,
                population,
                groups: values.clone(),
                attributes: feature.attributes.clone(),
            });
        }
    }
    if !skipped.is_empty() {
        warn!("[io::fields::population] {} features of {name} skipped", skipped.len());
    }
    Ok(Layer::new(name, features).with_epsg(raw.epsg).with_skipped(skipped))
}

pub fn districts(raw: RawLayer, name: &str, fields: &FieldMap) -> Result<Layer<District>> {
    require_field(&raw, name, &fields.district_id)?;

    let mut features = Vec::with_capacity(raw.features.len());
    for (i, feature) in raw.features.into_iter().enumerate() {
        let Some(id) = feature.attributes.get(&fields.district_id).and_then(as_text) else {
            bail!("[io::fields::districts] feature {i} of {name} has no `{}` value", fields.district_id);
        };
        let geometry = polygons(feature.geometry, name, i)?;
        let label = fields.district_name.as_ref().and_then(|field| feature.attributes.get(field)).and_then(as_text);
        features.push(District { id, name: label, geometry, attributes: feature.attributes });
    }
    Ok(Layer::new(name, features).with_epsg(raw.epsg))
}

/// Study-area polygons.
pub fn study_area(raw: RawLayer, name: &str) -> Result<Layer<MultiPolygon<f64>>> {
    let features = raw.features.into_iter().enumerate()
        .map(|(i, feature)| polygons(feature.geometry, name, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(Layer::new(name, features).with_epsg(raw.epsg))
}

fn polygons(geometry: RawGeometry, layer: &str, i: usize) -> Result<MultiPolygon<f64>> {
    match geometry {
        RawGeometry::Polygons(mp) => Ok(mp),
        RawGeometry::Empty => Ok(MultiPolygon::new(vec![])),
        other => bail!("[io::fields] feature {i} of {layer} is a {}, expected a polygon", other.kind()),
    }
}
