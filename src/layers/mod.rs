use geo::{Area, Coord, LineString, MultiLineString, MultiPolygon};

use crate::common::union_all;
use crate::error::FeatureIssue;

/// Opaque pass-through attributes of an input feature.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A named collection of features, with the EPSG code the source declared (if any).
#[derive(Clone, Debug, PartialEq)]
pub struct Layer<T> {
    pub name: String,
    pub features: Vec<T>,
    pub epsg: Option<u32>,
    /// Source features dropped while reading the layer.
    pub skipped: Vec<FeatureIssue>,
}

impl<T> Layer<T> {
    pub fn new(name: impl Into<String>, features: Vec<T>) -> Self {
        Self { name: name.into(), features, epsg: None, skipped: Vec::new() }
    }

    /// Attach the declared EPSG code.
    pub fn with_epsg(mut self, epsg: Option<u32>) -> Self {
        self.epsg = epsg;
        self
    }

    /// Attach the features dropped while reading.
    pub fn with_skipped(mut self, skipped: Vec<FeatureIssue>) -> Self {
        self.skipped = skipped;
        self
    }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn iter(&self) -> std::slice::Iter<'_, T> { self.features.iter() }
}

impl Layer<MultiPolygon<f64>> {
    /// Union of all polygons of the layer.
    pub fn dissolve(&self) -> MultiPolygon<f64> { union_all(self.features.clone()) }
}

/// A road line with its class and optional walkability flag.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadFeature {
    pub geometry: MultiLineString<f64>,
    pub class: Option<String>,
    /// `Some(false)` marks a line that must never be walked.
    pub walkable: Option<bool>,
    pub attributes: Attributes,
}

impl RoadFeature {
    pub fn new(geometry: MultiLineString<f64>) -> Self {
        Self { geometry, class: None, walkable: None, attributes: Attributes::new() }
    }

    /// Single-part road from a list of `(x, y)` vertices.
    pub fn from_line(coords: &[(f64, f64)]) -> Self {
        let line: LineString<f64> = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
        Self::new(MultiLineString::new(vec![line]))
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_walkable(mut self, walkable: bool) -> Self {
        self.walkable = Some(walkable);
        self
    }
}

/// A park polygon with an optional supplied area.
#[derive(Clone, Debug, PartialEq)]
pub struct Park {
    pub geometry: MultiPolygon<f64>,
    pub area: Option<f64>,
    pub attributes: Attributes,
}

impl Park {
    pub fn new(geometry: MultiPolygon<f64>) -> Self {
        Self { geometry, area: None, attributes: Attributes::new() }
    }

    /// The supplied area attribute, or the planar area of the polygon.
    pub fn area(&self) -> f64 {
        self.area.filter(|area| area.is_finite()).unwrap_or_else(|| self.geometry.unsigned_area())
    }
}

/// A population point. `population` is 1.0 when points are simply counted.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationPoint {
    pub location: Coord<f64>,
    pub population: f64,
    /// Named demographic group values, in configured field order.
    pub groups: Vec<(String, f64)>,
    pub attributes: Attributes,
}

impl PopulationPoint {
    pub fn new(x: f64, y: f64, population: f64) -> Self {
        Self { location: Coord { x, y }, population, groups: Vec::new(), attributes: Attributes::new() }
    }

    pub fn with_group(mut self, name: impl Into<String>, value: f64) -> Self {
        self.groups.push((name.into(), value));
        self
    }
}

/// An administrative district.
#[derive(Clone, Debug, PartialEq)]
pub struct District {
    pub id: String,
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
    pub attributes: Attributes,
}

impl District {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self { id: id.into(), name: None, geometry, attributes: Attributes::new() }
    }

    /// Display label: the name when known, the identifier otherwise.
    #[inline] pub fn label(&self) -> &str { self.name.as_deref().unwrap_or(&self.id) }
}
