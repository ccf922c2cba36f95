use std::fmt;

use geo::{Area, BooleanOps, BoundingRect, Coord, Intersects, LineString, MultiPolygon, Polygon, Rect};
use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::common::EPSILON;
use crate::config::{hex_edge_from_hectares, AccessConfig};

/// Stable cell identifier: column and row in the grid anchored at the
/// study-area bounding box minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HexId {
    pub col: i32,
    pub row: i32,
}

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}r{}", self.col, self.row)
    }
}

/// One hexagonal cell of the tessellation.
#[derive(Clone, Debug, PartialEq)]
pub struct HexCell {
    pub id: HexId,
    /// Centre of the unclipped hexagon.
    pub centroid: Coord<f64>,
    /// The unclipped hexagon.
    pub hexagon: Polygon<f64>,
    /// The hexagon clipped to the study area.
    pub geometry: MultiPolygon<f64>,
}

impl HexCell {
    #[inline] pub fn area(&self) -> f64 { self.geometry.unsigned_area() }

    /// True if the study area cut off part of the hexagon.
    pub fn is_partial(&self) -> bool {
        self.hexagon.unsigned_area() - self.area() > EPSILON * self.hexagon.unsigned_area().max(1.0)
    }
}

/// Flat-top hexagonal tessellation of a study area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexGridGenerator {
    edge_length: f64,
}

impl Default for HexGridGenerator {
    fn default() -> Self { Self::from_config(&AccessConfig::default()) }
}

impl HexGridGenerator {
    pub fn new(edge_length: f64) -> Self { Self { edge_length } }

    pub fn from_config(config: &AccessConfig) -> Self { Self::new(config.hex_edge_length) }

    /// Generator whose cells cover `hectares` each.
    pub fn from_area_hectares(hectares: f64) -> Self { Self::new(hex_edge_from_hectares(hectares)) }

    #[inline] pub fn edge_length(&self) -> f64 { self.edge_length }

    /// Area of one full cell.
    #[inline] pub fn cell_area(&self) -> f64 { 1.5 * 3f64.sqrt() * self.edge_length * self.edge_length }

    /// Centre of cell `(col, row)` in the grid anchored at `origin`.
    pub fn center(&self, origin: Coord<f64>, id: HexId) -> Coord<f64> {
        let h = self.edge_length;
        let odd = if id.col.rem_euclid(2) == 1 { 3f64.sqrt() / 2.0 * h } else { 0.0 };
        Coord {
            x: origin.x + 1.5 * h * id.col as f64,
            y: origin.y + 3f64.sqrt() * h * id.row as f64 + odd,
        }
    }

    /// Flat-top hexagon around `center`, counter-clockwise from the east vertex.
    pub fn hexagon(&self, center: Coord<f64>) -> Polygon<f64> {
        let mut ring: Vec<Coord<f64>> = (0..6)
            .map(|k| {
                let angle = std::f64::consts::FRAC_PI_3 * k as f64;
                Coord { x: center.x + self.edge_length * angle.cos(), y: center.y + self.edge_length * angle.sin() }
            })
            .collect();
        ring.push(ring[0]);
        Polygon::new(LineString::new(ring), vec![])
    }

    /// Every unclipped cell intersecting `extent`, ordered by column then row.
    pub fn tessellate(&self, extent: Rect<f64>) -> Vec<(HexId, Coord<f64>, Polygon<f64>)> {
        let h = self.edge_length;
        let origin = extent.min();
        let cols = (extent.width() / (1.5 * h)).ceil() as i32 + 1;
        let rows = (extent.height() / (3f64.sqrt() * h)).ceil() as i32 + 1;

        let mut cells = Vec::new();
        for col in -1..=cols {
            for row in -1..=rows {
                let id = HexId { col, row };
                let center = self.center(origin, id);
                let hexagon = self.hexagon(center);
                if hexagon.intersects(&extent) {
                    cells.push((id, center, hexagon));
                }
            }
        }
        cells
    }

    /// Tessellate the bounding box of `study_area` and clip each cell to it.
    /// Cells left with no area are dropped.
    pub fn generate(&self, study_area: &MultiPolygon<f64>) -> Vec<HexCell> {
        let Some(extent) = study_area.bounding_rect() else { return Vec::new() };
        let tessellation = self.tessellate(extent);
        let min_area = EPSILON * self.cell_area();

        let cells: Vec<HexCell> = tessellation.into_par_iter()
            .filter_map(|(id, centroid, hexagon)| {
                let geometry = MultiPolygon::new(vec![hexagon.clone()]).intersection(study_area);
                (geometry.unsigned_area() > min_area).then_some(HexCell { id, centroid, hexagon, geometry })
            })
            .collect();

        info!("[hexgrid] {} cells with edge length {:.2}", cells.len(), self.edge_length);
        cells
    }
}
