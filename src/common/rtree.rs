use geo::{BoundingRect, Coord, Intersects, MultiPolygon, Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a MultiPolygon by index.
#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in the indexed slice
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(crate) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding MultiPolygon.
    #[inline] pub(crate) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// R-tree over the bounding boxes of a slice of MultiPolygons.
/// Empty polygons are not indexed.
#[derive(Debug, Clone)]
pub(crate) struct PolygonIndex {
    rtree: RTree<BoundingBox>,
}

impl PolygonIndex {
    pub(crate) fn new(polygons: &[MultiPolygon<f64>]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| polygon.bounding_rect().map(|bbox| BoundingBox::new(i, bbox)))
                    .collect()
            ),
        }
    }

    /// Indices whose bounding box intersects `rect`, in ascending order.
    pub(crate) fn query_rect(&self, rect: Rect<f64>) -> Vec<usize> {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope).map(|bb| bb.idx()).collect();
        hits.sort_unstable();
        hits
    }

    /// Lowest index whose polygon contains `point`, boundary included.
    pub(crate) fn locate(&self, polygons: &[MultiPolygon<f64>], point: Coord<f64>) -> Option<usize> {
        let env = AABB::from_point([point.x, point.y]);
        let pt = Point::from(point);
        self.rtree.locate_in_envelope_intersecting(&env)
            .map(|bb| bb.idx())
            .filter(|&i| polygons[i].intersects(&pt))
            .min()
    }
}

/// `rect` grown by `margin` on every side.
pub(crate) fn expand_rect(rect: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord { x: rect.min().x - margin, y: rect.min().y - margin },
        Coord { x: rect.max().x + margin, y: rect.max().y + margin },
    )
}
