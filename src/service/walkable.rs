use geo::{Area, BooleanOps, BoundingRect, Coord, Intersects, MultiPolygon, Point, Rect};

/// The dissolved region within walking distance of an entrance.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkableArea {
    polygon: MultiPolygon<f64>,
    distance: f64,
    bounds: Option<Rect<f64>>,
}

impl WalkableArea {
    pub fn new(polygon: MultiPolygon<f64>, distance: f64) -> Self {
        let bounds = polygon.bounding_rect();
        Self { polygon, distance, bounds }
    }

    /// An area with no extent, computed for `distance`.
    pub fn empty(distance: f64) -> Self { Self::new(MultiPolygon::new(vec![]), distance) }

    #[inline] pub fn polygon(&self) -> &MultiPolygon<f64> { &self.polygon }

    /// The walking-distance threshold the area was computed for.
    #[inline] pub fn distance(&self) -> f64 { self.distance }

    #[inline] pub fn is_empty(&self) -> bool { self.polygon.0.is_empty() }

    #[inline] pub fn area(&self) -> f64 { self.polygon.unsigned_area() }

    /// True if `point` lies inside or on the boundary.
    pub fn covers(&self, point: Coord<f64>) -> bool {
        let Some(bounds) = self.bounds else { return false };
        bounds.intersects(&point) && self.polygon.intersects(&Point::from(point))
    }

    /// Area of `unit` that lies within the walkable area.
    pub fn clipped_area(&self, unit: &MultiPolygon<f64>) -> f64 {
        let (Some(bounds), Some(unit_bounds)) = (self.bounds, unit.bounding_rect()) else { return 0.0 };
        if !bounds.intersects(&unit_bounds) { return 0.0 }
        unit.intersection(&self.polygon).unsigned_area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{coord, polygon};

    fn square(x: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: 0.0), (x: x + side, y: 0.0), (x: x + side, y: side), (x: x, y: side), (x: x, y: 0.0)
        ]])
    }

    #[test]
    fn boundary_points_are_covered() {
        let area = WalkableArea::new(square(0.0, 10.0), 400.0);
        assert!(area.covers(coord! { x: 5.0, y: 5.0 }));
        assert!(area.covers(coord! { x: 10.0, y: 5.0 }));
        assert!(area.covers(coord! { x: 0.0, y: 0.0 }));
        assert!(!area.covers(coord! { x: 10.000001, y: 5.0 }));
    }

    #[test]
    fn clipped_area_of_partial_overlap() {
        let area = WalkableArea::new(square(0.0, 10.0), 400.0);
        assert_relative_eq!(area.clipped_area(&square(5.0, 10.0)), 50.0, epsilon = 1e-9);
        assert_eq!(area.clipped_area(&square(50.0, 10.0)), 0.0);
    }

    #[test]
    fn empty_area_covers_nothing() {
        let area = WalkableArea::empty(400.0);
        assert!(area.is_empty());
        assert_eq!(area.area(), 0.0);
        assert!(!area.covers(coord! { x: 0.0, y: 0.0 }));
        assert_eq!(area.clipped_area(&square(0.0, 1.0)), 0.0);
        assert_eq!(area.distance(), 400.0);
    }
}
