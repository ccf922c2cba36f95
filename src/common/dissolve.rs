use geo::{BooleanOps, MultiPolygon};
use rayon::prelude::*;

/// Union of all shapes, merged pairwise in a balanced tree. The merge order
/// depends only on the input order, so the result is reproducible.
pub(crate) fn union_all(mut shapes: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    shapes.retain(|shape| !shape.0.is_empty());
    while shapes.len() > 1 {
        shapes = shapes.par_chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                _ => pair[0].clone(),
            })
            .collect();
    }
    shapes.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{polygon, Area};

    fn square(x: f64, y: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y), (x: x + side, y: y), (x: x + side, y: y + side), (x: x, y: y + side), (x: x, y: y)
        ]])
    }

    #[test]
    fn overlapping_squares_dissolve() {
        let merged = union_all(vec![square(0.0, 0.0, 10.0), square(5.0, 0.0, 10.0), square(30.0, 0.0, 10.0)]);
        assert_relative_eq!(merged.unsigned_area(), 250.0, epsilon = 1e-6);
        assert_eq!(merged.0.len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_shape() {
        assert!(union_all(vec![]).0.is_empty());
        assert!(union_all(vec![MultiPolygon::new(vec![])]).0.is_empty());
    }

    #[test]
    fn merge_is_reproducible() {
        let shapes: Vec<_> = (0..9).map(|i| square(i as f64 * 7.0, (i % 3) as f64, 10.0)).collect();
        assert_eq!(union_all(shapes.clone()), union_all(shapes));
    }
}
