use geo::Coord;
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;

use crate::common::{distance, project_on_segment, EPSILON};
use crate::graph::{Edge, EdgeId, Graph};

type Segment = GeomWithData<Line<[f64; 2]>, (EdgeId, usize)>;

/// The closest point on the network to a query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeHit {
    pub edge: EdgeId,
    /// Projection of the query point onto the edge.
    pub point: Coord<f64>,
    /// Distance from the start of the edge to `point`, along the edge.
    pub along: f64,
    /// Distance from the query point to `point`.
    pub distance: f64,
}

/// R-tree of edge segments for nearest-edge queries.
pub struct SegmentIndex {
    rtree: RTree<Segment>,
}

impl SegmentIndex {
    /// Index every segment of every edge accepted by `filter`.
    pub fn new(graph: &Graph, filter: impl Fn(&Edge) -> bool) -> Self {
        let segments = graph.edges().iter()
            .filter(|edge| filter(edge))
            .flat_map(|edge| {
                edge.geometry.0.windows(2).enumerate().map(move |(i, w)| {
                    GeomWithData::new(Line::new([w[0].x, w[0].y], [w[1].x, w[1].y]), (edge.id, i))
                })
            })
            .collect();
        Self { rtree: RTree::bulk_load(segments) }
    }

    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.rtree.size() == 0 }

    /// Nearest edge to `p`. Segments equidistant within 1e-9 resolve to the
    /// lowest edge id, then to the earliest position along that edge.
    pub fn nearest(&self, graph: &Graph, p: Coord<f64>) -> Option<EdgeHit> {
        let mut best: Option<(f64, (EdgeId, usize))> = None;
        for (segment, d2) in self.rtree.nearest_neighbor_iter_with_distance_2(&[p.x, p.y]) {
            let d = d2.sqrt();
            match best {
                None => best = Some((d, segment.data)),
                Some((best_d, _)) if d > best_d + EPSILON => break,
                Some((best_d, key)) if segment.data < key => best = Some((best_d, segment.data)),
                Some(_) => {}
            }
        }

        let (_, (edge_id, seg)) = best?;
        let edge = graph.edge(edge_id)?;
        let coords = &edge.geometry.0;
        let (point, t, d) = project_on_segment(p, coords[seg], coords[seg + 1]);
        let before: f64 = coords[..=seg].windows(2).map(|w| distance(w[0], w[1])).sum();
        let along = (before + t * distance(coords[seg], coords[seg + 1])).min(edge.length);
        Some(EdgeHit { edge: edge_id, point, along, distance: d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::coord;

    fn cross() -> Graph {
        // Two edges meeting at (0,0), plus a parallel one at y = 10.
        let mut graph = Graph::new(None);
        let o = graph.add_node(coord! { x: 0.0, y: 0.0 });
        let e = graph.add_node(coord! { x: 50.0, y: 0.0 });
        let n = graph.add_node(coord! { x: 0.0, y: 50.0 });
        let a = graph.add_node(coord! { x: 0.0, y: 10.0 });
        let b = graph.add_node(coord! { x: 50.0, y: 10.0 });
        graph.add_edge(o, e, vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 20.0, y: 0.0 }, coord! { x: 50.0, y: 0.0 }], None, None, 0);
        graph.add_edge(o, n, vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 50.0 }], None, None, 1);
        graph.add_edge(a, b, vec![coord! { x: 0.0, y: 10.0 }, coord! { x: 50.0, y: 10.0 }], None, Some(false), 2);
        graph
    }

    #[test]
    fn nearest_measures_along_the_polyline() {
        let graph = cross();
        let index = SegmentIndex::new(&graph, |_| true);
        assert_eq!(index.len(), 4);

        let hit = index.nearest(&graph, coord! { x: 30.0, y: -4.0 }).unwrap();
        assert_eq!(hit.edge, EdgeId(0));
        assert_relative_eq!(hit.along, 30.0, epsilon = 1e-9);
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point.x, 30.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point.y, 0.0);
    }

    #[test]
    fn ties_resolve_to_lowest_edge_id() {
        let graph = cross();
        let index = SegmentIndex::new(&graph, |_| true);
        // Equidistant from edge 0 and edge 1.
        let hit = index.nearest(&graph, coord! { x: -3.0, y: -3.0 }).unwrap();
        assert_eq!(hit.edge, EdgeId(0));
        // Equidistant from edge 0 (y = 0) and edge 2 (y = 10).
        let hit = index.nearest(&graph, coord! { x: 25.0, y: 5.0 }).unwrap();
        assert_eq!(hit.edge, EdgeId(0));
    }

    #[test]
    fn filter_excludes_edges() {
        let graph = cross();
        let index = SegmentIndex::new(&graph, |edge| edge.is_walkable());
        assert_eq!(index.len(), 3);
        let hit = index.nearest(&graph, coord! { x: 25.0, y: 9.0 }).unwrap();
        assert_eq!(hit.edge, EdgeId(0));
        assert_relative_eq!(hit.distance, 9.0);
    }

    #[test]
    fn empty_index_has_no_hit() {
        let graph = Graph::new(None);
        let index = SegmentIndex::new(&graph, |_| true);
        assert!(index.is_empty());
        assert!(index.nearest(&graph, coord! { x: 0.0, y: 0.0 }).is_none());
    }
}
