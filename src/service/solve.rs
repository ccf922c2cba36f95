use log::{debug, info};

use crate::common::union_all;
use crate::config::AccessConfig;
use crate::error::{AccessError, Diagnostics, Stage};
use crate::graph::{Graph, NodeId};
use crate::service::area::{corridor_polygons, reachable_spans, ReachableSpan};
use crate::service::csr::Adjacency;
use crate::service::dijkstra::bounded_distances;
use crate::service::WalkableArea;

/// Result of one service-area computation.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceArea {
    /// Walking distance per graph node; infinite when beyond the threshold.
    pub distances: Vec<f64>,
    pub spans: Vec<ReachableSpan>,
    pub area: WalkableArea,
}

impl ServiceArea {
    /// Nodes within the threshold, ascending.
    pub fn reached_nodes(&self) -> Vec<NodeId> {
        self.distances.iter().enumerate()
            .filter(|(_, d)| d.is_finite())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Total length of the reachable spans.
    pub fn reachable_length(&self) -> f64 {
        self.spans.iter().map(ReachableSpan::length).sum()
    }
}

/// Multi-source bounded traversal from park entrances.
#[derive(Clone, Debug)]
pub struct ServiceAreaSolver {
    threshold: f64,
    buffer: f64,
    arc_segments: usize,
}

impl Default for ServiceAreaSolver {
    fn default() -> Self { Self::from_config(&AccessConfig::default()) }
}

impl ServiceAreaSolver {
    pub fn new(threshold: f64, buffer: f64, arc_segments: usize) -> Self {
        Self { threshold, buffer, arc_segments }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.walk_distance_threshold, config.corridor_buffer, config.arc_segments)
    }

    #[inline] pub fn threshold(&self) -> f64 { self.threshold }

    /// Compute the area reachable within the threshold from any of `entrances`.
    /// Fails if an entrance is not a graph node with at least one walkable edge.
    pub fn solve(&self, graph: &Graph, entrances: &[NodeId], diagnostics: &mut Diagnostics) -> Result<ServiceArea, AccessError> {
        let adjacency = Adjacency::from_graph(graph);
        for &node in entrances {
            if !graph.contains_node(node) || adjacency.degree(node.index()) == 0 {
                return Err(AccessError::EntranceNotOnGraph { node: node.0 });
            }
        }

        if entrances.is_empty() {
            diagnostics.warn(Stage::ServiceArea, "service area", "no entrances to start from");
            return Ok(ServiceArea {
                distances: vec![f64::INFINITY; graph.node_count()],
                spans: Vec::new(),
                area: WalkableArea::empty(self.threshold),
            });
        }

        let sources: Vec<usize> = entrances.iter().map(|node| node.index()).collect();
        let distances = bounded_distances(&adjacency, &sources, self.threshold);
        let spans = reachable_spans(graph, &distances, self.threshold);
        debug!(
            "[service_area] {} of {} nodes reached, {} spans",
            distances.iter().filter(|d| d.is_finite()).count(), distances.len(), spans.len()
        );

        let corridors = corridor_polygons(graph, &spans, self.buffer, self.arc_segments);
        let area = WalkableArea::new(union_all(corridors), self.threshold);
        info!(
            "[service_area] walkable area of {:.0} from {} entrances within {}",
            area.area(), entrances.len(), self.threshold
        );
        Ok(ServiceArea { distances, spans, area })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn two_edges() -> Graph {
        let mut graph = Graph::new(None);
        let a = graph.add_node(coord! { x: 0.0, y: 0.0 });
        let m = graph.add_node(coord! { x: 500.0, y: 0.0 });
        let b = graph.add_node(coord! { x: 1000.0, y: 0.0 });
        graph.add_node(coord! { x: 0.0, y: 900.0 });
        graph.add_edge(a, m, vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 500.0, y: 0.0 }], None, None, 0);
        graph.add_edge(m, b, vec![coord! { x: 500.0, y: 0.0 }, coord! { x: 1000.0, y: 0.0 }], None, None, 1);
        graph
    }

    #[test]
    fn unknown_entrance_is_fatal() {
        let graph = two_edges();
        let err = ServiceAreaSolver::default().solve(&graph, &[NodeId(42)], &mut Diagnostics::new()).unwrap_err();
        assert_eq!(err, AccessError::EntranceNotOnGraph { node: 42 });
    }

    #[test]
    fn isolated_entrance_is_fatal() {
        let graph = two_edges();
        let err = ServiceAreaSolver::default().solve(&graph, &[NodeId(3)], &mut Diagnostics::new()).unwrap_err();
        assert_eq!(err, AccessError::EntranceNotOnGraph { node: 3 });
    }

    #[test]
    fn empty_entrance_set_warns() {
        let graph = two_edges();
        let mut diagnostics = Diagnostics::new();
        let result = ServiceAreaSolver::default().solve(&graph, &[], &mut diagnostics).unwrap();
        assert!(result.area.is_empty());
        assert!(result.spans.is_empty());
        assert_eq!(diagnostics.warning_count(Stage::ServiceArea), 1);
    }

    #[test]
    fn reached_nodes_and_length() {
        let graph = two_edges();
        let result = ServiceAreaSolver::default().solve(&graph, &[NodeId(0)], &mut Diagnostics::new()).unwrap();
        assert_eq!(result.reached_nodes(), vec![NodeId(0)]);
        assert_eq!(result.reachable_length(), 400.0);
        assert_eq!(result.area.distance(), 400.0);
        assert!(!result.area.is_empty());
    }
}
