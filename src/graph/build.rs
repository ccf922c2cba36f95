use geo::Coord;
use log::{debug, info};
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;

use crate::common::{is_finite, polyline_length, EPSILON};
use crate::config::{AccessConfig, Connectivity};
use crate::error::{AccessError, Diagnostics, Stage};
use crate::graph::{Graph, NodeId};
use crate::layers::{Layer, RoadFeature};

/// Counts from one graph build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub edges: usize,
    pub nodes: usize,
    /// Road features dropped because of their class.
    pub excluded: usize,
    /// Line parts skipped as degenerate.
    pub invalid: usize,
}

/// Validated pieces of one road feature, ready to be noded.
enum Prepared {
    Excluded,
    Pieces(Vec<Vec<Coord<f64>>>, Vec<AccessError>),
}

/// Builds a routable [`Graph`] from road lines.
#[derive(Clone, Debug)]
pub struct NetworkGraphBuilder {
    snap_tolerance: f64,
    excluded: Vec<String>,
    connectivity: Connectivity,
}

impl Default for NetworkGraphBuilder {
    fn default() -> Self { Self::from_config(&AccessConfig::default()) }
}

impl NetworkGraphBuilder {
    pub fn new(snap_tolerance: f64) -> Self {
        Self { snap_tolerance, excluded: Vec::new(), connectivity: Connectivity::Endpoint }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.node_snap_tolerance)
            .exclude_classes(config.excluded_road_classes.iter().cloned())
            .connectivity(config.connectivity)
    }

    /// Drop roads whose class matches any of these (case-insensitive).
    pub fn exclude_classes(mut self, classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded = classes.into_iter().map(|class| class.into().trim().to_lowercase()).collect();
        self
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    #[inline] pub fn snap_tolerance(&self) -> f64 { self.snap_tolerance }

    fn is_excluded(&self, class: Option<&str>) -> bool {
        class.is_some_and(|class| {
            let class = class.trim().to_lowercase();
            self.excluded.iter().any(|excluded| *excluded == class)
        })
    }

    /// Whether the line turns straight back along itself at some vertex.
    fn folds_back(line: &[Coord<f64>]) -> bool {
        line.windows(3).any(|w| {
            let (u, v) = (w[1] - w[0], w[2] - w[1]);
            let cross = u.x * v.y - u.y * v.x;
            let dot = u.x * v.x + u.y * v.y;
            dot < 0.0 && cross.abs() <= EPSILON * (u.x.hypot(u.y) * v.x.hypot(v.y)).max(1.0)
        })
    }

    /// Check one line part and cut it into edge pieces.
    fn prepare_part(&self, layer: &str, feature: usize, coords: &[Coord<f64>]) -> Result<Vec<Vec<Coord<f64>>>, AccessError> {
        let invalid = |reason: &str| AccessError::InvalidGeometry {
            layer: layer.to_string(),
            feature,
            reason: reason.to_string(),
        };

        if coords.iter().any(|&c| !is_finite(c)) {
            return Err(invalid("non-finite coordinate"));
        }

        let mut line: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
        for &c in coords {
            if line.last() != Some(&c) { line.push(c) }
        }
        if line.len() < 2 {
            return Err(invalid("fewer than two distinct coordinates"));
        }
        if polyline_length(&line) <= 0.0 {
            return Err(invalid("zero length"));
        }
        if Self::folds_back(&line) {
            return Err(invalid("folds back onto itself"));
        }

        Ok(match self.connectivity {
            Connectivity::Endpoint => vec![line],
            Connectivity::AnyVertex => line.windows(2).map(|w| w.to_vec()).collect(),
        })
    }

    fn prepare(&self, layer: &str, index: usize, road: &RoadFeature) -> Prepared {
        if self.is_excluded(road.class.as_deref()) {
            return Prepared::Excluded;
        }

        let mut pieces = Vec::new();
        let mut errors = Vec::new();
        if road.geometry.0.is_empty() {
            errors.push(AccessError::InvalidGeometry {
                layer: layer.to_string(),
                feature: index,
                reason: "empty geometry".to_string(),
            });
        }
        for part in &road.geometry.0 {
            match self.prepare_part(layer, index, &part.0) {
                Ok(mut cut) => pieces.append(&mut cut),
                Err(err) => errors.push(err),
            }
        }
        Prepared::Pieces(pieces, errors)
    }

    /// Build the graph. Degenerate parts are recorded in `diagnostics` and skipped.
    pub fn build(&self, roads: &Layer<RoadFeature>, diagnostics: &mut Diagnostics) -> (Graph, BuildReport) {
        let prepared: Vec<Prepared> = roads.features.par_iter().enumerate()
            .map(|(i, road)| self.prepare(&roads.name, i, road))
            .collect();

        let mut graph = Graph::new(roads.epsg);
        let mut report = BuildReport::default();
        let mut nodes: RTree<GeomWithData<[f64; 2], NodeId>> = RTree::new();
        let tolerance2 = self.snap_tolerance * self.snap_tolerance;

        // Greedy clustering: join the nearest node within tolerance or create one.
        let mut node_at = |graph: &mut Graph, c: Coord<f64>| -> NodeId {
            if let Some(hit) = nodes.nearest_neighbor(&[c.x, c.y]) {
                let [x, y] = *hit.geom();
                if (x - c.x).powi(2) + (y - c.y).powi(2) <= tolerance2 {
                    return hit.data;
                }
            }
            let id = graph.add_node(c);
            nodes.insert(GeomWithData::new([c.x, c.y], id));
            id
        };

        for (index, item) in prepared.into_iter().enumerate() {
            let road = &roads.features[index];
            let (pieces, errors) = match item {
                Prepared::Excluded => {
                    report.excluded += 1;
                    continue;
                }
                Prepared::Pieces(pieces, errors) => (pieces, errors),
            };
            for err in errors {
                report.invalid += 1;
                diagnostics.record(Stage::NetworkBuild, err);
            }

            for mut coords in pieces {
                let last = coords.len() - 1;
                let from = node_at(&mut graph, coords[0]);
                let to = node_at(&mut graph, coords[last]);
                coords[0] = graph.nodes()[from.index()];
                coords[last] = graph.nodes()[to.index()];

                if from == to && polyline_length(&coords) <= self.snap_tolerance {
                    report.invalid += 1;
                    diagnostics.record(Stage::NetworkBuild, AccessError::InvalidGeometry {
                        layer: roads.name.clone(),
                        feature: index,
                        reason: "collapses under the snap tolerance".to_string(),
                    });
                    continue;
                }

                graph.add_edge(from, to, coords, road.class.clone(), road.walkable, index);
            }
        }

        report.edges = graph.edge_count();
        report.nodes = graph.node_count();
        debug!("[network] snap tolerance {}, connectivity {:?}", self.snap_tolerance, self.connectivity);
        info!(
            "[network] built graph with {} nodes and {} edges ({} roads excluded, {} parts invalid)",
            report.nodes, report.edges, report.excluded, report.invalid
        );
        (graph, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{coord, LineString, MultiLineString};

    fn layer(roads: Vec<RoadFeature>) -> Layer<RoadFeature> {
        Layer::new("roads", roads)
    }

    #[test]
    fn endpoints_within_tolerance_share_a_node() {
        let roads = layer(vec![
            RoadFeature::from_line(&[(0.0, 0.0), (100.0, 0.0)]),
            RoadFeature::from_line(&[(100.3, 0.0), (200.0, 0.0)]),
        ]);
        let mut diagnostics = Diagnostics::new();
        let (graph, report) = NetworkGraphBuilder::new(0.5).build(&roads, &mut diagnostics);

        assert_eq!(report, BuildReport { edges: 2, nodes: 3, excluded: 0, invalid: 0 });
        assert_eq!(graph.edges()[0].to, graph.edges()[1].from);
        // The second edge is pinned to the shared node.
        assert_eq!(graph.edges()[1].geometry.0[0], coord! { x: 100.0, y: 0.0 });
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn endpoints_beyond_tolerance_stay_apart() {
        let roads = layer(vec![
            RoadFeature::from_line(&[(0.0, 0.0), (100.0, 0.0)]),
            RoadFeature::from_line(&[(101.0, 0.0), (200.0, 0.0)]),
        ]);
        let (graph, _) = NetworkGraphBuilder::new(0.5).build(&roads, &mut Diagnostics::new());
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn excluded_classes_are_dropped_and_counted() {
        let roads = layer(vec![
            RoadFeature::from_line(&[(0.0, 0.0), (100.0, 0.0)]).with_class("MOTORWAY"),
            RoadFeature::from_line(&[(0.0, 0.0), (0.0, 100.0)]).with_class("footway"),
        ]);
        let (graph, report) = NetworkGraphBuilder::default().build(&roads, &mut Diagnostics::new());
        assert_eq!(report.excluded, 1);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edges().iter().all(|edge| edge.class.as_deref() != Some("MOTORWAY")));
    }

    #[test]
    fn degenerate_lines_are_recorded_and_skipped() {
        let roads = layer(vec![
            RoadFeature::from_line(&[(0.0, 0.0), (0.0, 0.0)]),
            RoadFeature::from_line(&[(0.0, 0.0), (f64::NAN, 1.0)]),
            RoadFeature::new(MultiLineString::new(vec![])),
            RoadFeature::from_line(&[(0.0, 0.0), (10.0, 0.0)]),
        ]);
        let mut diagnostics = Diagnostics::new();
        let (graph, report) = NetworkGraphBuilder::new(0.5).build(&roads, &mut diagnostics);

        assert_eq!(report.invalid, 3);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges()[0].road, 3);
        let features: Vec<usize> = diagnostics.invalid_features.iter().map(|issue| issue.feature).collect();
        assert_eq!(features, vec![0, 1, 2]);
    }

    #[test]
    fn lines_folding_back_onto_themselves_are_skipped() {
        let roads = layer(vec![
            RoadFeature::from_line(&[(0.0, 0.0), (50.0, 0.0), (20.0, 0.0)]),
            RoadFeature::from_line(&[(0.0, 0.0), (50.0, 0.0), (50.0, 50.0), (0.0, 0.0)]),
        ]);
        let mut diagnostics = Diagnostics::new();
        let (graph, report) = NetworkGraphBuilder::new(0.5).build(&roads, &mut diagnostics);

        assert_eq!(report.invalid, 1);
        assert_eq!(diagnostics.invalid_features[0].feature, 0);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edges()[0].is_loop());
    }

    #[test]
    fn lines_shorter_than_tolerance_collapse() {
        let roads = layer(vec![RoadFeature::from_line(&[(0.0, 0.0), (0.2, 0.0)])]);
        let mut diagnostics = Diagnostics::new();
        let (graph, report) = NetworkGraphBuilder::new(0.5).build(&roads, &mut diagnostics);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(report.invalid, 1);
        assert_eq!(diagnostics.invalid_count(Stage::NetworkBuild), 1);
    }

    #[test]
    fn any_vertex_cuts_every_segment() {
        let roads = layer(vec![RoadFeature::from_line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])]);
        let builder = NetworkGraphBuilder::new(0.5).connectivity(Connectivity::AnyVertex);
        let (graph, _) = builder.build(&roads, &mut Diagnostics::new());
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_count(), 3);

        let (graph, _) = NetworkGraphBuilder::new(0.5).build(&roads, &mut Diagnostics::new());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_relative_eq!(graph.edges()[0].length, 20.0);
    }

    #[test]
    fn multi_part_roads_keep_attributes_on_every_edge() {
        let geometry = MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(20.0, 0.0), (30.0, 0.0)]),
        ]);
        let road = RoadFeature::new(geometry).with_class("path").with_walkable(false);
        let (graph, _) = NetworkGraphBuilder::new(0.5).build(&layer(vec![road]), &mut Diagnostics::new());
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edges().iter().all(|edge| !edge.is_walkable() && edge.class.as_deref() == Some("path")));
    }

    #[test]
    fn every_edge_endpoint_is_a_node() {
        let roads = layer((0..20).map(|i| {
            let x = i as f64 * 10.0;
            RoadFeature::from_line(&[(x, 0.0), (x + 10.0, 0.1), (x + 10.0, 5.0)])
        }).collect());
        let (graph, _) = NetworkGraphBuilder::new(0.5).build(&roads, &mut Diagnostics::new());
        for edge in graph.edges() {
            assert!(graph.contains_node(edge.from) && graph.contains_node(edge.to));
            assert_eq!(Some(edge.geometry.0[0]), graph.node(edge.from));
            assert_eq!(edge.geometry.0.last().copied(), graph.node(edge.to));
        }
    }

    #[test]
    fn graph_carries_layer_epsg() {
        let roads = layer(vec![RoadFeature::from_line(&[(0.0, 0.0), (1.0, 0.0)])]).with_epsg(Some(3035));
        let (graph, _) = NetworkGraphBuilder::new(0.0).build(&roads, &mut Diagnostics::new());
        assert_eq!(graph.epsg(), Some(3035));
    }
}
