use std::collections::BTreeMap;

use geo::Coord;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::common::{is_finite, point_at, sample_ring};
use crate::config::AccessConfig;
use crate::entrance::parks::{aggregate_parks, ParkUnit};
use crate::error::{AccessError, Diagnostics, Stage};
use crate::graph::{EdgeHit, EdgeId, Graph, NodeId, SegmentIndex};
use crate::layers::{Layer, Park};

/// A park entrance snapped onto the graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntrancePoint {
    pub id: usize,
    /// Index into [`EntranceSet::parks`].
    pub park: usize,
    /// Coordinates of `node`.
    #[serde(skip)]
    pub location: Coord<f64>,
    /// The boundary sample the entrance was derived from.
    #[serde(skip)]
    pub sample: Coord<f64>,
    pub node: NodeId,
    /// Distance from the sample to the nearest edge, before snapping.
    pub edge_distance: f64,
}

/// A boundary sample and the outcome of its nearest-edge test.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub park: usize,
    pub location: Coord<f64>,
    pub edge: Option<EdgeId>,
    /// Infinite when the graph has no walkable edge.
    pub distance: f64,
    pub kept: bool,
}

/// Everything produced by one entrance generation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntranceSet {
    pub parks: Vec<ParkUnit>,
    /// Indices into `parks` that passed the area filter.
    pub qualifying: Vec<usize>,
    pub candidates: Vec<Candidate>,
    pub entrances: Vec<EntrancePoint>,
}

impl EntranceSet {
    /// Distinct entrance nodes, ascending.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.entrances.iter().map(|entrance| entrance.node).collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Entrances generated for park unit `park`.
    pub fn entrances_of(&self, park: usize) -> impl Iterator<Item = &EntrancePoint> {
        self.entrances.iter().filter(move |entrance| entrance.park == park)
    }

    #[inline] pub fn is_empty(&self) -> bool { self.entrances.is_empty() }
}

/// Generates park entrances from park boundaries and snaps them into the graph.
#[derive(Clone, Debug)]
pub struct EntranceGenerator {
    snap_distance: f64,
    sample_interval: f64,
    min_area: f64,
    aggregation_distance: f64,
    include_small_parks: bool,
    node_tolerance: f64,
}

impl Default for EntranceGenerator {
    fn default() -> Self { Self::from_config(&AccessConfig::default()) }
}

impl EntranceGenerator {
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            snap_distance: config.entrance_snap_distance,
            sample_interval: config.entrance_sample_interval,
            min_area: config.min_park_area,
            aggregation_distance: config.park_aggregation_distance,
            include_small_parks: config.include_small_parks,
            node_tolerance: config.node_snap_tolerance,
        }
    }

    pub fn snap_distance(mut self, distance: f64) -> Self {
        self.snap_distance = distance;
        self
    }

    pub fn sample_interval(mut self, interval: f64) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn min_area(mut self, area: f64) -> Self {
        self.min_area = area;
        self
    }

    pub fn aggregation_distance(mut self, distance: f64) -> Self {
        self.aggregation_distance = distance;
        self
    }

    fn validate_park(&self, layer: &str, feature: usize, park: &Park) -> Result<(), AccessError> {
        let invalid = |reason: &str| AccessError::InvalidGeometry {
            layer: layer.to_string(),
            feature,
            reason: reason.to_string(),
        };
        if park.geometry.0.is_empty() {
            return Err(invalid("empty geometry"));
        }
        let coords = park.geometry.0.iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            .flat_map(|ring| ring.0.iter());
        for &c in coords {
            if !is_finite(c) { return Err(invalid("non-finite coordinate")) }
        }
        Ok(())
    }

    /// Boundary samples of every ring of `unit`.
    fn samples(&self, unit: &ParkUnit) -> Vec<Coord<f64>> {
        unit.geometry.0.iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            .flat_map(|ring| sample_ring(ring, self.sample_interval))
            .collect()
    }

    /// Generate entrances and split `graph` at each of them.
    pub fn generate(&self, parks: &Layer<Park>, graph: &mut Graph, diagnostics: &mut Diagnostics) -> EntranceSet {
        let mut valid = Vec::with_capacity(parks.len());
        for (i, park) in parks.iter().enumerate() {
            match self.validate_park(&parks.name, i, park) {
                Ok(()) => valid.push(i),
                Err(err) => diagnostics.record(Stage::EntranceGeneration, err),
            }
        }

        let units = aggregate_parks(&parks.features, &valid, self.aggregation_distance);
        let qualifying: Vec<usize> = units.iter().enumerate()
            .filter(|(_, unit)| self.include_small_parks || unit.area >= self.min_area)
            .map(|(i, _)| i)
            .collect();
        debug!(
            "[entrances] {} parks merged into {} units, {} of them qualifying",
            valid.len(), units.len(), qualifying.len()
        );

        let searched: Vec<(usize, Coord<f64>, Option<EdgeHit>)> = {
            let graph: &Graph = graph;
            let index = SegmentIndex::new(graph, |edge| edge.is_walkable());
            qualifying.par_iter()
                .flat_map_iter(|&unit| {
                    let index = &index;
                    self.samples(&units[unit]).into_iter()
                        .map(move |sample| (unit, sample, index.nearest(graph, sample)))
                })
                .collect()
        };

        let candidates: Vec<Candidate> = searched.iter()
            .map(|&(park, location, hit)| {
                let distance = hit.map_or(f64::INFINITY, |hit| hit.distance);
                Candidate { park, location, edge: hit.map(|hit| hit.edge), distance, kept: distance <= self.snap_distance }
            })
            .collect();

        let kept: Vec<(usize, Coord<f64>, EdgeHit)> = searched.into_iter()
            .filter_map(|(park, sample, hit)| hit.filter(|hit| hit.distance <= self.snap_distance).map(|hit| (park, sample, hit)))
            .collect();
        let nodes = self.snap(graph, &kept);

        let entrances: Vec<EntrancePoint> = kept.iter().zip(nodes)
            .enumerate()
            .map(|(id, (&(park, sample, hit), node))| EntrancePoint {
                id,
                park,
                location: graph.node(node).unwrap_or(hit.point),
                sample,
                node,
                edge_distance: hit.distance,
            })
            .collect();

        for &unit in &qualifying {
            if !entrances.iter().any(|entrance| entrance.park == unit) {
                diagnostics.warn(
                    Stage::EntranceGeneration,
                    format!("park {}", units[unit].first_member()),
                    format!("no boundary sample within {} of the network", self.snap_distance),
                );
            }
        }

        info!(
            "[entrances] {} entrances from {} candidates on {} qualifying parks",
            entrances.len(), candidates.len(), qualifying.len()
        );
        EntranceSet { parks: units, qualifying, candidates, entrances }
    }

    /// Split the graph at the projections of `kept`, returning the node of
    /// each entrance in the same order. Projections within the node tolerance
    /// of an edge end reuse that end; coincident projections share a node.
    /// A loop whose only hits land on its end node is split at its midpoint,
    /// so the entrance node keeps walkable non-loop edges.
    fn snap(&self, graph: &mut Graph, kept: &[(usize, Coord<f64>, EdgeHit)]) -> Vec<NodeId> {
        let mut by_edge: BTreeMap<EdgeId, Vec<usize>> = BTreeMap::new();
        for (i, (_, _, hit)) in kept.iter().enumerate() {
            by_edge.entry(hit.edge).or_default().push(i);
        }

        let mut nodes = vec![NodeId(0); kept.len()];
        for (edge_id, mut hits) in by_edge {
            let Some(edge) = graph.edge(edge_id) else { continue };
            let (from, to, length) = (edge.from, edge.to, edge.length);
            hits.sort_by(|&a, &b| kept[a].2.along.total_cmp(&kept[b].2.along).then(a.cmp(&b)));

            let mut cuts: Vec<(f64, NodeId)> = Vec::new();
            let mut on_end = false;
            for i in hits {
                let hit = &kept[i].2;
                nodes[i] = if hit.along <= self.node_tolerance {
                    on_end = true;
                    from
                } else if length - hit.along <= self.node_tolerance {
                    on_end = true;
                    to
                } else {
                    match cuts.last() {
                        Some(&(at, node)) if hit.along - at <= self.node_tolerance => node,
                        _ => {
                            let node = graph.add_node(hit.point);
                            cuts.push((hit.along, node));
                            node
                        }
                    }
                };
            }
            if from == to && on_end && cuts.is_empty() {
                let Some(edge) = graph.edge(edge_id) else { continue };
                let middle = point_at(&edge.geometry.0, length / 2.0);
                let node = graph.add_node(middle);
                cuts.push((length / 2.0, node));
            }
            if !cuts.is_empty() {
                graph.split_edge(edge_id, &cuts);
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{coord, polygon, MultiPolygon};

    /// A 200 m road along y = 0 and a 100 x 100 park whose south side is 10 m north of it.
    fn fixture() -> (Graph, Layer<Park>) {
        let mut graph = Graph::new(None);
        let a = graph.add_node(coord! { x: 0.0, y: 0.0 });
        let b = graph.add_node(coord! { x: 200.0, y: 0.0 });
        graph.add_edge(a, b, vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 200.0, y: 0.0 }], None, None, 0);

        let park = Park::new(MultiPolygon::new(vec![polygon![
            (x: 50.0, y: 10.0), (x: 150.0, y: 10.0), (x: 150.0, y: 110.0), (x: 50.0, y: 110.0), (x: 50.0, y: 10.0)
        ]]));
        (graph, Layer::new("parks", vec![park]))
    }

    #[test]
    fn south_side_samples_become_entrances() {
        let (mut graph, parks) = fixture();
        let mut diagnostics = Diagnostics::new();
        let set = EntranceGenerator::default().generate(&parks, &mut graph, &mut diagnostics);

        // 8 samples; (50,10), (100,10), (150,10) are within 25 m.
        assert_eq!(set.candidates.len(), 8);
        assert_eq!(set.entrances.len(), 3);
        assert!(diagnostics.is_clean());

        let xs: Vec<f64> = set.entrances.iter().map(|e| e.location.x).collect();
        assert_eq!(xs, vec![50.0, 100.0, 150.0]);
        assert!(set.entrances.iter().all(|e| e.location.y == 0.0 && e.edge_distance == 10.0));

        // Three splits turn one edge into four.
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.node_count(), 5);
        assert_relative_eq!(graph.total_length(), 200.0, epsilon = 1e-9);
        assert_eq!(set.nodes().len(), 3);
    }

    #[test]
    fn kept_and_discarded_respect_snap_distance() {
        let (mut graph, parks) = fixture();
        let set = EntranceGenerator::default().generate(&parks, &mut graph, &mut Diagnostics::new());
        for candidate in &set.candidates {
            assert_eq!(candidate.kept, candidate.distance <= 25.0);
        }
        assert_eq!(set.candidates.iter().filter(|c| c.kept).count(), set.entrances.len());
    }

    #[test]
    fn small_park_yields_no_entrances() {
        let (mut graph, _) = fixture();
        let small = Park::new(MultiPolygon::new(vec![polygon![
            (x: 50.0, y: 5.0), (x: 120.0, y: 5.0), (x: 120.0, y: 76.0), (x: 50.0, y: 76.0), (x: 50.0, y: 5.0)
        ]]));
        assert!(small.area() < 5_000.0);
        let parks = Layer::new("parks", vec![small]);
        let set = EntranceGenerator::default().generate(&parks, &mut graph, &mut Diagnostics::new());
        assert!(set.entrances.is_empty());
        assert!(set.qualifying.is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn small_parks_can_be_included() {
        let (mut graph, parks) = fixture();
        let config = AccessConfig { include_small_parks: true, min_park_area: 1e9, ..Default::default() };
        let set = EntranceGenerator::from_config(&config).generate(&parks, &mut graph, &mut Diagnostics::new());
        assert_eq!(set.entrances.len(), 3);
    }

    #[test]
    fn unreachable_park_warns() {
        let (mut graph, _) = fixture();
        let far = Park::new(MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 500.0), (x: 200.0, y: 500.0), (x: 200.0, y: 700.0), (x: 0.0, y: 700.0), (x: 0.0, y: 500.0)
        ]]));
        let mut diagnostics = Diagnostics::new();
        let set = EntranceGenerator::default().generate(&Layer::new("parks", vec![far]), &mut graph, &mut diagnostics);
        assert!(set.entrances.is_empty());
        assert_eq!(diagnostics.warning_count(Stage::EntranceGeneration), 1);
        assert_eq!(diagnostics.warnings[0].subject, "park 0");
    }

    #[test]
    fn projections_near_edge_ends_reuse_nodes() {
        let (mut graph, _) = fixture();
        // Corner sample (0.2, 5) projects 0.2 m from node 0.
        let park = Park::new(MultiPolygon::new(vec![polygon![
            (x: 0.2, y: 5.0), (x: 0.2, y: 200.0), (x: -199.8, y: 200.0), (x: -199.8, y: 5.0), (x: 0.2, y: 5.0)
        ]]));
        let generator = EntranceGenerator::default().sample_interval(1000.0);
        let set = generator.generate(&Layer::new("parks", vec![park]), &mut graph, &mut Diagnostics::new());
        assert_eq!(set.entrances.len(), 1);
        assert_eq!(set.entrances[0].node, NodeId(0));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn entrance_on_a_ring_road_node_splits_the_ring() {
        let mut graph = Graph::new(None);
        let corner = graph.add_node(coord! { x: 0.0, y: 0.0 });
        let ring = vec![
            coord! { x: 0.0, y: 0.0 }, coord! { x: 100.0, y: 0.0 }, coord! { x: 100.0, y: 100.0 },
            coord! { x: 0.0, y: 100.0 }, coord! { x: 0.0, y: 0.0 },
        ];
        graph.add_edge(corner, corner, ring, Some("path".into()), None, 0);

        // Only the park corner (-10, -10) lies within 25 m of the ring.
        let park = Park::new(MultiPolygon::new(vec![polygon![
            (x: -210.0, y: -210.0), (x: -10.0, y: -210.0), (x: -10.0, y: -10.0), (x: -210.0, y: -10.0), (x: -210.0, y: -210.0)
        ]]));
        let set = EntranceGenerator::default().generate(&Layer::new("parks", vec![park]), &mut graph, &mut Diagnostics::new());

        assert_eq!(set.nodes(), vec![corner]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edges().iter().all(|edge| !edge.is_loop()));
        assert_eq!(graph.node(NodeId(1)), Some(coord! { x: 100.0, y: 100.0 }));
        assert_relative_eq!(graph.total_length(), 400.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_parks_are_recorded() {
        let (mut graph, _) = fixture();
        let parks = Layer::new("parks", vec![Park::new(MultiPolygon::new(vec![]))]);
        let mut diagnostics = Diagnostics::new();
        let set = EntranceGenerator::default().generate(&parks, &mut graph, &mut diagnostics);
        assert!(set.parks.is_empty());
        assert_eq!(diagnostics.invalid_count(Stage::EntranceGeneration), 1);
    }
}
