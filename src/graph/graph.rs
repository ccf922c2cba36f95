use std::fmt;

use geo::{Coord, LineString};
use serde::Serialize;

use crate::common::{polyline_length, split_at};

/// Index of a node in a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Index of an edge in a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub u32);

impl NodeId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

impl EdgeId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// A walkable link between two nodes, following the road polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    /// Starts at `from`, ends at `to`.
    pub geometry: LineString<f64>,
    pub length: f64,
    pub class: Option<String>,
    pub walkable: Option<bool>,
    /// Index of the source road feature.
    pub road: usize,
}

impl Edge {
    /// Only an explicit `false` flag blocks traversal.
    #[inline] pub fn is_walkable(&self) -> bool { self.walkable != Some(false) }

    #[inline] pub fn is_loop(&self) -> bool { self.from == self.to }

    /// The endpoint opposite `node`.
    #[inline]
    pub fn other(&self, node: NodeId) -> NodeId {
        if node == self.from { self.to } else { self.from }
    }
}

/// A routable pedestrian network. Edge endpoints always exist as nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Coord<f64>>,
    edges: Vec<Edge>,
    epsg: Option<u32>,
}

impl Graph {
    pub fn new(epsg: Option<u32>) -> Self {
        Self { nodes: Vec::new(), edges: Vec::new(), epsg }
    }

    #[inline] pub fn node_count(&self) -> usize { self.nodes.len() }

    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() }

    #[inline] pub fn nodes(&self) -> &[Coord<f64>] { &self.nodes }

    #[inline] pub fn edges(&self) -> &[Edge] { &self.edges }

    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    #[inline] pub fn node(&self, id: NodeId) -> Option<Coord<f64>> { self.nodes.get(id.index()).copied() }

    #[inline] pub fn edge(&self, id: EdgeId) -> Option<&Edge> { self.edges.get(id.index()) }

    #[inline] pub fn contains_node(&self, id: NodeId) -> bool { id.index() < self.nodes.len() }

    /// Sum of all edge lengths.
    pub fn total_length(&self) -> f64 {
        self.edges.iter().map(|edge| edge.length).sum()
    }

    /// Number of edges incident to `node` (loops count once).
    pub fn degree(&self, node: NodeId) -> usize {
        self.edges.iter().filter(|edge| edge.from == node || edge.to == node).count()
    }

    pub(crate) fn add_node(&mut self, at: Coord<f64>) -> NodeId {
        self.nodes.push(at);
        NodeId(self.nodes.len() as u32 - 1)
    }

    /// Add an edge whose geometry already starts and ends at the node coordinates.
    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, coords: Vec<Coord<f64>>,
        class: Option<String>, walkable: Option<bool>, road: usize,
    ) -> EdgeId {
        assert!(self.contains_node(from) && self.contains_node(to), "edge endpoints must be graph nodes");

        let id = EdgeId(self.edges.len() as u32);
        let length = polyline_length(&coords);
        self.edges.push(Edge { id, from, to, geometry: LineString::new(coords), length, class, walkable, road });
        id
    }

    /// Split `edge` at the given `(distance along edge, node)` cuts, which must be
    /// sorted by distance and lie strictly inside the edge. The first piece keeps
    /// the original id; the others are appended. Returns the pieces in order.
    pub(crate) fn split_edge(&mut self, edge: EdgeId, cuts: &[(f64, NodeId)]) -> Vec<EdgeId> {
        let original = self.edges[edge.index()].clone();
        let mut pieces = Vec::with_capacity(cuts.len() + 1);
        let mut rest = original.geometry.0.clone();
        let mut consumed = 0.0;
        let mut from = original.from;

        for (i, &(at, node)) in cuts.iter().enumerate() {
            let (mut head, mut tail) = split_at(&rest, at - consumed);
            let pin = self.nodes[node.index()];
            if let Some(last) = head.last_mut() { *last = pin }
            if let Some(first) = tail.first_mut() { *first = pin }

            if i == 0 {
                let kept = &mut self.edges[edge.index()];
                kept.to = node;
                kept.length = polyline_length(&head);
                kept.geometry = LineString::new(head);
                pieces.push(edge);
            } else {
                pieces.push(self.add_edge(from, node, head, original.class.clone(), original.walkable, original.road));
            }

            consumed = at;
            from = node;
            rest = tail;
        }

        if cuts.is_empty() {
            pieces.push(edge);
        } else {
            pieces.push(self.add_edge(from, original.to, rest, original.class, original.walkable, original.road));
        }
        pieces
    }
}
