use crate::graph::{EdgeId, Graph};

/// A weighted, undirected adjacency in compressed sparse row format.
/// Each entry carries the neighbor, the edge length and the edge id.
#[derive(Debug, Default)]
pub(crate) struct Adjacency {
    size: usize,
    offsets: Vec<u32>,
    targets: Vec<u32>,
    weights: Vec<f64>,
    edge_ids: Vec<u32>,
}

impl Adjacency {
    /// Construct from per-node adjacency lists of `(neighbor, weight, edge)`.
    pub(crate) fn new(lists: &[Vec<(u32, f64, u32)>]) -> Self {
        Self {
            size: lists.len(),
            offsets: std::iter::once(0u32).chain(
                lists.iter()
                    .map(|v| v.len() as u32)
                    .scan(0u32, |acc, len| {*acc += len; Some(*acc)})
            ).collect::<Vec<u32>>(),
            targets: lists.iter().flatten().map(|&(v, _, _)| v).collect(),
            weights: lists.iter().flatten().map(|&(_, w, _)| w).collect(),
            edge_ids: lists.iter().flatten().map(|&(_, _, e)| e).collect(),
        }
    }

    /// Adjacency of the walkable edges of `graph`. Loops are left out.
    pub(crate) fn from_graph(graph: &Graph) -> Self {
        let mut lists: Vec<Vec<(u32, f64, u32)>> = vec![Vec::new(); graph.node_count()];
        for edge in graph.edges().iter().filter(|edge| edge.is_walkable() && !edge.is_loop()) {
            lists[edge.from.index()].push((edge.to.0, edge.length, edge.id.0));
            lists[edge.to.index()].push((edge.from.0, edge.length, edge.id.0));
        }
        Self::new(&lists)
    }

    /// Get the number of nodes.
    #[inline] pub(crate) fn node_count(&self) -> usize { self.size }

    /// Get the number of directed entries (twice the undirected edges).
    #[cfg(test)]
    #[inline] pub(crate) fn entry_count(&self) -> usize { self.targets.len() }

    /// Get the range of entries for a given node.
    #[inline]
    fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize .. self.offsets[node + 1] as usize
    }

    /// Get the degree (number of incident walkable edges) of a given node.
    #[inline] pub(crate) fn degree(&self, node: usize) -> usize { self.range(node).len() }

    /// Get an iterator over the neighbors, edge lengths and edge ids of a given node.
    #[inline]
    pub(crate) fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64, EdgeId)> + '_ {
        self.range(node).map(move |i| (self.targets[i] as usize, self.weights[i], EdgeId(self.edge_ids[i])))
    }
}
