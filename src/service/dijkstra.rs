use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::service::csr::Adjacency;

// NodeDistance for heap
#[derive(Debug, Clone, Copy)]
struct NodeDistance {
    node: usize,
    distance: f64,
}

// Reversed so the max-heap pops the nearest node first; ties pop the lower index.
impl Ord for NodeDistance {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other.distance.total_cmp(&self.distance).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for NodeDistance {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for NodeDistance {
    #[inline]
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for NodeDistance {}

/// Multi-source shortest walking distance from `sources`, bounded by `limit`.
/// Nodes farther than `limit` keep `f64::INFINITY`.
pub(crate) fn bounded_distances(adjacency: &Adjacency, sources: &[usize], limit: f64) -> Vec<f64> {
    let mut distances = vec![f64::INFINITY; adjacency.node_count()];
    let mut active = BinaryHeap::new();

    for &source in sources {
        if distances[source] > 0.0 {
            distances[source] = 0.0;
            active.push(NodeDistance { node: source, distance: 0.0 });
        }
    }

    while let Some(NodeDistance { node, distance }) = active.pop() {
        if distance > distances[node] { continue } // stale entry

        for (neighbor, length, _) in adjacency.neighbors(node) {
            let tentative = distance + length;
            if tentative <= limit && tentative < distances[neighbor] {
                distances[neighbor] = tentative;
                active.push(NodeDistance { node: neighbor, distance: tentative });
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -10- 1 -10- 2 -10- 3, plus a shortcut 0 -25- 3 and an isolated node 4.
    fn path() -> Adjacency {
        Adjacency::new(&[
            vec![(1, 10.0, 0), (3, 25.0, 3)],
            vec![(0, 10.0, 0), (2, 10.0, 1)],
            vec![(1, 10.0, 1), (3, 10.0, 2)],
            vec![(2, 10.0, 2), (0, 25.0, 3)],
            vec![],
        ])
    }

    #[test]
    fn single_source_takes_shortest_route() {
        let distances = bounded_distances(&path(), &[0], 100.0);
        assert_eq!(distances[..4], [0.0, 10.0, 20.0, 25.0]);
        assert!(distances[4].is_infinite());
    }

    #[test]
    fn nodes_beyond_limit_stay_unreached() {
        let distances = bounded_distances(&path(), &[0], 15.0);
        assert_eq!(distances[1], 10.0);
        assert!(distances[2].is_infinite());
        assert!(distances[3].is_infinite());
    }

    #[test]
    fn limit_is_inclusive() {
        let distances = bounded_distances(&path(), &[0], 20.0);
        assert_eq!(distances[2], 20.0);
    }

    #[test]
    fn multiple_sources_start_at_zero() {
        let distances = bounded_distances(&path(), &[0, 2], 100.0);
        assert_eq!(distances[..4], [0.0, 10.0, 0.0, 10.0]);
    }

    #[test]
    fn heap_pops_nearest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(NodeDistance { node: 1, distance: 5.0 });
        heap.push(NodeDistance { node: 2, distance: 1.0 });
        heap.push(NodeDistance { node: 0, distance: 1.0 });
        assert_eq!(heap.pop().map(|n| n.node), Some(0));
        assert_eq!(heap.pop().map(|n| n.node), Some(2));
        assert_eq!(heap.pop().map(|n| n.node), Some(1));
    }
}
