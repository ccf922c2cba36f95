use geo::MultiPolygon;
use rayon::prelude::*;
use serde::Serialize;

use crate::common::{capsule, substring, EPSILON};
use crate::graph::{EdgeId, Graph};

/// A reachable stretch of an edge, measured from the edge's `from` node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ReachableSpan {
    pub edge: EdgeId,
    pub start: f64,
    pub end: f64,
}

impl ReachableSpan {
    #[inline] pub fn length(&self) -> f64 { self.end - self.start }
}

/// Reachable spans of every walkable edge, given node distances and threshold.
pub(crate) fn reachable_spans(graph: &Graph, distances: &[f64], threshold: f64) -> Vec<ReachableSpan> {
    let reach = |d: f64, len: f64| if d.is_finite() { (threshold - d).clamp(0.0, len) } else { 0.0 };

    let mut spans = Vec::new();
    for edge in graph.edges().iter().filter(|edge| edge.is_walkable()) {
        let len = edge.length;
        let from = reach(distances[edge.from.index()], len);
        let to = reach(distances[edge.to.index()], len);

        if from + to >= len - EPSILON {
            if from > 0.0 || to > 0.0 {
                spans.push(ReachableSpan { edge: edge.id, start: 0.0, end: len });
            }
            continue;
        }
        if from > 0.0 {
            spans.push(ReachableSpan { edge: edge.id, start: 0.0, end: from });
        }
        if to > 0.0 {
            spans.push(ReachableSpan { edge: edge.id, start: len - to, end: len });
        }
    }
    spans
}

/// Corridor polygons around each span: one capsule of radius `buffer` per
/// span segment, in span order. Span ends at a node get round caps; ends cut
/// off inside an edge get flat caps so the corridor stops at the reach point.
pub(crate) fn corridor_polygons(graph: &Graph, spans: &[ReachableSpan], buffer: f64, arc_segments: usize) -> Vec<MultiPolygon<f64>> {
    spans.par_iter()
        .flat_map_iter(|span| {
            let Some(edge) = graph.edge(span.edge) else { return Vec::new() };
            let coords = substring(&edge.geometry.0, span.start, span.end);
            let cut_start = span.start > EPSILON;
            let cut_end = span.end < edge.length - EPSILON;
            let last = coords.len().saturating_sub(2);
            let capsules: Vec<MultiPolygon<f64>> = coords.windows(2).enumerate()
                .map(|(i, w)| {
                    let round = [!(cut_start && i == 0), !(cut_end && i == last)];
                    MultiPolygon::new(vec![capsule(w[0], w[1], buffer, arc_segments, round)])
                })
                .collect();
            capsules
        })
        .collect()
}
