use std::f64::consts::{FRAC_PI_2, PI};

use geo::{Coord, Intersects, LineString, MultiPolygon, Polygon};

/// Tolerance for treating two measures along a line as equal.
pub(crate) const EPSILON: f64 = 1e-9;

#[inline]
pub(crate) fn is_finite(c: Coord<f64>) -> bool { c.x.is_finite() && c.y.is_finite() }

#[inline]
pub(crate) fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 { (a.x - b.x).hypot(a.y - b.y) }

/// Sum of segment lengths.
pub(crate) fn polyline_length(coords: &[Coord<f64>]) -> f64 {
    coords.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Closest point to `p` on segment `ab`, with its parameter `t` in [0, 1]
/// and the distance from `p`.
pub(crate) fn project_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> (Coord<f64>, f64, f64) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let q = Coord { x: a.x + t * dx, y: a.y + t * dy };
    (q, t, distance(p, q))
}

#[inline]
pub(crate) fn segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    project_on_segment(p, a, b).2
}

/// Interpolated point at distance `at` along the polyline (clamped to its ends).
pub(crate) fn point_at(coords: &[Coord<f64>], at: f64) -> Coord<f64> {
    let Some(&first) = coords.first() else { return Coord { x: f64::NAN, y: f64::NAN } };
    if at <= 0.0 { return first }

    let mut walked = 0.0;
    for w in coords.windows(2) {
        let len = distance(w[0], w[1]);
        if walked + len >= at && len > 0.0 {
            let t = (at - walked) / len;
            return Coord { x: w[0].x + t * (w[1].x - w[0].x), y: w[0].y + t * (w[1].y - w[0].y) };
        }
        walked += len;
    }
    coords[coords.len() - 1]
}

/// The part of the polyline between distances `start` and `end` (start ≤ end).
pub(crate) fn substring(coords: &[Coord<f64>], start: f64, end: f64) -> Vec<Coord<f64>> {
    let mut out = vec![point_at(coords, start)];
    let mut walked = 0.0;
    for w in coords.windows(2) {
        walked += distance(w[0], w[1]);
        if walked > start + EPSILON && walked < end - EPSILON {
            out.push(w[1]);
        }
    }
    let last = point_at(coords, end);
    if out.last() != Some(&last) || out.len() == 1 {
        out.push(last);
    }
    out
}

/// Split a polyline in two at distance `at`.
pub(crate) fn split_at(coords: &[Coord<f64>], at: f64) -> (Vec<Coord<f64>>, Vec<Coord<f64>>) {
    let length = polyline_length(coords);
    (substring(coords, 0.0, at), substring(coords, at, length))
}

/// Points every `interval` along a ring, starting at its first vertex. The
/// closing point of the ring is not repeated.
pub(crate) fn sample_ring(ring: &LineString<f64>, interval: f64) -> Vec<Coord<f64>> {
    let coords = &ring.0;
    let length = polyline_length(coords);
    if coords.is_empty() || !(length > 0.0) || !(interval > 0.0) {
        return coords.first().copied().into_iter().collect();
    }

    let mut samples = Vec::new();
    let mut at = 0.0;
    while at < length - EPSILON {
        samples.push(point_at(coords, at));
        at += interval;
    }

    // Open rings get their far end point as well.
    let end = coords[coords.len() - 1];
    if samples.iter().all(|&s| distance(s, end) > EPSILON) {
        samples.push(end);
    }
    samples
}

/// Stadium-shaped polygon of radius `radius` around segment `ab`, with
/// `arc_segments` vertices per quarter circle. `round` selects a half-circle
/// cap at `a` and `b` respectively; a flat cap ends exactly at the point.
/// Counter-clockwise.
pub(crate) fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64, arc_segments: usize, round: [bool; 2]) -> Polygon<f64> {
    let steps = 2 * arc_segments.max(1);
    let len = distance(a, b);
    let mut ring = Vec::with_capacity(2 * steps + 3);

    if len <= EPSILON {
        for i in 0..2 * steps {
            let angle = PI * i as f64 / steps as f64;
            ring.push(Coord { x: a.x + radius * angle.cos(), y: a.y + radius * angle.sin() });
        }
    } else {
        let heading = (b.y - a.y).atan2(b.x - a.x);
        for (center, from, round) in [(b, heading - FRAC_PI_2, round[1]), (a, heading + FRAC_PI_2, round[0])] {
            let arc = if round { steps } else { 1 };
            for i in 0..=arc {
                let angle = from + PI * i as f64 / arc as f64;
                ring.push(Coord { x: center.x + radius * angle.cos(), y: center.y + radius * angle.sin() });
            }
        }
    }
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), vec![])
}

/// Distance between two segments.
fn segment_segment_distance(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> f64 {
    if geo::Line::new(a, b).intersects(&geo::Line::new(c, d)) {
        return 0.0;
    }
    segment_distance(a, c, d)
        .min(segment_distance(b, c, d))
        .min(segment_distance(c, a, b))
        .min(segment_distance(d, a, b))
}

fn rings(mp: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    mp.0.iter().flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
}

/// Planar distance between two multipolygons; 0 when they intersect.
pub(crate) fn polygon_distance(lhs: &MultiPolygon<f64>, rhs: &MultiPolygon<f64>) -> f64 {
    if lhs.intersects(rhs) { return 0.0 }

    let mut best = f64::INFINITY;
    for r1 in rings(lhs) {
        for s1 in r1.0.windows(2) {
            for r2 in rings(rhs) {
                for s2 in r2.0.windows(2) {
                    best = best.min(segment_segment_distance(s1[0], s1[1], s2[0], s2[1]));
                }
            }
        }
    }
    best
}
