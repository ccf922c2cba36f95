use geo::{BoundingRect, MultiPolygon};
use serde::Serialize;

use crate::common::{expand_rect, polygon_distance, union_all, PolygonIndex};
use crate::layers::Park;

/// One park, or several parks merged because they lie close together.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParkUnit {
    #[serde(skip)]
    pub geometry: MultiPolygon<f64>,
    /// Sum of the member areas.
    pub area: f64,
    /// Indices into the park layer, ascending.
    pub members: Vec<usize>,
}

impl ParkUnit {
    /// Lowest member index.
    #[inline] pub fn first_member(&self) -> usize { self.members[0] }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Group the parks at `indices` whose boundaries are within `distance` of
/// each other (transitively). A distance of 0 disables merging.
/// Units are ordered by their lowest member.
pub(crate) fn aggregate_parks(parks: &[Park], indices: &[usize], distance: f64) -> Vec<ParkUnit> {
    let shapes: Vec<MultiPolygon<f64>> = indices.iter().map(|&i| parks[i].geometry.clone()).collect();
    let mut parent: Vec<usize> = (0..shapes.len()).collect();

    if distance > 0.0 {
        let index = PolygonIndex::new(&shapes);
        for (a, shape) in shapes.iter().enumerate() {
            let Some(rect) = shape.bounding_rect() else { continue };
            for b in index.query_rect(expand_rect(rect, distance)) {
                if b <= a { continue }
                let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
                if ra != rb && polygon_distance(shape, &shapes[b]) <= distance {
                    parent[ra.max(rb)] = ra.min(rb);
                }
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); shapes.len()];
    for i in 0..shapes.len() {
        let root = find(&mut parent, i);
        groups[root].push(i);
    }

    groups.into_iter()
        .filter(|group| !group.is_empty())
        .map(|group| {
            let members: Vec<usize> = group.iter().map(|&i| indices[i]).collect();
            let area = members.iter().map(|&i| parks[i].area()).sum();
            let geometry = match group.as_slice() {
                [only] => shapes[*only].clone(),
                _ => union_all(group.iter().map(|&i| shapes[i].clone()).collect()),
            };
            ParkUnit { geometry, area, members }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn park(x: f64, side: f64) -> Park {
        Park::new(MultiPolygon::new(vec![polygon![
            (x: x, y: 0.0), (x: x + side, y: 0.0), (x: x + side, y: side), (x: x, y: side), (x: x, y: 0.0)
        ]]))
    }

    #[test]
    fn close_parks_merge_and_sum_areas() {
        // 0 and 1 are 5 apart, 1 and 2 are 8 apart, 3 is far away.
        let parks = vec![park(0.0, 60.0), park(65.0, 60.0), park(133.0, 60.0), park(1000.0, 60.0)];
        let units = aggregate_parks(&parks, &[0, 1, 2, 3], 10.0);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].members, vec![0, 1, 2]);
        assert_eq!(units[0].area, 3.0 * 3600.0);
        assert_eq!(units[1].members, vec![3]);
        assert_eq!(units[1].first_member(), 3);
    }

    #[test]
    fn zero_distance_keeps_parks_apart() {
        let parks = vec![park(0.0, 10.0), park(10.0, 10.0)];
        let units = aggregate_parks(&parks, &[0, 1], 0.0);
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn only_selected_indices_take_part() {
        let parks = vec![park(0.0, 10.0), park(12.0, 10.0), park(24.0, 10.0)];
        let units = aggregate_parks(&parks, &[0, 2], 5.0);
        assert_eq!(units.iter().map(|u| u.members.clone()).collect::<Vec<_>>(), vec![vec![0], vec![2]]);
    }
}
