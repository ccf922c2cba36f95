use ahash::AHashMap;
use geo::{Area, MultiPolygon};
use rayon::prelude::*;

use crate::common::PolygonIndex;
use crate::coverage::record::{ratio, CoverageRecord, GroupCoverage};
use crate::layers::PopulationPoint;
use crate::service::WalkableArea;

/// Where each population point falls: its unit (lowest index on shared
/// borders) and whether it lies in the walkable area.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PointOverlay {
    pub(crate) unit: Vec<Option<usize>>,
    pub(crate) accessible: Vec<bool>,
}

impl PointOverlay {
    pub(crate) fn new(units: &[MultiPolygon<f64>], points: &[PopulationPoint], area: &WalkableArea) -> Self {
        let index = PolygonIndex::new(units);
        let (unit, accessible) = points.par_iter()
            .map(|point| (index.locate(units, point.location), area.covers(point.location)))
            .unzip();
        Self { unit, accessible }
    }

    /// Population of points outside every unit.
    pub(crate) fn unassigned_population(&self, points: &[PopulationPoint]) -> f64 {
        self.unit.iter().zip(points)
            .filter(|(unit, _)| unit.is_none())
            .map(|(_, point)| point.population)
            .sum()
    }
}

/// Group names in order of first appearance.
pub(crate) fn group_names(points: &[PopulationPoint]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (name, _) in points.iter().flat_map(|point| point.groups.iter()) {
        if !names.contains(name) { names.push(name.clone()) }
    }
    names
}

#[derive(Clone, Debug, Default)]
struct Tally {
    population: f64,
    accessible: f64,
    with_access: usize,
    without_access: usize,
    groups: Vec<(f64, f64)>,
}

/// One coverage record per unit.
pub(crate) fn build_records(units: &[MultiPolygon<f64>], points: &[PopulationPoint],
    overlay: &PointOverlay, area: &WalkableArea,
) -> Vec<CoverageRecord> {
    let names = group_names(points);
    let slots: AHashMap<&str, usize> = names.iter().enumerate().map(|(i, name)| (name.as_str(), i)).collect();

    let mut tallies = vec![Tally { groups: vec![(0.0, 0.0); names.len()], ..Default::default() }; units.len()];
    for ((point, unit), &accessible) in points.iter().zip(&overlay.unit).zip(&overlay.accessible) {
        let Some(unit) = *unit else { continue };
        let tally = &mut tallies[unit];
        tally.population += point.population;
        if accessible {
            tally.accessible += point.population;
            tally.with_access += 1;
        } else {
            tally.without_access += 1;
        }
        for (name, value) in &point.groups {
            if let Some(&slot) = slots.get(name.as_str()) {
                tally.groups[slot].0 += value;
                if accessible { tally.groups[slot].1 += value }
            }
        }
    }

    let areas: Vec<(f64, f64)> = units.par_iter()
        .map(|unit| (unit.unsigned_area(), area.clipped_area(unit)))
        .collect();

    tallies.into_iter().zip(areas)
        .map(|(tally, (total_area, accessible_area))| CoverageRecord {
            total_population: tally.population,
            accessible_population: tally.accessible,
            population_ratio: ratio(tally.accessible, tally.population),
            total_area,
            accessible_area,
            area_ratio: ratio(accessible_area, total_area),
            points_with_access: tally.with_access,
            points_without_access: tally.without_access,
            groups: names.iter().zip(tally.groups)
                .map(|(name, (total, accessible))| GroupCoverage {
                    name: name.clone(),
                    total,
                    accessible,
                    ratio: ratio(accessible, total),
                })
                .collect(),
        })
        .collect()
}
