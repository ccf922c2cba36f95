use geo::{BoundingRect, Intersects, MultiPolygon};
use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::common::PolygonIndex;
use crate::config::AccessConfig;
use crate::coverage::overlay::{build_records, PointOverlay};
use crate::coverage::{CoverageRecord, CoverageSummary};
use crate::entrance::EntranceSet;
use crate::error::{Diagnostics, Stage};
use crate::hex::{HexCell, HexId};
use crate::layers::{Layer, PopulationPoint};
use crate::service::WalkableArea;

/// Coverage of one hex cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HexCoverage {
    pub id: HexId,
    #[serde(flatten)]
    pub record: CoverageRecord,
    /// Entrances of parks intersecting the cell.
    pub park_entrances: usize,
    /// `None` when no ratio threshold is configured.
    pub above_threshold: Option<bool>,
}

/// Per-cell coverage plus run totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HexReport {
    pub cells: Vec<HexCoverage>,
    pub summary: CoverageSummary,
}

/// Aggregates coverage per hex cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct HexAggregator {
    ratio_threshold: Option<f64>,
}

impl HexAggregator {
    /// `ratio_threshold` is a percentage of accessible population.
    pub fn new(ratio_threshold: Option<f64>) -> Self { Self { ratio_threshold } }

    pub fn from_config(config: &AccessConfig) -> Self { Self::new(config.hex_ratio_threshold) }

    /// Number of entrances of the parks intersecting each cell.
    fn park_entrances(cells: &[HexCell], entrances: &EntranceSet) -> Vec<usize> {
        let mut per_park = vec![0usize; entrances.parks.len()];
        for entrance in &entrances.entrances {
            per_park[entrance.park] += 1;
        }
        let shapes: Vec<MultiPolygon<f64>> = entrances.parks.iter().map(|park| park.geometry.clone()).collect();
        let index = PolygonIndex::new(&shapes);

        cells.par_iter()
            .map(|cell| {
                let Some(rect) = cell.geometry.bounding_rect() else { return 0 };
                index.query_rect(rect).into_iter()
                    .filter(|&park| per_park[park] > 0 && shapes[park].intersects(&cell.geometry))
                    .map(|park| per_park[park])
                    .sum()
            })
            .collect()
    }

    pub fn aggregate(&self, cells: &[HexCell], area: &WalkableArea, population: &Layer<PopulationPoint>,
        entrances: &EntranceSet, diagnostics: &mut Diagnostics,
    ) -> HexReport {
        let shapes: Vec<MultiPolygon<f64>> = cells.iter().map(|cell| cell.geometry.clone()).collect();
        let overlay = PointOverlay::new(&shapes, &population.features, area);
        let records = build_records(&shapes, &population.features, &overlay, area);
        let park_entrances = Self::park_entrances(cells, entrances);

        let coverage: Vec<HexCoverage> = cells.iter().zip(records).zip(park_entrances)
            .map(|((cell, record), park_entrances)| {
                if record.total_population <= 0.0 {
                    diagnostics.warn(Stage::HexAggregation, format!("hex {}", cell.id), "no population");
                }
                HexCoverage {
                    id: cell.id,
                    above_threshold: self.ratio_threshold.map(|threshold| record.population_percent() >= threshold),
                    record,
                    park_entrances,
                }
            })
            .collect();

        let labels: Vec<String> = cells.iter().map(|cell| cell.id.to_string()).collect();
        let summary = CoverageSummary::from_records(labels.iter().map(String::as_str).zip(coverage.iter().map(|c| &c.record)));
        info!(
            "[hex_coverage] {} cells, {:.0} of {:.0} people within {} of a park",
            coverage.len(), summary.accessible_population, summary.total_population, area.distance()
        );
        HexReport { cells: coverage, summary }
    }
}
