use geo::MultiPolygon;
use log::info;
use serde::Serialize;

use crate::coverage::overlay::{build_records, PointOverlay};
use crate::coverage::{CoverageRecord, CoverageSummary};
use crate::error::{Diagnostics, Stage};
use crate::layers::{District, Layer, PopulationPoint};
use crate::service::WalkableArea;

/// Coverage of one district.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistrictCoverage {
    pub id: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub record: CoverageRecord,
    pub has_access: bool,
}

/// Per-district coverage plus run totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistrictReport {
    pub districts: Vec<DistrictCoverage>,
    pub summary: CoverageSummary,
    /// Population of points outside every district.
    pub unassigned_population: f64,
}

/// Aggregates population and area coverage per administrative district.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistrictAggregator;

impl DistrictAggregator {
    pub fn new() -> Self { Self }

    pub fn aggregate(&self, districts: &Layer<District>, area: &WalkableArea,
        population: &Layer<PopulationPoint>, diagnostics: &mut Diagnostics,
    ) -> DistrictReport {
        let shapes: Vec<MultiPolygon<f64>> = districts.iter().map(|district| district.geometry.clone()).collect();
        let overlay = PointOverlay::new(&shapes, &population.features, area);
        let records = build_records(&shapes, &population.features, &overlay, area);

        let coverage: Vec<DistrictCoverage> = districts.iter().zip(records)
            .map(|(district, record)| {
                if record.total_population <= 0.0 {
                    diagnostics.warn(Stage::DistrictAggregation, format!("district {}", district.id), "no population");
                }
                DistrictCoverage {
                    id: district.id.clone(),
                    name: district.name.clone(),
                    has_access: record.has_access(),
                    record,
                }
            })
            .collect();

        let summary = CoverageSummary::from_records(
            districts.iter().zip(&coverage).map(|(district, c)| (district.label(), &c.record))
        );
        let unassigned_population = overlay.unassigned_population(&population.features);
        info!(
            "[districts] {} districts, {:.0} of {:.0} people within {} of a park",
            coverage.len(), summary.accessible_population, summary.total_population, area.distance()
        );
        DistrictReport { districts: coverage, summary, unassigned_population }
    }
}
