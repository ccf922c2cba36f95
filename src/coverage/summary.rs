use serde::Serialize;

use crate::coverage::record::{ratio, CoverageRecord};

/// A unit label with its area coverage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitRatio {
    pub unit: String,
    pub area_ratio: f64,
}

/// Run-level roll-up of a set of coverage records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub units: usize,
    pub units_with_access: usize,
    pub total_population: f64,
    pub accessible_population: f64,
    pub population_ratio: f64,
    pub mean_area_ratio: f64,
    /// Highest area coverage; the first unit wins ties.
    pub best: Option<UnitRatio>,
    /// Lowest area coverage; the first unit wins ties.
    pub worst: Option<UnitRatio>,
}

impl CoverageSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = (&'a str, &'a CoverageRecord)>) -> Self {
        let mut summary = Self::default();
        let mut area_ratios = 0.0;

        for (label, record) in records {
            summary.units += 1;
            summary.units_with_access += record.has_access() as usize;
            summary.total_population += record.total_population;
            summary.accessible_population += record.accessible_population;
            area_ratios += record.area_ratio;

            let candidate = || UnitRatio { unit: label.to_string(), area_ratio: record.area_ratio };
            if summary.best.as_ref().is_none_or(|best| record.area_ratio > best.area_ratio) {
                summary.best = Some(candidate());
            }
            if summary.worst.as_ref().is_none_or(|worst| record.area_ratio < worst.area_ratio) {
                summary.worst = Some(candidate());
            }
        }

        summary.population_ratio = ratio(summary.accessible_population, summary.total_population);
        summary.mean_area_ratio = if summary.units > 0 { area_ratios / summary.units as f64 } else { 0.0 };
        summary
    }
}
