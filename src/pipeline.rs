use geo::MultiPolygon;
use log::{info, warn};
use serde::Serialize;

use crate::common::union_all;
use crate::config::AccessConfig;
use crate::coverage::{CoverageSummary, DistrictAggregator, DistrictReport, HexAggregator, HexReport};
use crate::entrance::{EntranceGenerator, EntranceSet};
use crate::error::{AccessError, Diagnostics, FeatureIssue, EmptyResultWarning, PipelineError, Stage};
use crate::graph::{BuildReport, Graph, NetworkGraphBuilder};
use crate::hex::{HexCell, HexGridGenerator};
use crate::layers::{District, Layer, Park, PopulationPoint, RoadFeature};
use crate::service::{ServiceArea, ServiceAreaSolver};

/// All input layers of a run, in one projected coordinate system.
#[derive(Clone, Debug)]
pub struct Inputs {
    pub roads: Layer<RoadFeature>,
    pub parks: Layer<Park>,
    pub population: Layer<PopulationPoint>,
    pub districts: Layer<District>,
    /// Defaults to the dissolved districts.
    pub study_area: Option<Layer<MultiPolygon<f64>>>,
}

impl Inputs {
    /// `(layer name, declared EPSG)` of every layer that declares one.
    fn declared_epsg(&self) -> Vec<(&str, u32)> {
        let mut declared = vec![
            (self.roads.name.as_str(), self.roads.epsg),
            (self.parks.name.as_str(), self.parks.epsg),
            (self.population.name.as_str(), self.population.epsg),
            (self.districts.name.as_str(), self.districts.epsg),
        ];
        if let Some(study_area) = &self.study_area {
            declared.push((study_area.name.as_str(), study_area.epsg));
        }
        declared.into_iter().filter_map(|(name, epsg)| epsg.map(|epsg| (name, epsg))).collect()
    }

    /// Features dropped while the layers were read.
    fn skipped(&self) -> impl Iterator<Item = &FeatureIssue> {
        self.roads.skipped.iter()
            .chain(&self.parks.skipped)
            .chain(&self.population.skipped)
            .chain(&self.districts.skipped)
            .chain(self.study_area.iter().flat_map(|layer| &layer.skipped))
    }
}

/// Everything derived by one run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    /// The network after entrance snapping.
    pub graph: Graph,
    pub build_report: BuildReport,
    pub entrances: EntranceSet,
    pub service_area: ServiceArea,
    pub districts: DistrictReport,
    pub study_area: MultiPolygon<f64>,
    pub hexes: Vec<HexCell>,
    pub hex_report: HexReport,
    pub diagnostics: Diagnostics,
}

/// Compact, serialisable account of a run.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub walk_distance_threshold: f64,
    pub epsg: Option<u32>,
    pub network: BuildReport,
    pub parks: usize,
    pub qualifying_parks: usize,
    pub entrance_candidates: usize,
    pub entrances: usize,
    pub reachable_length: f64,
    pub walkable_area: f64,
    pub districts: CoverageSummary,
    pub unassigned_population: f64,
    pub hex_cells: usize,
    pub hexes: CoverageSummary,
    pub invalid_features: Vec<FeatureIssue>,
    pub warnings: Vec<EmptyResultWarning>,
}

impl RunOutput {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            walk_distance_threshold: self.service_area.area.distance(),
            epsg: self.graph.epsg(),
            network: self.build_report.clone(),
            parks: self.entrances.parks.len(),
            qualifying_parks: self.entrances.qualifying.len(),
            entrance_candidates: self.entrances.candidates.len(),
            entrances: self.entrances.entrances.len(),
            reachable_length: self.service_area.reachable_length(),
            walkable_area: self.service_area.area.area(),
            districts: self.districts.summary.clone(),
            unassigned_population: self.districts.unassigned_population,
            hex_cells: self.hexes.len(),
            hexes: self.hex_report.summary.clone(),
            invalid_features: self.diagnostics.invalid_features.clone(),
            warnings: self.diagnostics.warnings.clone(),
        }
    }
}

/// Drives the six stages in order. A failing stage aborts the run.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: AccessConfig,
}

impl Pipeline {
    /// Validate the configuration; nothing runs with an invalid one.
    pub fn new(config: AccessConfig) -> Result<Self, PipelineError> {
        config.validate().map_err(|err| PipelineError::new(Stage::Setup, err))?;
        Ok(Self { config })
    }

    #[inline] pub fn config(&self) -> &AccessConfig { &self.config }

    /// All declared EPSG codes must agree with each other and with
    /// `expected_epsg` when configured. Layers without a code are not checked.
    pub fn check_coordinate_systems(&self, inputs: &Inputs) -> Result<(), PipelineError> {
        let declared = inputs.declared_epsg();
        let Some(expected) = self.config.expected_epsg.or(declared.first().map(|&(_, epsg)| epsg)) else {
            warn!("[setup] no input layer declares a coordinate system");
            return Ok(());
        };

        for (layer, found) in declared {
            if found != expected {
                return Err(PipelineError::new(Stage::Setup, AccessError::CoordinateSystemMismatch {
                    layer: layer.to_string(),
                    expected,
                    found,
                }));
            }
        }
        Ok(())
    }

    pub fn run(&self, inputs: &Inputs) -> Result<RunOutput, PipelineError> {
        self.check_coordinate_systems(inputs)?;
        let mut diagnostics = Diagnostics::new();
        diagnostics.invalid_features.extend(inputs.skipped().cloned());

        info!("[network] building graph from {} road features", inputs.roads.len());
        let (mut graph, build_report) = NetworkGraphBuilder::from_config(&self.config)
            .build(&inputs.roads, &mut diagnostics);

        info!("[entrances] generating entrances for {} parks", inputs.parks.len());
        let entrances = EntranceGenerator::from_config(&self.config)
            .generate(&inputs.parks, &mut graph, &mut diagnostics);

        info!("[service_area] solving within {}", self.config.walk_distance_threshold);
        let service_area = ServiceAreaSolver::from_config(&self.config)
            .solve(&graph, &entrances.nodes(), &mut diagnostics)
            .map_err(|err| PipelineError::new(Stage::ServiceArea, err))?;

        info!("[districts] aggregating {} districts", inputs.districts.len());
        let districts = DistrictAggregator::new()
            .aggregate(&inputs.districts, &service_area.area, &inputs.population, &mut diagnostics);

        let study_area = match &inputs.study_area {
            Some(layer) => layer.dissolve(),
            None => union_all(inputs.districts.iter().map(|district| district.geometry.clone()).collect()),
        };
        if study_area.0.is_empty() {
            diagnostics.warn(Stage::HexGeneration, "study area", "empty study area, no cells generated");
        }
        let hexes = HexGridGenerator::from_config(&self.config).generate(&study_area);

        let hex_report = HexAggregator::from_config(&self.config)
            .aggregate(&hexes, &service_area.area, &inputs.population, &entrances, &mut diagnostics);

        info!(
            "[pipeline] done: {} invalid features, {} warnings",
            diagnostics.invalid_features.len(), diagnostics.warnings.len()
        );
        Ok(RunOutput {
            graph,
            build_report,
            entrances,
            service_area,
            districts,
            study_area,
            hexes,
            hex_report,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Inputs {
        Inputs {
            roads: Layer::new("roads", vec![]),
            parks: Layer::new("parks", vec![]),
            population: Layer::new("population", vec![]),
            districts: Layer::new("districts", vec![]),
            study_area: None,
        }
    }

    #[test]
    fn invalid_config_fails_at_setup() {
        let config = AccessConfig { hex_edge_length: 0.0, ..Default::default() };
        let err = Pipeline::new(config).unwrap_err();
        assert_eq!(err.stage, Stage::Setup);
        assert!(matches!(err.source, AccessError::InvalidConfig(_)));
    }

    #[test]
    fn mismatched_layers_fail_before_any_stage() {
        let mut inputs = inputs();
        inputs.roads.epsg = Some(5514);
        inputs.parks.epsg = Some(4326);
        let err = Pipeline::new(AccessConfig::default()).unwrap().run(&inputs).unwrap_err();
        assert_eq!(err.stage, Stage::Setup);
        assert_eq!(err.source, AccessError::CoordinateSystemMismatch {
            layer: "parks".into(),
            expected: 5514,
            found: 4326,
        });
    }

    #[test]
    fn expected_epsg_is_enforced() {
        let mut inputs = inputs();
        inputs.roads.epsg = Some(3035);
        let config = AccessConfig { expected_epsg: Some(5514), ..Default::default() };
        let pipeline = Pipeline::new(config).unwrap();
        assert!(pipeline.check_coordinate_systems(&inputs).is_err());
    }

    #[test]
    fn undeclared_layers_pass() {
        let pipeline = Pipeline::new(AccessConfig::default()).unwrap();
        assert!(pipeline.check_coordinate_systems(&inputs()).is_ok());
    }

    #[test]
    fn empty_inputs_run_with_warnings() {
        let output = Pipeline::new(AccessConfig::default()).unwrap().run(&inputs()).unwrap();
        assert!(output.service_area.area.is_empty());
        assert!(output.hexes.is_empty());
        assert_eq!(output.diagnostics.warning_count(Stage::ServiceArea), 1);
        assert_eq!(output.summary().entrances, 0);
    }
}
