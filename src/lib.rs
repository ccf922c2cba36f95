#![doc = "Walking-distance accessibility of urban green spaces"]
mod common;
mod config;
mod coverage;
mod entrance;
mod error;
mod graph;
mod hex;
mod layers;
mod pipeline;
mod service;

pub mod io;

#[doc(inline)]
pub use config::{hex_edge_from_hectares, AccessConfig, Connectivity};

#[doc(inline)]
pub use error::{AccessError, Diagnostics, EmptyResultWarning, FeatureIssue, PipelineError, Stage};

#[doc(inline)]
pub use layers::{Attributes, District, Layer, Park, PopulationPoint, RoadFeature};

#[doc(inline)]
pub use graph::{BuildReport, Edge, EdgeHit, EdgeId, Graph, NetworkGraphBuilder, NodeId, SegmentIndex};

#[doc(inline)]
pub use entrance::{Candidate, EntranceGenerator, EntrancePoint, EntranceSet, ParkUnit};

#[doc(inline)]
pub use service::{ReachableSpan, ServiceArea, ServiceAreaSolver, WalkableArea};

#[doc(inline)]
pub use hex::{HexCell, HexGridGenerator, HexId};

#[doc(inline)]
pub use coverage::{
    CoverageRecord, CoverageSummary, DistrictAggregator, DistrictCoverage, DistrictReport,
    GroupCoverage, HexAggregator, HexCoverage, HexReport, UnitRatio,
};

#[doc(inline)]
pub use pipeline::{Inputs, Pipeline, RunOutput, RunSummary};
