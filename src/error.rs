use std::fmt;

use log::warn;
use serde::Serialize;

/// The pipeline stage an error or warning originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    NetworkBuild,
    EntranceGeneration,
    ServiceArea,
    DistrictAggregation,
    HexGeneration,
    HexAggregation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::NetworkBuild => "network",
            Stage::EntranceGeneration => "entrances",
            Stage::ServiceArea => "service_area",
            Stage::DistrictAggregation => "districts",
            Stage::HexGeneration => "hexgrid",
            Stage::HexAggregation => "hex_coverage",
        };
        write!(f, "{name}")
    }
}

/// Errors raised by the accessibility stages.
///
/// `InvalidGeometry` is recoverable: the offending feature is skipped and
/// recorded in [`Diagnostics`]. Every other variant aborts the run.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessError {
    /// A degenerate input feature (empty, non-finite, zero-length).
    InvalidGeometry { layer: String, feature: usize, reason: String },
    /// A traversal source that is not a connected node of the graph.
    EntranceNotOnGraph { node: u32 },
    /// Two input layers declare different coordinate systems.
    CoordinateSystemMismatch { layer: String, expected: u32, found: u32 },
    /// A configuration value outside its valid range.
    InvalidConfig(String),
    /// A required attribute is absent from an input layer.
    MissingAttribute { layer: String, field: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::InvalidGeometry { layer, feature, reason } => {
                write!(f, "Invalid geometry in {layer} feature {feature}: {reason}")
            }
            AccessError::EntranceNotOnGraph { node } => {
                write!(f, "Entrance node {node} is not a connected node of the graph")
            }
            AccessError::CoordinateSystemMismatch { layer, expected, found } => write!(
                f,
                "Coordinate system mismatch: layer '{layer}' is EPSG:{found}, expected EPSG:{expected}"
            ),
            AccessError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            AccessError::MissingAttribute { layer, field } => {
                write!(f, "Missing required attribute '{field}' in layer '{layer}'")
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// A fatal error, tagged with the stage that failed.
#[derive(Debug)]
pub struct PipelineError {
    pub stage: Stage,
    pub source: AccessError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: AccessError) -> Self {
        Self { stage, source }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.source)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A feature skipped because of an [`AccessError::InvalidGeometry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureIssue {
    pub stage: Stage,
    pub layer: String,
    pub feature: usize,
    pub reason: String,
}

/// A unit (park, district, cell, service area) that produced an empty result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyResultWarning {
    pub stage: Stage,
    pub subject: String,
    pub reason: String,
}

/// Run-level collection of recoverable issues.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub invalid_features: Vec<FeatureIssue>,
    pub warnings: Vec<EmptyResultWarning>,
}

impl Diagnostics {
    pub fn new() -> Self { Self::default() }

    /// Record a skipped feature. Errors other than `InvalidGeometry` are not
    /// recoverable and are ignored here.
    pub fn record(&mut self, stage: Stage, error: AccessError) {
        if let AccessError::InvalidGeometry { layer, feature, reason } = error {
            warn!("[{stage}] skipping {layer} feature {feature}: {reason}");
            self.invalid_features.push(FeatureIssue { stage, layer, feature, reason });
        }
    }

    /// Record an empty-result warning.
    pub fn warn(&mut self, stage: Stage, subject: impl Into<String>, reason: impl Into<String>) {
        self.warnings.push(EmptyResultWarning {
            stage,
            subject: subject.into(),
            reason: reason.into(),
        });
    }

    /// Number of features skipped during `stage`.
    pub fn invalid_count(&self, stage: Stage) -> usize {
        self.invalid_features.iter().filter(|issue| issue.stage == stage).count()
    }

    /// Number of empty-result warnings raised during `stage`.
    pub fn warning_count(&self, stage: Stage) -> usize {
        self.warnings.iter().filter(|warning| warning.stage == stage).count()
    }

    #[inline] pub fn is_clean(&self) -> bool { self.invalid_features.is_empty() && self.warnings.is_empty() }
}
