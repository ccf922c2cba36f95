use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// How road polylines are connected to each other when the graph is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Lines connect only at their end points; each line is one edge.
    #[default]
    Endpoint,
    /// Lines connect at every vertex; each vertex-to-vertex segment is one edge.
    AnyVertex,
}

/// Run configuration. All distances and areas are in units of the input
/// coordinate system (metres / square metres for a projected CRS).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    /// Maximum walking distance from an entrance.
    pub walk_distance_threshold: f64,
    /// Minimum park area taking part in entrance generation.
    pub min_park_area: f64,
    /// Maximum distance between a boundary sample and the nearest edge.
    pub entrance_snap_distance: f64,
    /// Edge length of the hexagonal cells.
    pub hex_edge_length: f64,
    /// Road classes dropped before the graph is built (case-insensitive).
    pub excluded_road_classes: Vec<String>,

    /// Distance under which two line end points become one node.
    pub node_snap_tolerance: f64,
    pub connectivity: Connectivity,
    /// Spacing of the entrance candidates along park boundaries.
    pub entrance_sample_interval: f64,
    /// Parks closer than this are merged before the area filter; 0 disables.
    pub park_aggregation_distance: f64,
    /// Generate entrances for parks below `min_park_area` as well.
    pub include_small_parks: bool,
    /// Half-width of the corridor drawn around reachable edges.
    pub corridor_buffer: f64,
    /// Vertices per quarter circle in corridor end caps.
    pub arc_segments: usize,
    /// Percentage above which a hex cell is flagged as covered.
    pub hex_ratio_threshold: Option<f64>,
    /// When set, every layer that declares an EPSG code must match it.
    pub expected_epsg: Option<u32>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            walk_distance_threshold: 400.0,
            min_park_area: 10_000.0,
            entrance_snap_distance: 25.0,
            hex_edge_length: 250.0,
            excluded_road_classes: vec!["motorway".into(), "motorway_link".into(), "highway".into()],
            node_snap_tolerance: 0.5,
            connectivity: Connectivity::Endpoint,
            entrance_sample_interval: 50.0,
            park_aggregation_distance: 10.0,
            include_small_parks: false,
            corridor_buffer: 100.0,
            arc_segments: 8,
            hex_ratio_threshold: None,
            expected_epsg: None,
        }
    }
}

impl AccessConfig {
    /// Parse a configuration from a JSON string; missing fields take their defaults.
    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("[config] Failed to parse configuration JSON")
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        Self::from_json_str(&data)
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), AccessError> {
        fn check(ok: bool, msg: String) -> Result<(), AccessError> {
            if ok { Ok(()) } else { Err(AccessError::InvalidConfig(msg)) }
        }

        let positive = [
            ("walk_distance_threshold", self.walk_distance_threshold),
            ("hex_edge_length", self.hex_edge_length),
            ("entrance_sample_interval", self.entrance_sample_interval),
            ("corridor_buffer", self.corridor_buffer),
        ];
        for (name, value) in positive {
            check(value.is_finite() && value > 0.0, format!("{name} must be a positive number, got {value}"))?;
        }

        let non_negative = [
            ("min_park_area", self.min_park_area),
            ("entrance_snap_distance", self.entrance_snap_distance),
            ("node_snap_tolerance", self.node_snap_tolerance),
            ("park_aggregation_distance", self.park_aggregation_distance),
        ];
        for (name, value) in non_negative {
            check(value.is_finite() && value >= 0.0, format!("{name} must be a non-negative number, got {value}"))?;
        }

        check(
            (1..=64).contains(&self.arc_segments),
            format!("arc_segments must be between 1 and 64, got {}", self.arc_segments),
        )?;

        if let Some(threshold) = self.hex_ratio_threshold {
            check(
                threshold.is_finite() && (0.0..=100.0).contains(&threshold),
                format!("hex_ratio_threshold must be a percentage in [0, 100], got {threshold}"),
            )?;
        }

        check(
            self.excluded_road_classes.iter().all(|class| !class.trim().is_empty()),
            "excluded_road_classes must not contain empty class names".to_string(),
        )
    }
}

/// Edge length of a regular hexagon with the given area in hectares.
pub fn hex_edge_from_hectares(hectares: f64) -> f64 {
    (2.0 * hectares * 10_000.0 / (3.0 * 3f64.sqrt())).sqrt()
}
