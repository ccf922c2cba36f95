use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::coverage::{DistrictReport, HexReport};
use crate::entrance::EntranceSet;
use crate::graph::Graph;
use crate::hex::HexCell;
use crate::io::csv::{district_table, hex_table, write_csv};
use crate::io::geojson::{feature, feature_collection, linestring_json, multipolygon_json, point_json, write_geojson};
use crate::layers::{District, Layer};
use crate::pipeline::{Inputs, RunOutput};
use crate::service::{ServiceArea, WalkableArea};

/// Properties of a serialisable value.
fn properties<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value).context("[io::write] Failed to serialise properties")? {
        Value::Object(map) => Ok(map),
        other => Ok(Map::from_iter([("value".to_string(), other)])),
    }
}

/// Network edges, with the length of each edge inside the service area.
pub fn graph_edges_geojson(graph: &Graph, service_area: &ServiceArea) -> Value {
    let mut reachable = vec![0.0; graph.edge_count()];
    for span in &service_area.spans {
        reachable[span.edge.index()] += span.length();
    }

    let features = graph.edges().iter()
        .map(|edge| feature(linestring_json(&edge.geometry), Map::from_iter([
            ("id".to_string(), json!(edge.id.0)),
            ("from".to_string(), json!(edge.from.0)),
            ("to".to_string(), json!(edge.to.0)),
            ("length".to_string(), json!(edge.length)),
            ("class".to_string(), json!(edge.class)),
            ("walkable".to_string(), json!(edge.is_walkable())),
            ("road".to_string(), json!(edge.road)),
            ("reachable_length".to_string(), json!(reachable[edge.id.index()])),
        ])))
        .collect();
    feature_collection(features, graph.epsg())
}

pub fn entrances_geojson(entrances: &EntranceSet, epsg: Option<u32>) -> Result<Value> {
    let features = entrances.entrances.iter()
        .map(|entrance| {
            let mut props = properties(entrance)?;
            props.insert("park_members".into(), json!(entrances.parks[entrance.park].members));
            Ok(feature(point_json(entrance.location), props))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(feature_collection(features, epsg))
}

pub fn walkable_area_geojson(area: &WalkableArea, epsg: Option<u32>) -> Value {
    let props = Map::from_iter([
        ("distance_m".to_string(), json!(area.distance())),
        ("area".to_string(), json!(area.area())),
    ]);
    feature_collection(vec![feature(multipolygon_json(area.polygon()), props)], epsg)
}

pub fn districts_geojson(districts: &Layer<District>, report: &DistrictReport) -> Result<Value> {
    let features = districts.iter().zip(&report.districts)
        .map(|(district, coverage)| Ok(feature(multipolygon_json(&district.geometry), properties(coverage)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(feature_collection(features, districts.epsg))
}

/// Clipped hex cells, with their coverage when a report is given.
pub fn hexes_geojson(cells: &[HexCell], report: Option<&HexReport>, epsg: Option<u32>) -> Result<Value> {
    let features = cells.iter().enumerate()
        .map(|(i, cell)| {
            let mut props = match report {
                Some(report) => properties(&report.cells[i])?,
                None => Map::new(),
            };
            props.insert("id".into(), json!(cell.id.to_string()));
            props.insert("col".into(), json!(cell.id.col));
            props.insert("row".into(), json!(cell.id.row));
            props.insert("cell_area".into(), json!(cell.area()));
            props.insert("partial".into(), json!(cell.is_partial()));
            Ok(feature(multipolygon_json(&cell.geometry), props))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(feature_collection(features, epsg))
}

/// Pretty-printed JSON.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::write_json] Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("[io::write_json] Failed to write {}", path.display()))
}

/// Write every product of a run into `dir`.
pub fn write_outputs(output: &RunOutput, inputs: &Inputs, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("[io::write_outputs] Failed to create {}", dir.display()))?;
    let epsg = output.graph.epsg();

    write_geojson(&graph_edges_geojson(&output.graph, &output.service_area), &dir.join("graph_edges.geojson"))?;
    write_geojson(&entrances_geojson(&output.entrances, epsg)?, &dir.join("entrances.geojson"))?;
    write_geojson(&walkable_area_geojson(&output.service_area.area, epsg), &dir.join("walkable_area.geojson"))?;
    write_geojson(&districts_geojson(&inputs.districts, &output.districts)?, &dir.join("districts.geojson"))?;
    write_csv(&mut district_table(&output.districts)?, &dir.join("districts.csv"))?;
    write_geojson(&hexes_geojson(&output.hexes, Some(&output.hex_report), epsg)?, &dir.join("hexes.geojson"))?;
    write_csv(&mut hex_table(&output.hex_report)?, &dir.join("hexes.csv"))?;
    write_json(&output.summary(), &dir.join("summary.json"))?;

    info!("[io] outputs written to {}", dir.display());
    Ok(())
}

/// Write a bare tessellation to `path`.
pub fn write_hexgrid(cells: &[HexCell], epsg: Option<u32>, path: &Path) -> Result<()> {
    write_geojson(&hexes_geojson(cells, None, epsg)?, path)
}
