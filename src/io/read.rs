use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::io::fields::{self, FieldMap};
use crate::io::raw::{read_layer, RawLayer};
use crate::pipeline::Inputs;

/// Locations of the input layers of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct InputPaths {
    pub roads: PathBuf,
    pub parks: PathBuf,
    pub population: PathBuf,
    pub districts: PathBuf,
    pub study_area: Option<PathBuf>,
}

fn read(path: &Path, layer: &str) -> Result<RawLayer> {
    let raw = read_layer(path)
        .with_context(|| format!("[io::read_inputs] Failed to read the {layer} layer"))?;
    info!("[io] {layer}: {} features from {}", raw.features.len(), path.display());
    Ok(raw)
}

/// Read and type every input layer.
pub fn read_inputs(paths: &InputPaths, fields: &FieldMap) -> Result<Inputs> {
    let roads = fields::roads(read(&paths.roads, "roads")?, "roads", fields)?;
    let parks = fields::parks(read(&paths.parks, "parks")?, "parks", fields)?;
    let population = fields::population(read(&paths.population, "population")?, "population", fields)?;
    let districts = fields::districts(read(&paths.districts, "districts")?, "districts", fields)?;
    let study_area = match &paths.study_area {
        Some(path) => Some(fields::study_area(read(path, "study area")?, "study area")?),
        None => None,
    };
    Ok(Inputs { roads, parks, population, districts, study_area })
}
