use anyhow::{Context, Result};
use log::{info, warn};
use parkaccess::io::{read_inputs, write_outputs, FieldMap, InputPaths};
use parkaccess::{AccessConfig, Pipeline};

/// File configuration, then command-line overrides.
fn load_config(args: &crate::cli::RunArgs) -> Result<AccessConfig> {
    let mut config = match &args.config {
        Some(path) => AccessConfig::from_json_file(path)?,
        None => AccessConfig::default(),
    };
    if let Some(threshold) = args.threshold { config.walk_distance_threshold = threshold }
    if let Some(area) = args.min_park_area { config.min_park_area = area }
    if let Some(snap) = args.snap_distance { config.entrance_snap_distance = snap }
    if let Some(edge) = args.hex_edge_length { config.hex_edge_length = edge }
    if let Some(ratio) = args.hex_ratio_threshold { config.hex_ratio_threshold = Some(ratio) }
    if let Some(epsg) = args.epsg { config.expected_epsg = Some(epsg) }
    Ok(config)
}

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RunArgs) -> Result<()> {
    let out_dir = &args.output.clone().unwrap_or("./output".into());
    let config = load_config(args)?;
    let pipeline = Pipeline::new(config).context("[run] Invalid configuration")?;

    let paths = InputPaths {
        roads: args.roads.clone(),
        parks: args.parks.clone(),
        population: args.population.clone(),
        districts: args.districts.clone(),
        study_area: args.study_area.clone(),
    };
    let fields = FieldMap {
        population: args.population_field.clone(),
        groups: args.group_fields.clone(),
        district_id: args.district_field.clone(),
        district_name: args.district_name_field.clone(),
        road_class: Some(args.road_class_field.clone()),
        walkable: args.walkable_field.clone(),
        park_area: args.park_area_field.clone(),
    };

    info!("[run] reading inputs");
    let inputs = read_inputs(&paths, &fields)?;
    let output = pipeline.run(&inputs).context("[run] Pipeline failed")?;

    for issue in &output.diagnostics.invalid_features {
        warn!("[{}] invalid feature {} of {}: {}", issue.stage, issue.feature, issue.layer, issue.reason);
    }
    for warning in &output.diagnostics.warnings {
        warn!("[{}] {}: {}", warning.stage, warning.subject, warning.reason);
    }

    info!("[run] writing outputs to {}", out_dir.display());
    write_outputs(&output, &inputs, out_dir)?;

    let summary = output.summary();
    info!(
        "[run] {:.0} of {:.0} people ({:.1}%) live within {} of a park entrance",
        summary.districts.accessible_population,
        summary.districts.total_population,
        summary.districts.population_ratio * 100.0,
        summary.walk_distance_threshold,
    );
    Ok(())
}
