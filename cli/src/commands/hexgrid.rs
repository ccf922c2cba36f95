use anyhow::{ensure, Result};
use log::info;
use parkaccess::io::{read_layer, study_area, write_hexgrid};
use parkaccess::{AccessConfig, HexGridGenerator};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::HexgridArgs) -> Result<()> {
    let out_path = &args.output.clone().unwrap_or("./hexes.geojson".into());

    let generator = match (args.edge_length, args.area_ha) {
        (Some(edge), _) => HexGridGenerator::new(edge),
        (None, Some(hectares)) => HexGridGenerator::from_area_hectares(hectares),
        (None, None) => HexGridGenerator::from_config(&AccessConfig::default()),
    };
    ensure!(
        generator.edge_length().is_finite() && generator.edge_length() > 0.0,
        "[hexgrid] Cell size must be positive"
    );

    let layer = study_area(read_layer(&args.study_area)?, "study area")?;
    let area = layer.dissolve();
    let cells = generator.generate(&area);
    info!("[hexgrid] writing {} cells to {}", cells.len(), out_path.display());
    write_hexgrid(&cells, layer.epsg, out_path)
}
