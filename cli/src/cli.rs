use std::path::PathBuf;

/// Park accessibility CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "parkaccess", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the full accessibility pipeline
    Run(RunArgs),

    /// Tessellate a study area into hexagonal cells
    Hexgrid(HexgridArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Road network lines (.geojson or .shp)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub roads: PathBuf,

    /// Park polygons
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub parks: PathBuf,

    /// Population points
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub population: PathBuf,

    /// District polygons
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub districts: PathBuf,

    /// District identifier attribute
    #[arg(long, default_value = "id")]
    pub district_field: String,

    /// District name attribute
    #[arg(long)]
    pub district_name_field: Option<String>,

    /// Study area polygons, defaults to the dissolved districts
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub study_area: Option<PathBuf>,

    /// Population attribute; points are counted when omitted
    #[arg(long)]
    pub population_field: Option<String>,

    /// Demographic group attribute (repeatable)
    #[arg(long = "group-field")]
    pub group_fields: Vec<String>,

    /// Road class attribute
    #[arg(long, default_value = "highway")]
    pub road_class_field: String,

    /// Walkability flag attribute
    #[arg(long)]
    pub walkable_field: Option<String>,

    /// Park area attribute, overrides the polygon area
    #[arg(long)]
    pub park_area_field: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Walking distance threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Minimum park area
    #[arg(long)]
    pub min_park_area: Option<f64>,

    /// Entrance snap distance
    #[arg(long)]
    pub snap_distance: Option<f64>,

    /// Hex cell edge length
    #[arg(long)]
    pub hex_edge_length: Option<f64>,

    /// Percentage above which hex cells are flagged
    #[arg(long)]
    pub hex_ratio_threshold: Option<f64>,

    /// Required EPSG code of every input layer
    #[arg(long)]
    pub epsg: Option<u32>,

    /// Output directory, defaults to "./output"
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct HexgridArgs {
    /// Study area polygons
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub study_area: PathBuf,

    /// Cell edge length
    #[arg(long, conflicts_with = "area_ha")]
    pub edge_length: Option<f64>,

    /// Cell area in hectares
    #[arg(long)]
    pub area_ha: Option<f64>,

    /// Output file, defaults to "./hexes.geojson"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}
