//! Reading input layers and writing run products.

mod csv;
mod fields;
mod geojson;
mod raw;
mod read;
mod shp;
mod write;

pub use csv::{district_table, hex_table, write_csv_string};
pub use fields::{districts, parks, population, roads, study_area, FieldMap};
pub use raw::{read_layer, RawFeature, RawGeometry, RawLayer};
pub use read::{read_inputs, InputPaths};
pub use write::{
    districts_geojson, entrances_geojson, graph_edges_geojson, hexes_geojson,
    walkable_area_geojson, write_hexgrid, write_json, write_outputs,
};
