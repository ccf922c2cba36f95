//! Coverage tables as CSV.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter, NamedFrom, Series}};

use crate::coverage::{CoverageRecord, DistrictReport, HexReport};

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// Write a DataFrame to a CSV string.
pub fn write_csv_string(df: &mut DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .finish(df)
        .with_context(|| "[io::csv::write] Failed to write CSV to string")?;
    String::from_utf8(buffer)
        .with_context(|| "[io::csv::write] CSV output is not valid UTF-8")
}

/// Shared coverage columns, followed by `<group>_total` and
/// `<group>_accessible` for every group.
fn record_columns(records: &[&CoverageRecord]) -> Vec<Column> {
    fn column<T>(name: &str, records: &[&CoverageRecord], f: impl Fn(&CoverageRecord) -> T) -> Column
    where Series: NamedFrom<Vec<T>, [T]> {
        Column::new(name.into(), records.iter().map(|&record| f(record)).collect::<Vec<T>>())
    }

    let mut columns = vec![
        column("total_population", records, |r| r.total_population),
        column("accessible_population", records, |r| r.accessible_population),
        column("population_ratio", records, |r| r.population_ratio),
        column("total_area", records, |r| r.total_area),
        column("accessible_area", records, |r| r.accessible_area),
        column("area_ratio", records, |r| r.area_ratio),
        column("points_with_access", records, |r| r.points_with_access as u64),
        column("points_without_access", records, |r| r.points_without_access as u64),
    ];

    let groups: Vec<String> = records.first()
        .map(|record| record.groups.iter().map(|group| group.name.clone()).collect())
        .unwrap_or_default();
    for (slot, name) in groups.iter().enumerate() {
        columns.push(column(&format!("{name}_total"), records, |r| r.groups[slot].total));
        columns.push(column(&format!("{name}_accessible"), records, |r| r.groups[slot].accessible));
    }
    columns
}

/// One row per district.
pub fn district_table(report: &DistrictReport) -> Result<DataFrame> {
    let records: Vec<&CoverageRecord> = report.districts.iter().map(|d| &d.record).collect();
    let mut columns = vec![
        Column::new("id".into(), report.districts.iter().map(|d| d.id.clone()).collect::<Vec<String>>()),
        Column::new("name".into(), report.districts.iter().map(|d| d.name.clone()).collect::<Vec<Option<String>>>()),
    ];
    columns.extend(record_columns(&records));
    columns.push(Column::new("has_access".into(), report.districts.iter().map(|d| d.has_access).collect::<Vec<bool>>()));
    DataFrame::new(columns).context("[io::csv::district_table] Failed to build district table")
}

/// One row per hex cell.
pub fn hex_table(report: &HexReport) -> Result<DataFrame> {
    let records: Vec<&CoverageRecord> = report.cells.iter().map(|c| &c.record).collect();
    let mut columns = vec![
        Column::new("id".into(), report.cells.iter().map(|c| c.id.to_string()).collect::<Vec<String>>()),
        Column::new("col".into(), report.cells.iter().map(|c| c.id.col).collect::<Vec<i32>>()),
        Column::new("row".into(), report.cells.iter().map(|c| c.id.row).collect::<Vec<i32>>()),
    ];
    columns.extend(record_columns(&records));
    columns.push(Column::new("park_entrances".into(), report.cells.iter().map(|c| c.park_entrances as u64).collect::<Vec<u64>>()));
    columns.push(Column::new("above_threshold".into(), report.cells.iter().map(|c| c.above_threshold).collect::<Vec<Option<bool>>>()));
    DataFrame::new(columns).context("[io::csv::hex_table] Failed to build hex table")
}
