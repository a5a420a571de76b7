use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::assemble::{WideRow, WideTable};
use crate::label::ScenarioLabel;
use crate::records::{Observation, RecordStore};
use crate::util::ensure_directory;

#[derive(Debug, Deserialize)]
struct ObservationRow {
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "Scenario")]
    scenario: String,
    #[serde(rename = "Region")]
    region: String,
    #[serde(rename = "Variable")]
    variable: String,
    #[serde(rename = "Unit", default)]
    unit: Option<String>,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Value", default)]
    value: Option<String>,
    #[serde(rename = "Category", default)]
    category: Option<String>,
    #[serde(rename = "IMP_marker", default)]
    imp_marker: Option<String>,
}

pub fn read_records(path: &Path) -> Result<RecordStore> {
    let file =
        File::open(path).with_context(|| format!("failed to open records: {}", path.display()))?;
    read_records_from(file).with_context(|| format!("failed to load records: {}", path.display()))
}

pub fn read_records_from<R: Read>(reader: R) -> Result<RecordStore> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut observations = Vec::new();
    for (index, row) in csv_reader.deserialize::<ObservationRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row.with_context(|| format!("malformed observation on line {line}"))?;

        let year = parse_year(&row.year).with_context(|| format!("invalid year on line {line}"))?;
        let value = parse_cell(row.value.as_deref())
            .with_context(|| format!("invalid value on line {line}"))?;

        let mut observation = Observation::new(row.model, row.scenario, row.variable, year, value);
        observation.region = row.region;
        observation.unit = row.unit.unwrap_or_default();
        if let Some(category) = non_empty(row.category) {
            observation = observation.with_category(category);
        }
        if let Some(marker) = non_empty(row.imp_marker) {
            observation = observation.with_imp_marker(marker);
        }
        observations.push(observation);
    }

    Ok(RecordStore::new(observations)?)
}

pub fn write_wide_table(path: &Path, table: &WideTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create wide table: {}", path.display()))?;
    write_wide_table_to(file, table)
        .with_context(|| format!("failed to write wide table: {}", path.display()))
}

pub fn write_wide_table_to<W: Write>(writer: W, table: &WideTable) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["scenario".to_string(), "year".to_string()];
    header.extend(table.columns.iter().cloned());
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 2);
        record.push(row.label.to_string());
        record.push(row.year.to_string());
        record.extend(
            row.values
                .iter()
                .map(|value| value.map(|v| v.to_string()).unwrap_or_default()),
        );
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn read_wide_table(path: &Path) -> Result<WideTable> {
    let file = File::open(path)
        .with_context(|| format!("failed to open wide table: {}", path.display()))?;
    read_wide_table_from(file)
        .with_context(|| format!("failed to load wide table: {}", path.display()))
}

pub fn read_wide_table_from<R: Read>(reader: R) -> Result<WideTable> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let header = csv_reader.headers().context("missing wide table header")?.clone();
    let leading: Vec<String> = header.iter().take(2).map(str::to_ascii_lowercase).collect();
    if leading != ["scenario", "year"] {
        bail!(
            "wide table must start with scenario,year columns, found {}",
            header.iter().collect::<Vec<_>>().join(",")
        );
    }
    let columns: Vec<String> = header.iter().skip(2).map(ToOwned::to_owned).collect();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let line = index + 2;
        let record = record.with_context(|| format!("malformed wide row on line {line}"))?;

        let label = ScenarioLabel::parse(record.get(0).unwrap_or_default());
        let year = parse_year(record.get(1).unwrap_or_default())
            .with_context(|| format!("invalid year on line {line}"))?;
        let values = (0..columns.len())
            .map(|column| parse_cell(record.get(column + 2)))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("invalid value on line {line}"))?;

        rows.push(WideRow {
            label,
            year,
            values,
        });
    }

    Ok(WideTable::new(columns, rows)?)
}

fn parse_year(raw: &str) -> Result<i32> {
    let trimmed = raw.trim();
    if let Ok(year) = trimmed.parse::<i32>() {
        return Ok(year);
    }

    // Spreadsheet exports sometimes write years as floats.
    let value: f64 = trimmed
        .parse()
        .with_context(|| format!("{trimmed:?} is not a year"))?;
    if value.fract() != 0.0 || !value.is_finite() {
        bail!("{trimmed:?} is not a whole year");
    }
    Ok(value as i32)
}

/// Empty and non-finite cells are gaps.
fn parse_cell(raw: Option<&str>) -> Result<Option<f64>> {
    let Some(trimmed) = raw.map(str::trim).filter(|cell| !cell.is_empty()) else {
        return Ok(None);
    };

    let value: f64 = trimmed
        .parse()
        .with_context(|| format!("{trimmed:?} is not a number"))?;
    Ok(Some(value).filter(|v| v.is_finite()))
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}
