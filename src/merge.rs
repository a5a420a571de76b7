use std::collections::{BTreeSet, HashSet};

use crate::assemble::{WideRow, WideTable};
use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_EXCLUDED_YEARS: [i32; 1] = [2018];

/// Unions two wide tables keyed by (written label, year).
///
/// Primary rows come first and win every key conflict; secondary rows in an
/// excluded year are dropped. Columns follow the primary table.
pub fn merge_sources(
    primary: &WideTable,
    secondary: &WideTable,
    excluded_years: &BTreeSet<i32>,
) -> PipelineResult<WideTable> {
    let positions = secondary_positions(primary, secondary)?;

    let mut rows = primary.rows.clone();
    let mut keys: HashSet<_> = primary
        .rows
        .iter()
        .map(|row| (row.label.to_string(), row.year))
        .collect();

    for row in &secondary.rows {
        if excluded_years.contains(&row.year) {
            continue;
        }
        if !keys.insert((row.label.to_string(), row.year)) {
            continue;
        }

        let mut values = vec![None; primary.columns.len()];
        for (source, target) in positions.iter().enumerate() {
            values[*target] = row.values[source];
        }
        rows.push(WideRow {
            label: row.label.clone(),
            year: row.year,
            values,
        });
    }

    WideTable::new(primary.columns.clone(), rows)
}

fn secondary_positions(primary: &WideTable, secondary: &WideTable) -> PipelineResult<Vec<usize>> {
    let primary_columns: BTreeSet<&str> = primary.columns.iter().map(String::as_str).collect();
    let secondary_columns: BTreeSet<&str> = secondary.columns.iter().map(String::as_str).collect();
    if !secondary.is_empty() && primary_columns != secondary_columns {
        return Err(PipelineError::schema(format!(
            "sources disagree on columns: primary [{}], secondary [{}]",
            primary.columns.join(", "),
            secondary.columns.join(", ")
        )));
    }

    Ok(secondary
        .columns
        .iter()
        .filter_map(|column| primary.column_index(column))
        .collect())
}
