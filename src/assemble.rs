use std::collections::HashSet;

use crate::error::{PipelineError, PipelineResult};
use crate::label::{LabelOrder, LabelledValue, ScenarioLabel};
use crate::reshape::Pivot;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    pub indicator: String,
    pub rows: Vec<LabelledValue>,
}

impl IndicatorTable {
    /// Rounds every value to `decimals` places, half away from zero.
    pub fn rounded(&self, decimals: Option<u32>) -> Self {
        let Some(decimals) = decimals else {
            return self.clone();
        };

        let scale = 10_f64.powi(decimals as i32);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let value = (row.value * scale).round() / scale;
                // Keep "-0" out of the output.
                let value = if value == 0.0 { 0.0 } else { value };
                LabelledValue::new(row.label.clone(), row.year, value)
            })
            .collect();

        Self {
            indicator: self.indicator.clone(),
            rows,
        }
    }
}

pub fn assemble(
    indicator: &str,
    stats: Vec<LabelledValue>,
    exemplars: Vec<LabelledValue>,
) -> PipelineResult<IndicatorTable> {
    let rows: Vec<LabelledValue> = stats.into_iter().chain(exemplars).collect();

    let mut seen = HashSet::with_capacity(rows.len());
    for row in &rows {
        if !row.label.is_ensemble() {
            return Err(PipelineError::schema(format!(
                "indicator {indicator}: label {:?} is not a percentile or exemplar label",
                row.label.to_string()
            )));
        }
        if !seen.insert((&row.label, row.year)) {
            return Err(PipelineError::schema(format!(
                "indicator {indicator}: duplicate row for label {} in {}",
                row.label, row.year
            )));
        }
    }

    Ok(IndicatorTable {
        indicator: indicator.to_string(),
        rows,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub label: ScenarioLabel,
    pub year: i32,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    pub columns: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn new(columns: Vec<String>, rows: Vec<WideRow>) -> PipelineResult<Self> {
        let mut names = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !names.insert(column.as_str()) {
                return Err(PipelineError::schema(format!(
                    "column {column:?} appears twice"
                )));
            }
        }

        let mut keys = HashSet::with_capacity(rows.len());
        for row in &rows {
            if row.values.len() != columns.len() {
                return Err(PipelineError::schema(format!(
                    "row {} {} has {} values for {} columns",
                    row.label,
                    row.year,
                    row.values.len(),
                    columns.len()
                )));
            }
            if !keys.insert((&row.label, row.year)) {
                return Err(PipelineError::schema(format!(
                    "duplicate row for label {} in {}",
                    row.label, row.year
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    #[cfg(test)]
    pub fn value(&self, label: &ScenarioLabel, year: i32, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.label == *label && row.year == year)
            .and_then(|row| row.values[index])
    }
}

pub fn merge_indicators(tables: &[IndicatorTable], order: LabelOrder) -> PipelineResult<WideTable> {
    let mut columns = Vec::with_capacity(tables.len());
    for table in tables {
        if columns.contains(&table.indicator) {
            return Err(PipelineError::schema(format!(
                "indicator {} is merged twice",
                table.indicator
            )));
        }
        columns.push(table.indicator.clone());
    }

    let cells = tables.iter().flat_map(|table| {
        table.rows.iter().map(|row| {
            (
                (row.label.clone(), row.year),
                table.indicator.clone(),
                row.value,
            )
        })
    });
    let wide = Pivot::from_long(cells).map_err(|duplicate| {
        let (label, year) = duplicate.key;
        PipelineError::schema(format!(
            "indicator {}: duplicate row for label {label} in {year}",
            duplicate.column
        ))
    })?;

    let mut rows: Vec<WideRow> = wide
        .rows()
        .map(|((label, year), cells)| WideRow {
            label: label.clone(),
            year: *year,
            values: columns
                .iter()
                .map(|column| cells.get(column).copied())
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| order.compare(&a.label, &b.label).then(a.year.cmp(&b.year)));

    WideTable::new(columns, rows)
}
