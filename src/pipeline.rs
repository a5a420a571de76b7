use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::assemble::{IndicatorTable, WideTable, assemble, merge_indicators};
use crate::derive::{FormulaRegistry, IndicatorSpec, derive};
use crate::error::PipelineResult;
use crate::exemplar::{ExemplarMap, extract};
use crate::label::{LabelOrder, LabelledValue, ScenarioLabel};
use crate::records::RecordStore;
use crate::stats::{Percentile, reduce};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorReport {
    pub indicator: String,
    pub derived_values: usize,
    pub skipped_tuples: usize,
    pub statistic_rows: usize,
    pub exemplar_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRun {
    pub table: WideTable,
    pub reports: Vec<IndicatorReport>,
}

pub fn ensemble_indicator(
    store: &RecordStore,
    spec: &IndicatorSpec,
    exemplars: &ExemplarMap,
    percentiles: &[Percentile],
) -> PipelineResult<(IndicatorTable, IndicatorReport)> {
    let series = derive(store, spec)?;
    let stats = reduce(&series, percentiles);
    let exemplar_rows = extract(&series, exemplars);

    let report = IndicatorReport {
        indicator: spec.name.clone(),
        derived_values: series.values.len(),
        skipped_tuples: series.skipped,
        statistic_rows: stats.len(),
        exemplar_rows: exemplar_rows.len(),
    };

    let table = assemble(&spec.name, stats, exemplar_rows)?.rounded(spec.decimals);
    Ok((table, report))
}

pub fn ensemble_table(
    store: &RecordStore,
    registry: &FormulaRegistry,
    percentiles: &[Percentile],
    order: LabelOrder,
) -> PipelineResult<TableRun> {
    registry.validate()?;
    let exemplars = ExemplarMap::from_records(store)?;
    if exemplars.is_empty() && !store.is_empty() {
        warn!("ensemble carries no exemplar markers; only percentile rows follow");
    }
    info!(
        exemplars = exemplars.len(),
        labels = %exemplars.labels().join(","),
        percentiles = %percentiles
            .iter()
            .map(|p| format!("{}={}", p.label(), p.fraction()))
            .collect::<Vec<_>>()
            .join(","),
        "resolved exemplar pathways"
    );

    let mut tables = Vec::with_capacity(registry.indicators.len());
    let mut reports = Vec::with_capacity(registry.indicators.len());
    for spec in &registry.indicators {
        let (table, report) = ensemble_indicator(store, spec, &exemplars, percentiles)?;
        log_report(&report);
        tables.push(table);
        reports.push(report);
    }

    let table = merge_indicators(&tables, order)?;
    Ok(TableRun { table, reports })
}

pub fn source_table(
    store: &RecordStore,
    registry: &FormulaRegistry,
    excluded_scenarios: &BTreeSet<String>,
    order: LabelOrder,
) -> PipelineResult<TableRun> {
    registry.validate()?;

    let mut tables = Vec::with_capacity(registry.indicators.len());
    let mut reports = Vec::with_capacity(registry.indicators.len());
    for spec in &registry.indicators {
        let series = derive(store, spec)?;
        let rows: Vec<LabelledValue> = series
            .values
            .iter()
            .filter(|value| !excluded_scenarios.contains(&value.member.scenario))
            .map(|value| {
                LabelledValue::new(
                    ScenarioLabel::parse(&value.member.scenario),
                    value.year,
                    value.value,
                )
            })
            .collect();

        let report = IndicatorReport {
            indicator: spec.name.clone(),
            derived_values: series.values.len(),
            skipped_tuples: series.skipped,
            statistic_rows: 0,
            exemplar_rows: 0,
        };
        log_report(&report);

        let table = IndicatorTable {
            indicator: spec.name.clone(),
            rows,
        };
        tables.push(table.rounded(spec.decimals));
        reports.push(report);
    }

    let table = merge_indicators(&tables, order)?;
    Ok(TableRun { table, reports })
}

fn log_report(report: &IndicatorReport) {
    if report.derived_values == 0 {
        warn!(
            indicator = %report.indicator,
            skipped = report.skipped_tuples,
            "indicator has no complete input tuple"
        );
        return;
    }

    info!(
        indicator = %report.indicator,
        derived = report.derived_values,
        skipped = report.skipped_tuples,
        statistics = report.statistic_rows,
        exemplars = report.exemplar_rows,
        "indicator computed"
    );
}
