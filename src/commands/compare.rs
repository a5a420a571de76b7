use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::CompareArgs;
use crate::commands::load_registry;
use crate::derive::FormulaRegistry;
use crate::label::LabelOrder;
use crate::merge::merge_sources;
use crate::model::{MANIFEST_VERSION, OutputSummary, RunManifest};
use crate::pipeline::source_table;
use crate::tabular::{read_records, read_wide_table, write_wide_table};
use crate::util::{
    fingerprint_file, manifest_path_for, now_utc_string, utc_compact_string, write_json_pretty,
};

pub fn run(args: CompareArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let order = LabelOrder::default();

    let registry = load_registry(args.registry.as_deref(), FormulaRegistry::energy_model)?;
    let excluded_years: BTreeSet<i32> = args.exclude_years.iter().copied().collect();
    let excluded_scenarios: BTreeSet<String> = args.exclude_scenarios.iter().cloned().collect();

    info!(
        run_id = %run_id,
        constraints = %args.constraints.display(),
        model_records = %args.model_records.display(),
        "starting model comparison"
    );

    let mut inputs = vec![
        fingerprint_file(&args.constraints)?,
        fingerprint_file(&args.model_records)?,
    ];
    if let Some(path) = &args.registry {
        inputs.push(fingerprint_file(path)?);
    }

    let constraints = read_wide_table(&args.constraints)?;
    let model_store = read_records(&args.model_records)?;
    if model_store.is_empty() {
        warn!(
            path = %args.model_records.display(),
            "model records are empty; output repeats the constraints table"
        );
    }

    let model = source_table(&model_store, &registry, &excluded_scenarios, order)?;
    let merged = merge_sources(&constraints, &model.table, &excluded_years)
        .context("failed to merge model results into the constraints table")?;

    let model_rows_kept = merged.len() - constraints.len();
    info!(
        constraints_rows = constraints.len(),
        model_rows = model.table.len(),
        model_rows_kept,
        "merged model results"
    );

    write_wide_table(&args.output, &merged)?;
    info!(path = %args.output.display(), rows = merged.len(), "wrote comparison table");

    let mut notes = Vec::new();
    if model_rows_kept < model.table.len() {
        notes.push(format!(
            "{} model rows dropped by year exclusion or key conflict",
            model.table.len() - model_rows_kept
        ));
    }

    let manifest = RunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        stage: "compare".to_string(),
        status: "completed".to_string(),
        started_at,
        completed_at: now_utc_string(),
        command: render_compare_command(&args),
        label_order: order.as_str().to_string(),
        inputs,
        filter: None,
        indicators: model.reports,
        output: OutputSummary {
            path: args.output.display().to_string(),
            rows: merged.len(),
            columns: merged.columns.clone(),
        },
        notes,
    };

    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| manifest_path_for(&args.output));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), run_id = %run_id, "comparison run completed");

    Ok(())
}

fn render_compare_command(args: &CompareArgs) -> String {
    let mut command = vec![
        "ar6-constraints".to_string(),
        "compare".to_string(),
        "--constraints".to_string(),
        args.constraints.display().to_string(),
        "--model-records".to_string(),
        args.model_records.display().to_string(),
    ];

    if let Some(registry) = &args.registry {
        command.push("--registry".to_string());
        command.push(registry.display().to_string());
    }

    for year in &args.exclude_years {
        command.push("--exclude-year".to_string());
        command.push(year.to_string());
    }

    for scenario in &args.exclude_scenarios {
        command.push("--exclude-scenario".to_string());
        command.push(scenario.clone());
    }

    command.push("--output".to_string());
    command.push(args.output.display().to_string());

    command.join(" ")
}
