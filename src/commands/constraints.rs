use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ConstraintsArgs;
use crate::commands::load_registry;
use crate::derive::FormulaRegistry;
use crate::label::LabelOrder;
use crate::model::{MANIFEST_VERSION, OutputSummary, RunManifest};
use crate::pipeline::ensemble_table;
use crate::records::{CategoryVocabulary, filter_category};
use crate::stats::default_percentiles;
use crate::tabular::{read_records, write_wide_table};
use crate::util::{
    fingerprint_file, manifest_path_for, now_utc_string, utc_compact_string, write_json_pretty,
};

pub fn run(args: ConstraintsArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let order = LabelOrder::from(args.label_order);

    let vocabulary = if args.category_vocabulary.is_empty() {
        CategoryVocabulary::default()
    } else {
        CategoryVocabulary::new(args.category_vocabulary.iter().cloned())?
    };
    vocabulary.ensure_known(&args.category)?;

    let registry = load_registry(args.registry.as_deref(), FormulaRegistry::ar6_ensemble)?;

    info!(
        run_id = %run_id,
        records = %args.records.display(),
        category = %args.category,
        "starting constraints run"
    );

    let mut inputs = vec![fingerprint_file(&args.records)?];
    if let Some(path) = &args.registry {
        inputs.push(fingerprint_file(path)?);
    }

    let store = read_records(&args.records)?;
    let (filtered, summary) = filter_category(&store, &args.category);
    if filtered.is_empty() {
        warn!(
            category = %args.category,
            "no observations in category; the table will be empty"
        );
    }
    info!(
        category = %summary.category,
        observations = summary.observations,
        scenario_pairs = summary.scenario_pairs,
        markers = %summary.exemplar_markers.join(","),
        "filtered ensemble"
    );

    let run = ensemble_table(&filtered, &registry, &default_percentiles()?, order)?;

    write_wide_table(&args.output, &run.table)?;
    info!(
        path = %args.output.display(),
        rows = run.table.len(),
        "wrote constraints table"
    );

    let notes = run
        .reports
        .iter()
        .filter(|report| report.derived_values == 0)
        .map(|report| format!("indicator {} has no complete input tuple", report.indicator))
        .collect();

    let manifest = RunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        stage: "constraints".to_string(),
        status: "completed".to_string(),
        started_at,
        completed_at: now_utc_string(),
        command: render_constraints_command(&args),
        label_order: order.as_str().to_string(),
        inputs,
        filter: Some(summary),
        indicators: run.reports,
        output: OutputSummary {
            path: args.output.display().to_string(),
            rows: run.table.len(),
            columns: run.table.columns.clone(),
        },
        notes,
    };

    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| manifest_path_for(&args.output));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), run_id = %run_id, "constraints run completed");

    Ok(())
}

fn render_constraints_command(args: &ConstraintsArgs) -> String {
    let mut command = vec![
        "ar6-constraints".to_string(),
        "constraints".to_string(),
        "--records".to_string(),
        args.records.display().to_string(),
        "--category".to_string(),
        args.category.clone(),
    ];

    for category in &args.category_vocabulary {
        command.push("--category-vocabulary".to_string());
        command.push(category.clone());
    }

    if let Some(registry) = &args.registry {
        command.push("--registry".to_string());
        command.push(registry.display().to_string());
    }

    command.push("--output".to_string());
    command.push(args.output.display().to_string());
    command.push("--label-order".to_string());
    command.push(LabelOrder::from(args.label_order).as_str().to_string());

    command.join(" ")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::{render_constraints_command, run};
    use crate::cli::{ConstraintsArgs, LabelOrderArg};
    use crate::label::ScenarioLabel;
    use crate::tabular::read_wide_table;

    const RECORDS: &str = "\
Model,Scenario,Region,Variable,Unit,Year,Value,Category,IMP_marker
M1,S1,World,Final Energy,EJ/yr,2030,400,C1,non-IMP
M1,S1,World,Final Energy|Electricity,EJ/yr,2030,100,C1,non-IMP
M2,S2,World,Final Energy,EJ/yr,2030,500,C1,non-IMP
M2,S2,World,Final Energy|Electricity,EJ/yr,2030,175,C1,non-IMP
M3,S3,World,Final Energy,EJ/yr,2030,300,C1,LD
M4,S4,World,Final Energy,EJ/yr,2030,900,C3,non-IMP
";

    fn args(dir: &Path, category: &str) -> ConstraintsArgs {
        ConstraintsArgs {
            records: dir.join("records.csv"),
            category: category.to_string(),
            category_vocabulary: Vec::new(),
            registry: None,
            output: dir.join("data").join("constraints.csv"),
            manifest_path: None,
            label_order: LabelOrderArg::PercentilesFirst,
        }
    }

    #[test]
    fn writes_table_and_manifest_for_one_category() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("records.csv"), RECORDS).expect("write fixture");

        run(args(dir.path(), "C1")).expect("run succeeds");

        let table =
            read_wide_table(&dir.path().join("data").join("constraints.csv")).expect("table");
        assert_eq!(
            table.columns,
            vec!["ghg", "lcspe", "fed", "esfe", "co2elc", "ccsfos", "nonnrg"]
        );
        assert_eq!(table.value(&ScenarioLabel::Median, 2030, "fed"), Some(400.0));
        assert_eq!(table.value(&ScenarioLabel::Median, 2030, "esfe"), Some(0.3));
        assert_eq!(
            table.value(&ScenarioLabel::exemplar("LD"), 2030, "fed"),
            Some(300.0)
        );
        assert_eq!(table.value(&ScenarioLabel::Median, 2030, "ghg"), None);

        let manifest = fs::read_to_string(dir.path().join("data").join("constraints.manifest.json"))
            .expect("manifest written");
        let json: serde_json::Value = serde_json::from_str(&manifest).expect("valid json");
        assert_eq!(json["stage"], "constraints");
        assert_eq!(json["filter"]["scenario_pairs"], 3);
        assert_eq!(json["label_order"], "percentiles-first");
        assert_eq!(json["indicators"][2]["indicator"], "fed");
        assert_eq!(json["indicators"][2]["derived_values"], 3);
        assert!(
            json["notes"]
                .as_array()
                .expect("notes array")
                .iter()
                .any(|note| note == "indicator ghg has no complete input tuple")
        );
    }

    #[test]
    fn unknown_category_is_rejected_before_reading() {
        let dir = tempfile::tempdir().expect("temp dir");

        let err = run(args(dir.path(), "C9")).expect_err("C9 is not a category");
        assert!(err.to_string().contains("unknown category"));
    }

    #[test]
    fn known_category_without_rows_yields_empty_table() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("records.csv"), RECORDS).expect("write fixture");

        run(args(dir.path(), "C8")).expect("empty category is not an error");

        let table =
            read_wide_table(&dir.path().join("data").join("constraints.csv")).expect("table");
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 7);
    }

    #[test]
    fn command_line_records_label_order() {
        let mut args = args(Path::new("data"), "C2");
        args.label_order = LabelOrderArg::ExemplarsFirst;

        let command = render_constraints_command(&args);
        assert!(command.contains("--category C2"));
        assert!(command.ends_with("--label-order exemplars-first"));
    }
}
