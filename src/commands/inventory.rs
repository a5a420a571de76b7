use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::model::{CategoryEntry, InventoryManifest, MANIFEST_VERSION};
use crate::tabular::read_records;
use crate::util::{fingerprint_file, now_utc_string, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.records)?;

    for entry in &manifest.categories {
        info!(
            category = %entry.category,
            scenario_pairs = entry.scenario_pairs,
            "category ensemble size"
        );
    }
    if manifest.categories.is_empty() {
        warn!(source = %manifest.source.path, "records carry no category metadata");
    }

    if args.dry_run {
        info!(
            observations = manifest.observation_count,
            scenario_pairs = manifest.scenario_pairs,
            source = %manifest.source.path,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| default_manifest_path(&args.records));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        observations = manifest.observation_count,
        markers = manifest.exemplar_markers.len(),
        "inventory completed"
    );

    Ok(())
}

pub fn build_manifest(records: &Path) -> Result<InventoryManifest> {
    let source = fingerprint_file(records)?;
    let store = read_records(records)?;

    let categories = store
        .category_sizes()
        .into_iter()
        .map(|(category, scenario_pairs)| CategoryEntry {
            category,
            scenario_pairs,
        })
        .collect();

    Ok(InventoryManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at: now_utc_string(),
        source,
        observation_count: store.len(),
        scenario_pairs: store.scenario_keys().len(),
        categories,
        exemplar_markers: store.exemplar_markers().into_iter().collect(),
        variables: store.variables().into_iter().map(ToOwned::to_owned).collect(),
    })
}

fn default_manifest_path(records: &Path) -> PathBuf {
    records
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("manifests")
        .join("inventory.json")
}
