use serde::{Deserialize, Serialize};

use crate::pipeline::IndicatorReport;
use crate::records::FilterSummary;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprint {
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryEntry {
    pub category: String,
    pub scenario_pairs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source: InputFingerprint,
    pub observation_count: usize,
    pub scenario_pairs: usize,
    pub categories: Vec<CategoryEntry>,
    pub exemplar_markers: Vec<String>,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub path: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub stage: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub command: String,
    pub label_order: String,
    pub inputs: Vec<InputFingerprint>,
    pub filter: Option<FilterSummary>,
    pub indicators: Vec<IndicatorReport>,
    pub output: OutputSummary,
    pub notes: Vec<String>,
}
