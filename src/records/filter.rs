use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::records::store::{Observation, RecordStore};

pub const DEFAULT_CATEGORIES: [&str; 8] = ["C1", "C2", "C3", "C4", "C5", "C6", "C7", "C8"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryVocabulary {
    categories: BTreeSet<String>,
}

impl Default for CategoryVocabulary {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl CategoryVocabulary {
    pub fn new<I, S>(categories: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: BTreeSet<String> = categories
            .into_iter()
            .map(Into::into)
            .map(|category: String| category.trim().to_string())
            .filter(|category| !category.is_empty())
            .collect();

        if categories.is_empty() {
            return Err(PipelineError::configuration(
                "category vocabulary must name at least one category",
            ));
        }

        Ok(Self { categories })
    }

    pub fn ensure_known(&self, category: &str) -> PipelineResult<()> {
        if self.categories.contains(category) {
            return Ok(());
        }

        Err(PipelineError::configuration(format!(
            "unknown category {category:?}; expected one of {}",
            self.categories
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub category: String,
    pub observations: usize,
    pub scenario_pairs: usize,
    pub exemplar_markers: Vec<String>,
}

pub fn filter_category(store: &RecordStore, category: &str) -> (RecordStore, FilterSummary) {
    let retained: Vec<Observation> = store
        .iter()
        .filter(|observation| observation.category.as_deref() == Some(category))
        .cloned()
        .map(|mut observation| {
            observation.category = None;
            observation
        })
        .collect();

    let filtered = RecordStore::from_unique(retained);
    let summary = FilterSummary {
        category: category.to_string(),
        observations: filtered.len(),
        scenario_pairs: filtered.scenario_keys().len(),
        exemplar_markers: filtered.exemplar_markers().into_iter().collect(),
    };

    (filtered, summary)
}
