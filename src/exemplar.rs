use std::collections::BTreeMap;

use crate::derive::DerivedSeries;
use crate::error::{PipelineError, PipelineResult};
use crate::label::{LabelledValue, ScenarioLabel};
use crate::records::{RecordStore, ScenarioKey};

/// Each label is claimed by at most one (model, scenario) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExemplarMap {
    labels: BTreeMap<ScenarioKey, ScenarioLabel>,
}

impl ExemplarMap {
    pub fn from_pairs<I>(pairs: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = (ScenarioKey, ScenarioLabel)>,
    {
        let mut labels: BTreeMap<ScenarioKey, ScenarioLabel> = BTreeMap::new();
        let mut owners: BTreeMap<ScenarioLabel, ScenarioKey> = BTreeMap::new();

        for (member, label) in pairs {
            if !label.is_exemplar() {
                return Err(PipelineError::configuration(format!(
                    "{label} is not an exemplar label"
                )));
            }

            if let Some(previous) = labels.get(&member) {
                if *previous != label {
                    return Err(PipelineError::configuration(format!(
                        "model={} scenario={} is marked both {previous} and {label}",
                        member.model, member.scenario
                    )));
                }
                continue;
            }

            if let Some(owner) = owners.get(&label) {
                return Err(PipelineError::configuration(format!(
                    "exemplar label {label} is claimed by model={} scenario={} and model={} scenario={}",
                    owner.model, owner.scenario, member.model, member.scenario
                )));
            }

            owners.insert(label.clone(), member.clone());
            labels.insert(member, label);
        }

        Ok(Self { labels })
    }

    pub fn from_records(store: &RecordStore) -> PipelineResult<Self> {
        let pairs = store.iter().filter_map(|observation| {
            observation
                .exemplar_marker()
                .map(|marker| (observation.scenario_key(), ScenarioLabel::exemplar(marker)))
        });

        Self::from_pairs(pairs)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_for(&self, member: &ScenarioKey) -> Option<&ScenarioLabel> {
        self.labels.get(member)
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.labels.values().map(ToString::to_string).collect();
        labels.sort();
        labels
    }
}

pub fn extract(series: &DerivedSeries, exemplars: &ExemplarMap) -> Vec<LabelledValue> {
    let mut extracted: Vec<LabelledValue> = series
        .values
        .iter()
        .filter_map(|value| {
            exemplars
                .label_for(&value.member)
                .map(|label| LabelledValue::new(label.clone(), value.year, value.value))
        })
        .collect();

    extracted.sort_by(|a, b| a.label.cmp(&b.label).then(a.year.cmp(&b.year)));
    extracted
}
