use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

/// Marker value carried by every ensemble member that is not an exemplar.
pub const NON_IMP_SENTINEL: &str = "non-IMP";

pub const WORLD_REGION: &str = "World";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub model: String,
    pub scenario: String,
    pub region: String,
    pub variable: String,
    pub unit: String,
    pub year: i32,
    pub value: Option<f64>,
    pub category: Option<String>,
    pub imp_marker: Option<String>,
}

impl Observation {
    pub fn new(
        model: impl Into<String>,
        scenario: impl Into<String>,
        variable: impl Into<String>,
        year: i32,
        value: Option<f64>,
    ) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
            region: WORLD_REGION.to_string(),
            variable: variable.into(),
            unit: String::new(),
            year,
            value: value.filter(|v| v.is_finite()),
            category: None,
            imp_marker: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_imp_marker(mut self, marker: impl Into<String>) -> Self {
        self.imp_marker = Some(marker.into());
        self
    }

    pub fn scenario_key(&self) -> ScenarioKey {
        ScenarioKey::new(&self.model, &self.scenario)
    }

    pub fn exemplar_marker(&self) -> Option<&str> {
        self.imp_marker
            .as_deref()
            .map(str::trim)
            .filter(|marker| !marker.is_empty() && *marker != NON_IMP_SENTINEL)
    }

    fn unique_key(&self) -> (&str, &str, &str, &str, i32) {
        (
            &self.model,
            &self.scenario,
            &self.region,
            &self.variable,
            self.year,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScenarioKey {
    pub model: String,
    pub scenario: String,
}

impl ScenarioKey {
    pub fn new(model: &str, scenario: &str) -> Self {
        Self {
            model: model.to_string(),
            scenario: scenario.to_string(),
        }
    }
}

/// (model, scenario, region, variable, year) is unique within a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    observations: Vec<Observation>,
}

impl RecordStore {
    pub fn new(observations: Vec<Observation>) -> PipelineResult<Self> {
        let mut seen = HashSet::with_capacity(observations.len());
        for observation in &observations {
            if !seen.insert(observation.unique_key()) {
                return Err(PipelineError::data_quality(format!(
                    "duplicate observation for model={} scenario={} region={} variable={} year={}",
                    observation.model,
                    observation.scenario,
                    observation.region,
                    observation.variable,
                    observation.year
                )));
            }
        }

        Ok(Self { observations })
    }

    pub(crate) fn from_unique(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn scenario_keys(&self) -> BTreeSet<ScenarioKey> {
        self.observations
            .iter()
            .map(Observation::scenario_key)
            .collect()
    }

    pub fn category_sizes(&self) -> BTreeMap<String, usize> {
        let mut pairs: BTreeMap<&str, BTreeSet<(&str, &str)>> = BTreeMap::new();
        for observation in &self.observations {
            if let Some(category) = observation.category.as_deref() {
                pairs
                    .entry(category)
                    .or_default()
                    .insert((&observation.model, &observation.scenario));
            }
        }

        pairs
            .into_iter()
            .map(|(category, members)| (category.to_string(), members.len()))
            .collect()
    }

    pub fn exemplar_markers(&self) -> BTreeSet<String> {
        self.observations
            .iter()
            .filter_map(Observation::exemplar_marker)
            .map(ToOwned::to_owned)
            .collect()
    }

    pub fn variables(&self) -> BTreeSet<&str> {
        self.observations
            .iter()
            .map(|observation| observation.variable.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{NON_IMP_SENTINEL, Observation, RecordStore};

    #[test]
    fn duplicate_observation_key_is_rejected() {
        let rows = vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(1.0)),
            Observation::new("M", "S", "Final Energy", 2030, Some(2.0)),
        ];

        let err = RecordStore::new(rows).expect_err("duplicate key must fail");
        assert!(err.to_string().contains("duplicate observation"));
        assert!(err.to_string().contains("year=2030"));
    }

    #[test]
    fn same_variable_in_other_year_is_not_a_duplicate() {
        let rows = vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(1.0)),
            Observation::new("M", "S", "Final Energy", 2040, Some(2.0)),
        ];

        let store = RecordStore::new(rows).expect("distinct years are unique");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn non_finite_values_load_as_gaps() {
        let observation = Observation::new("M", "S", "Final Energy", 2030, Some(f64::NAN));
        assert_eq!(observation.value, None);
    }

    #[test]
    fn category_sizes_count_distinct_pairs() {
        let rows = vec![
            Observation::new("M1", "S1", "A", 2030, Some(1.0)).with_category("C1"),
            Observation::new("M1", "S1", "B", 2030, Some(1.0)).with_category("C1"),
            Observation::new("M2", "S1", "A", 2030, Some(1.0)).with_category("C1"),
            Observation::new("M2", "S2", "A", 2030, Some(1.0)).with_category("C2"),
            Observation::new("M3", "S3", "A", 2030, Some(1.0)),
        ];
        let store = RecordStore::new(rows).expect("unique rows");

        let sizes = store.category_sizes();
        assert_eq!(sizes.get("C1"), Some(&2));
        assert_eq!(sizes.get("C2"), Some(&1));
        assert_eq!(sizes.len(), 2);
    }

    #[test]
    fn sentinel_marker_is_not_an_exemplar() {
        let rows = vec![
            Observation::new("M1", "S1", "A", 2030, None).with_imp_marker(NON_IMP_SENTINEL),
            Observation::new("M2", "S2", "A", 2030, None).with_imp_marker("Ren"),
            Observation::new("M3", "S3", "A", 2030, None).with_imp_marker(" "),
        ];
        let store = RecordStore::new(rows).expect("unique rows");

        let markers = store.exemplar_markers();
        assert_eq!(markers.into_iter().collect::<Vec<_>>(), vec!["Ren"]);
    }
}
