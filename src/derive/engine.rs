use std::collections::BTreeSet;

use crate::derive::registry::IndicatorSpec;
use crate::error::{PipelineError, PipelineResult};
use crate::records::{RecordStore, ScenarioKey};
use crate::reshape::Pivot;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberYear {
    pub member: ScenarioKey,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedValue {
    pub member: ScenarioKey,
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub indicator: String,
    pub values: Vec<DerivedValue>,
    /// Tuples that had some required input but not all of them, or whose
    /// result was not finite.
    pub skipped: usize,
}

pub fn derive(store: &RecordStore, spec: &IndicatorSpec) -> PipelineResult<DerivedSeries> {
    let required = spec.required_variables();

    let mut touched = BTreeSet::new();
    let mut cells = Vec::new();
    for observation in store.iter().filter(|o| required.contains(&o.variable)) {
        let key = MemberYear {
            member: observation.scenario_key(),
            year: observation.year,
        };
        touched.insert(key.clone());
        if let Some(value) = observation.value {
            cells.push((key, observation.variable.as_str(), value));
        }
    }

    let wide = Pivot::from_long(cells).map_err(|duplicate| {
        PipelineError::data_quality(format!(
            "indicator {}: {} is reported more than once for model={} scenario={} year={} (several regions?)",
            spec.name,
            duplicate.column,
            duplicate.key.member.model,
            duplicate.key.member.scenario,
            duplicate.key.year
        ))
    })?;

    // Computed cells land in a single-column pivot named after the indicator,
    // then flatten back to long rows.
    let mut computed = Vec::with_capacity(wide.len());
    for (key, _) in wide.rows() {
        let lookup = |name: &str| wide.get(key, name);
        let Some(value) = spec.formula.evaluate(&lookup) else {
            continue;
        };
        if value.is_finite() {
            computed.push((key.clone(), spec.name.as_str(), value));
        }
    }
    let derived = Pivot::from_long(computed).map_err(|duplicate| {
        PipelineError::data_quality(format!(
            "indicator {} computed twice for model={} scenario={} year={}",
            duplicate.column,
            duplicate.key.member.model,
            duplicate.key.member.scenario,
            duplicate.key.year
        ))
    })?;

    let values: Vec<DerivedValue> = derived
        .to_long()
        .into_iter()
        .map(|(key, _, value)| DerivedValue {
            member: key.member,
            year: key.year,
            value,
        })
        .collect();

    Ok(DerivedSeries {
        indicator: spec.name.clone(),
        skipped: touched.len() - values.len(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::derive;
    use crate::derive::formula::Expr;
    use crate::derive::registry::{FormulaRegistry, IndicatorSpec};
    use crate::records::{Observation, RecordStore};

    fn esfe() -> IndicatorSpec {
        IndicatorSpec::new(
            "esfe",
            Expr::div(Expr::var("Final Energy|Electricity"), Expr::var("Final Energy")),
            Some(2),
        )
    }

    #[test]
    fn electricity_share_of_final_energy() {
        let store = RecordStore::new(vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(100.0)),
            Observation::new("M", "S", "Final Energy|Electricity", 2030, Some(25.0)),
        ])
        .expect("unique rows");

        let series = derive(&store, &esfe()).expect("derivation succeeds");
        assert_eq!(series.indicator, "esfe");
        assert_eq!(series.values.len(), 1);
        assert_eq!(series.values[0].member.model, "M");
        assert_eq!(series.values[0].year, 2030);
        assert_eq!(series.values[0].value, 0.25);
        assert_eq!(series.skipped, 0);
    }

    #[test]
    fn tuple_missing_an_input_is_excluded() {
        let store = RecordStore::new(vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(100.0)),
            Observation::new("M", "S", "Final Energy", 2040, Some(90.0)),
            Observation::new("M", "S", "Final Energy|Electricity", 2040, None),
            Observation::new("M", "T", "Final Energy", 2030, Some(50.0)),
            Observation::new("M", "T", "Final Energy|Electricity", 2030, Some(10.0)),
        ])
        .expect("unique rows");

        let series = derive(&store, &esfe()).expect("derivation succeeds");
        let keys: Vec<(&str, i32)> = series
            .values
            .iter()
            .map(|v| (v.member.scenario.as_str(), v.year))
            .collect();
        assert_eq!(keys, vec![("T", 2030)]);
        assert_eq!(series.skipped, 2);
        assert!(series.values.iter().all(|v| v.value.is_finite() && v.value != 0.0));
    }

    #[test]
    fn zero_denominator_is_a_gap() {
        let store = RecordStore::new(vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(0.0)),
            Observation::new("M", "S", "Final Energy|Electricity", 2030, Some(0.0)),
        ])
        .expect("unique rows");

        let series = derive(&store, &esfe()).expect("derivation succeeds");
        assert!(series.values.is_empty());
        assert_eq!(series.skipped, 1);
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let store = RecordStore::new(vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(200.0)),
            Observation::new("M", "S", "Primary Energy", 2030, Some(500.0)),
        ])
        .expect("unique rows");
        let fed = IndicatorSpec::new("fed", Expr::var("Final Energy"), Some(0));

        let series = derive(&store, &fed).expect("derivation succeeds");
        assert_eq!(series.values.len(), 1);
        assert_eq!(series.values[0].value, 200.0);
    }

    #[test]
    fn same_variable_in_two_regions_is_a_data_quality_error() {
        let mut europe = Observation::new("M", "S", "Final Energy", 2030, Some(10.0));
        europe.region = "Europe".to_string();
        let store = RecordStore::new(vec![
            Observation::new("M", "S", "Final Energy", 2030, Some(100.0)),
            europe,
        ])
        .expect("regions differ so keys are unique");
        let fed = IndicatorSpec::new("fed", Expr::var("Final Energy"), None);

        let err = derive(&store, &fed).expect_err("duplicate cell");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn non_energy_ghg_weights_each_gas() {
        let registry = FormulaRegistry::ar6_ensemble();
        let nonnrg = registry
            .indicators
            .iter()
            .find(|spec| spec.name == "nonnrg")
            .expect("nonnrg is registered");

        let inputs = [
            ("Emissions|CO2", 30_000.0),
            ("Emissions|CO2|Energy", 25_000.0),
            ("Emissions|CH4", 300.0),
            ("Emissions|CH4|Energy", 100.0),
            ("Emissions|N2O", 9_000.0),
            ("Emissions|N2O|Energy", 1_000.0),
            ("Emissions|F-Gases", 1_000.0),
        ];
        let rows = inputs
            .iter()
            .map(|(variable, value)| Observation::new("M", "S", *variable, 2050, Some(*value)))
            .collect();
        let store = RecordStore::new(rows).expect("unique rows");

        let series = derive(&store, nonnrg).expect("derivation succeeds");
        // (5000 + 200 * 29.8 + 8000 * 0.273 + 1000) / 1000
        let expected = (5_000.0 + 5_960.0 + 2_184.0 + 1_000.0) / 1_000.0;
        assert_eq!(series.values.len(), 1);
        assert!((series.values[0].value - expected).abs() < 1e-9);
    }
}
