use std::collections::BTreeMap;

use crate::derive::DerivedSeries;
use crate::error::{PipelineError, PipelineResult};
use crate::label::{LabelledValue, ScenarioLabel};

#[derive(Debug, Clone, PartialEq)]
pub struct Percentile {
    fraction: f64,
    label: ScenarioLabel,
}

impl Percentile {
    pub fn new(fraction: f64, label: ScenarioLabel) -> PipelineResult<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(PipelineError::configuration(format!(
                "percentile fraction {fraction} is outside [0, 1]"
            )));
        }
        if !label.is_percentile() {
            return Err(PipelineError::configuration(format!(
                "{label} is not a percentile label"
            )));
        }

        Ok(Self { fraction, label })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn label(&self) -> &ScenarioLabel {
        &self.label
    }
}

pub fn default_percentiles() -> PipelineResult<Vec<Percentile>> {
    [
        (0.05, ScenarioLabel::Fifth),
        (0.50, ScenarioLabel::Median),
        (0.95, ScenarioLabel::NinetyFifth),
    ]
    .into_iter()
    .map(|(fraction, label)| Percentile::new(fraction, label))
    .collect()
}

pub fn quantile(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = last as f64 * fraction;
    let lower = (position.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let weight = position - lower as f64;

    Some(sorted[lower] + weight * (sorted[upper] - sorted[lower]))
}

pub fn reduce(series: &DerivedSeries, percentiles: &[Percentile]) -> Vec<LabelledValue> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for value in &series.values {
        by_year.entry(value.year).or_default().push(value.value);
    }

    let mut reduced = Vec::with_capacity(by_year.len() * percentiles.len());
    for (year, mut members) in by_year {
        members.sort_by(f64::total_cmp);
        for percentile in percentiles {
            if let Some(value) = quantile(&members, percentile.fraction) {
                reduced.push(LabelledValue::new(percentile.label.clone(), year, value));
            }
        }
    }

    reduced
}
