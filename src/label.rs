use std::cmp::Ordering;
use std::fmt;

pub const EXEMPLAR_PREFIX: &str = "IMP-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioLabel {
    Fifth,
    Median,
    NinetyFifth,
    Exemplar(String),
    Source(String),
}

impl ScenarioLabel {
    pub fn exemplar(marker: &str) -> Self {
        Self::Exemplar(marker.to_string())
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "5th" => Self::Fifth,
            "Median" => Self::Median,
            "95th" => Self::NinetyFifth,
            other => match other.strip_prefix(EXEMPLAR_PREFIX) {
                Some(marker) if !marker.is_empty() => Self::Exemplar(marker.to_string()),
                _ => Self::Source(other.to_string()),
            },
        }
    }

    pub fn is_percentile(&self) -> bool {
        matches!(self, Self::Fifth | Self::Median | Self::NinetyFifth)
    }

    pub fn is_exemplar(&self) -> bool {
        matches!(self, Self::Exemplar(_))
    }

    pub fn is_ensemble(&self) -> bool {
        !matches!(self, Self::Source(_))
    }
}

impl fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifth => f.write_str("5th"),
            Self::Median => f.write_str("Median"),
            Self::NinetyFifth => f.write_str("95th"),
            Self::Exemplar(marker) => write!(f, "{EXEMPLAR_PREFIX}{marker}"),
            Self::Source(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelledValue {
    pub label: ScenarioLabel,
    pub year: i32,
    pub value: f64,
}

impl LabelledValue {
    pub fn new(label: ScenarioLabel, year: i32, value: f64) -> Self {
        Self { label, year, value }
    }
}

/// Which label group comes first in output tables. Plotting assigns one
/// legend entry per group on first occurrence, so this is part of the
/// output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelOrder {
    #[default]
    PercentilesFirst,
    ExemplarsFirst,
}

impl LabelOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PercentilesFirst => "percentiles-first",
            Self::ExemplarsFirst => "exemplars-first",
        }
    }

    fn group(self, label: &ScenarioLabel) -> u8 {
        match (self, label) {
            (_, ScenarioLabel::Source(_)) => 2,
            (Self::PercentilesFirst, label) if label.is_percentile() => 0,
            (Self::PercentilesFirst, _) => 1,
            (Self::ExemplarsFirst, label) if label.is_exemplar() => 0,
            (Self::ExemplarsFirst, _) => 1,
        }
    }

    pub fn compare(self, left: &ScenarioLabel, right: &ScenarioLabel) -> Ordering {
        self.group(left)
            .cmp(&self.group(right))
            .then_with(|| left.cmp(right))
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelOrder, ScenarioLabel};

    #[test]
    fn parse_and_display_agree() {
        for raw in ["5th", "Median", "95th", "IMP-Ren", "IMP-Neg-2.0", "base", "b500"] {
            assert_eq!(ScenarioLabel::parse(raw).to_string(), raw);
        }
        assert_eq!(ScenarioLabel::parse("IMP-Ren"), ScenarioLabel::exemplar("Ren"));
        assert_eq!(
            ScenarioLabel::parse("IMP-"),
            ScenarioLabel::Source("IMP-".to_string())
        );
    }

    #[test]
    fn percentiles_first_orders_groups_then_names() {
        let mut labels = vec![
            ScenarioLabel::Source("b500".to_string()),
            ScenarioLabel::exemplar("SP"),
            ScenarioLabel::NinetyFifth,
            ScenarioLabel::exemplar("LD"),
            ScenarioLabel::Median,
            ScenarioLabel::Fifth,
        ];
        labels.sort_by(|a, b| LabelOrder::PercentilesFirst.compare(a, b));

        let rendered: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["5th", "Median", "95th", "IMP-LD", "IMP-SP", "b500"]);
    }

    #[test]
    fn exemplars_first_keeps_source_labels_last() {
        let mut labels = vec![
            ScenarioLabel::Source("base".to_string()),
            ScenarioLabel::Median,
            ScenarioLabel::exemplar("Ren"),
        ];
        labels.sort_by(|a, b| LabelOrder::ExemplarsFirst.compare(a, b));

        let rendered: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["IMP-Ren", "Median", "base"]);
    }
}
