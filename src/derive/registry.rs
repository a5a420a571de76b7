use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::derive::formula::Expr;
use crate::error::{PipelineError, PipelineResult};

// AR6 GWP100 factors.
pub const GWP100_CH4: f64 = 29.8;
pub const GWP100_N2O: f64 = 273.0;

pub const KILO_TO_MEGA: f64 = 1.0e-3;
pub const MEGA_TO_GIGA: f64 = 1.0e-3;
pub const UNIT_TO_MEGA: f64 = 1.0e-6;
pub const PETA_TO_EXA: f64 = 1.0e-3;
/// Mt/EJ (and kt/PJ) to gCO2/kWh.
pub const PER_EXAJOULE_TO_PER_KWH: f64 = 3.6;

// Largest rounding precision an indicator may request.
pub const MAX_DECIMALS: u32 = 15;

pub const KYOTO_GASES: &str = "AR6 climate diagnostics|Infilled|Emissions|Kyoto Gases (AR6-GWP100)";
pub const MEDIAN_WARMING: &str =
    "AR6 climate diagnostics|Surface Temperature (GSAT)|MAGICCv7.5.3|50.0th Percentile";
pub const FINAL_ENERGY: &str = "Final Energy";
pub const FINAL_ENERGY_ELECTRICITY: &str = "Final Energy|Electricity";
pub const CCS_FOSSIL: &str = "Carbon Sequestration|CCS|Fossil";
pub const CO2_ELECTRICITY_SUPPLY: &str = "Emissions|CO2|Energy|Supply|Electricity";
pub const SECONDARY_ELECTRICITY: &str = "Secondary Energy|Electricity";
pub const PRIMARY_ENERGY: &str = "Primary Energy";
pub const PRIMARY_FOSSIL_CCS: &str = "Primary Energy|Fossil|w/ CCS";
pub const PRIMARY_NUCLEAR: &str = "Primary Energy|Nuclear";
pub const PRIMARY_RENEWABLES: &str = "Primary Energy|Renewables (incl. Biomass)";
pub const F_GASES: &str = "Emissions|F-Gases";

const GAS_SECTORS: [&str; 6] = [
    "",
    "|Energy",
    "|AFOLU",
    "|Waste",
    "|Industrial Processes",
    "|Other",
];

pub const MODEL_GHG: &str = "GHG";
pub const MODEL_NON_ENERGY_GHG: &str = "NONNRG";
pub const MODEL_CCS_FOSSIL: &str = "CCS|Fossil";
pub const MODEL_PRIMARY_LOW_CARBON: &str = "Primary Energy|Low-carbon";
pub const MODEL_PRIMARY_FOSSIL: &str = "Primary Energy|Fossil";
pub const MODEL_CO2_ELECTRICITY: &str = "Emissions|CO2|Electricity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub name: String,
    pub formula: Expr,
    #[serde(default)]
    pub decimals: Option<u32>,
}

impl IndicatorSpec {
    pub fn new(name: &str, formula: Expr, decimals: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            formula,
            decimals,
        }
    }

    pub fn required_variables(&self) -> BTreeSet<String> {
        self.formula.variables()
    }
}

/// Indicator order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRegistry {
    pub vocabulary: BTreeSet<String>,
    pub indicators: Vec<IndicatorSpec>,
}

impl FormulaRegistry {
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        let registry: Self = serde_json::from_str(raw).map_err(|err| {
            PipelineError::configuration(format!("invalid formula registry: {err}"))
        })?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.indicators.is_empty() {
            return Err(PipelineError::configuration(
                "formula registry defines no indicators",
            ));
        }

        let mut names = HashSet::new();
        for indicator in &self.indicators {
            if indicator.name.trim().is_empty() {
                return Err(PipelineError::configuration("indicator name is empty"));
            }
            if !names.insert(indicator.name.as_str()) {
                return Err(PipelineError::configuration(format!(
                    "indicator {:?} is defined twice",
                    indicator.name
                )));
            }

            if let Some(decimals) = indicator.decimals.filter(|d| *d > MAX_DECIMALS) {
                return Err(PipelineError::configuration(format!(
                    "indicator {:?} asks for {decimals} decimals; at most {MAX_DECIMALS} are supported",
                    indicator.name
                )));
            }

            let required = indicator.required_variables();
            if required.is_empty() {
                return Err(PipelineError::configuration(format!(
                    "indicator {:?} does not consume any variable",
                    indicator.name
                )));
            }
            if let Some(unknown) = required.iter().find(|v| !self.vocabulary.contains(*v)) {
                return Err(PipelineError::configuration(format!(
                    "indicator {:?} references {unknown:?}, which is not in the variable vocabulary",
                    indicator.name
                )));
            }
        }

        Ok(())
    }

    pub fn indicator_names(&self) -> Vec<String> {
        self.indicators
            .iter()
            .map(|indicator| indicator.name.clone())
            .collect()
    }

    pub fn ar6_ensemble() -> Self {
        let mut vocabulary: BTreeSet<String> = [
            KYOTO_GASES,
            MEDIAN_WARMING,
            FINAL_ENERGY,
            FINAL_ENERGY_ELECTRICITY,
            CCS_FOSSIL,
            CO2_ELECTRICITY_SUPPLY,
            SECONDARY_ELECTRICITY,
            PRIMARY_ENERGY,
            PRIMARY_FOSSIL_CCS,
            PRIMARY_NUCLEAR,
            PRIMARY_RENEWABLES,
            F_GASES,
        ]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();
        for gas in ["CO2", "CH4", "N2O"] {
            for sector in GAS_SECTORS {
                vocabulary.insert(format!("Emissions|{gas}{sector}"));
            }
        }

        let non_energy = |gas: &str| {
            Expr::sub(
                Expr::var(&format!("Emissions|{gas}")),
                Expr::var(&format!("Emissions|{gas}|Energy")),
            )
        };

        let indicators = vec![
            IndicatorSpec::new("ghg", Expr::var(KYOTO_GASES).scaled(MEGA_TO_GIGA), Some(3)),
            IndicatorSpec::new(
                "lcspe",
                Expr::div(
                    Expr::sum([
                        Expr::var(PRIMARY_FOSSIL_CCS),
                        Expr::var(PRIMARY_NUCLEAR),
                        Expr::var(PRIMARY_RENEWABLES),
                    ]),
                    Expr::var(PRIMARY_ENERGY),
                ),
                Some(2),
            ),
            IndicatorSpec::new("fed", Expr::var(FINAL_ENERGY), Some(0)),
            IndicatorSpec::new(
                "esfe",
                Expr::div(Expr::var(FINAL_ENERGY_ELECTRICITY), Expr::var(FINAL_ENERGY)),
                Some(2),
            ),
            IndicatorSpec::new(
                "co2elc",
                Expr::div(
                    Expr::var(CO2_ELECTRICITY_SUPPLY),
                    Expr::var(SECONDARY_ELECTRICITY),
                )
                .scaled(PER_EXAJOULE_TO_PER_KWH),
                Some(0),
            ),
            IndicatorSpec::new("ccsfos", Expr::var(CCS_FOSSIL).scaled(MEGA_TO_GIGA), Some(3)),
            // CO2 in Mt, CH4 in Mt, N2O in kt.
            IndicatorSpec::new(
                "nonnrg",
                Expr::sum([
                    non_energy("CO2"),
                    non_energy("CH4").scaled(GWP100_CH4),
                    non_energy("N2O").scaled(GWP100_N2O * KILO_TO_MEGA),
                    Expr::var(F_GASES),
                ])
                .scaled(MEGA_TO_GIGA),
                Some(3),
            ),
        ];

        Self {
            vocabulary,
            indicators,
        }
    }

    pub fn energy_model() -> Self {
        let vocabulary: BTreeSet<String> = [
            MODEL_GHG,
            MODEL_NON_ENERGY_GHG,
            MODEL_CCS_FOSSIL,
            FINAL_ENERGY,
            FINAL_ENERGY_ELECTRICITY,
            MODEL_PRIMARY_LOW_CARBON,
            MODEL_PRIMARY_FOSSIL,
            SECONDARY_ELECTRICITY,
            MODEL_CO2_ELECTRICITY,
        ]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();

        let indicators = vec![
            IndicatorSpec::new("ghg", Expr::var(MODEL_GHG).scaled(UNIT_TO_MEGA), None),
            IndicatorSpec::new(
                "lcspe",
                Expr::div(
                    Expr::var(MODEL_PRIMARY_LOW_CARBON),
                    Expr::sum([
                        Expr::var(MODEL_PRIMARY_LOW_CARBON),
                        Expr::var(MODEL_PRIMARY_FOSSIL),
                    ]),
                ),
                None,
            ),
            IndicatorSpec::new("fed", Expr::var(FINAL_ENERGY).scaled(PETA_TO_EXA), None),
            IndicatorSpec::new(
                "esfe",
                Expr::div(Expr::var(FINAL_ENERGY_ELECTRICITY), Expr::var(FINAL_ENERGY)),
                None,
            ),
            IndicatorSpec::new(
                "co2elc",
                Expr::div(
                    Expr::var(MODEL_CO2_ELECTRICITY),
                    Expr::var(SECONDARY_ELECTRICITY),
                )
                .scaled(PER_EXAJOULE_TO_PER_KWH),
                None,
            ),
            IndicatorSpec::new(
                "ccsfos",
                Expr::var(MODEL_CCS_FOSSIL).scaled(UNIT_TO_MEGA),
                None,
            ),
            IndicatorSpec::new(
                "nonnrg",
                Expr::var(MODEL_NON_ENERGY_GHG).scaled(UNIT_TO_MEGA),
                None,
            ),
        ];

        Self {
            vocabulary,
            indicators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FormulaRegistry, IndicatorSpec, MAX_DECIMALS};
    use crate::derive::formula::Expr;

    #[test]
    fn built_in_registries_are_valid() {
        let ensemble = FormulaRegistry::ar6_ensemble();
        ensemble.validate().expect("ensemble registry should validate");
        assert_eq!(ensemble.vocabulary.len(), 30);
        assert_eq!(
            ensemble.indicator_names(),
            vec!["ghg", "lcspe", "fed", "esfe", "co2elc", "ccsfos", "nonnrg"]
        );

        let model = FormulaRegistry::energy_model();
        model.validate().expect("model registry should validate");
        assert_eq!(model.indicator_names(), ensemble.indicator_names());
    }

    #[test]
    fn unknown_variable_is_a_configuration_error() {
        let mut registry = FormulaRegistry::ar6_ensemble();
        registry.indicators.push(IndicatorSpec::new(
            "hydrogen",
            Expr::var("Final Energy|Hydrogen"),
            None,
        ));

        let err = registry.validate().expect_err("variable is outside the vocabulary");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Final Energy|Hydrogen"));
    }

    #[test]
    fn duplicate_indicator_name_is_a_configuration_error() {
        let mut registry = FormulaRegistry::ar6_ensemble();
        let duplicate = registry.indicators[0].clone();
        registry.indicators.push(duplicate);

        let err = registry.validate().expect_err("ghg defined twice");
        assert!(err.is_configuration());
    }

    #[test]
    fn constant_only_formula_is_rejected() {
        let mut registry = FormulaRegistry::ar6_ensemble();
        registry
            .indicators
            .push(IndicatorSpec::new("zero", Expr::Const(0.0), None));

        let err = registry.validate().expect_err("no variables consumed");
        assert!(err.is_configuration());
    }

    #[test]
    fn parses_registry_json() {
        let raw = r#"
        {
          "vocabulary": ["Final Energy", "Final Energy|Electricity"],
          "indicators": [
            {
              "name": "esfe",
              "decimals": 2,
              "formula": {"div": [{"var": "Final Energy|Electricity"}, {"var": "Final Energy"}]}
            },
            {
              "name": "fed",
              "formula": {"var": "Final Energy"}
            }
          ]
        }
        "#;

        let registry = FormulaRegistry::parse(raw).expect("registry json should parse");
        assert_eq!(registry.indicator_names(), vec!["esfe", "fed"]);
        assert_eq!(registry.indicators[0].decimals, Some(2));
        assert_eq!(registry.indicators[1].decimals, None);
    }

    #[test]
    fn excessive_decimals_are_rejected() {
        let raw = r#"
        {
            "vocabulary": ["Final Energy"],
            "indicators": [
                {"name": "fed", "formula": {"var": "Final Energy"}, "decimals": 400}
            ]
        }
        "#;

        let err = FormulaRegistry::parse(raw).expect_err("400 decimals");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("400 decimals"));

        let mut registry = FormulaRegistry::ar6_ensemble();
        registry.indicators[0].decimals = Some(MAX_DECIMALS);
        registry.validate().expect("upper bound is accepted");
    }

    #[test]
    fn malformed_registry_json_is_a_configuration_error() {
        let err = FormulaRegistry::parse("{\"indicators\": 3}").expect_err("bad shape");
        assert!(err.is_configuration());
    }
}
