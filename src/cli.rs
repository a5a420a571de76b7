use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::label::LabelOrder;
use crate::merge::DEFAULT_EXCLUDED_YEARS;

#[derive(Parser, Debug)]
#[command(
    name = "ar6-constraints",
    version,
    about = "Scenario ensemble indicators, percentiles and model comparison tables"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize categories and exemplar markers of a records file.
    Inventory(InventoryArgs),
    /// Reduce one category of the ensemble to the wide constraints table.
    Constraints(ConstraintsArgs),
    /// Merge the constraints table with an energy-system model's results.
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "data/ar6_world_subset.csv")]
    pub records: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConstraintsArgs {
    #[arg(long, default_value = "data/ar6_world_subset.csv")]
    pub records: PathBuf,

    #[arg(long, default_value = "C1")]
    pub category: String,

    #[arg(long = "category-vocabulary")]
    pub category_vocabulary: Vec<String>,

    #[arg(long)]
    pub registry: Option<PathBuf>,

    #[arg(long, default_value = "data/constraints.csv")]
    pub output: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LabelOrderArg::PercentilesFirst)]
    pub label_order: LabelOrderArg,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long, default_value = "data/constraints.csv")]
    pub constraints: PathBuf,

    #[arg(long)]
    pub model_records: PathBuf,

    #[arg(long)]
    pub registry: Option<PathBuf>,

    #[arg(long = "exclude-year", default_values_t = DEFAULT_EXCLUDED_YEARS)]
    pub exclude_years: Vec<i32>,

    #[arg(long = "exclude-scenario")]
    pub exclude_scenarios: Vec<String>,

    #[arg(long, default_value = "outputs/model_vs_constraints.csv")]
    pub output: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LabelOrderArg {
    PercentilesFirst,
    ExemplarsFirst,
}

impl From<LabelOrderArg> for LabelOrder {
    fn from(arg: LabelOrderArg) -> Self {
        match arg {
            LabelOrderArg::PercentilesFirst => LabelOrder::PercentilesFirst,
            LabelOrderArg::ExemplarsFirst => LabelOrder::ExemplarsFirst,
        }
    }
}
