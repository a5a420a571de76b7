mod engine;
mod formula;
mod registry;

pub use engine::{DerivedSeries, DerivedValue, derive};
pub use formula::Expr;
pub use registry::{FormulaRegistry, IndicatorSpec};
