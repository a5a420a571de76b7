pub mod compare;
pub mod constraints;
pub mod inventory;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::derive::FormulaRegistry;

pub(crate) fn load_registry(
    path: Option<&Path>,
    builtin: fn() -> FormulaRegistry,
) -> Result<FormulaRegistry> {
    let Some(path) = path else {
        let registry = builtin();
        registry.validate()?;
        return Ok(registry);
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read registry: {}", path.display()))?;
    let registry = FormulaRegistry::parse(&raw)
        .with_context(|| format!("invalid registry: {}", path.display()))?;
    info!(
        path = %path.display(),
        indicators = %registry.indicator_names().join(","),
        "loaded formula registry"
    );
    Ok(registry)
}
