use anyhow::{Context, Result};
use tracing::info;

use super::PipelineInputs;
use crate::config::PipelineConfig;
use crate::table::csv::read_csv;

/// Read the happiness table and every reference source named by `config`.
pub fn load_inputs(config: &PipelineConfig) -> Result<PipelineInputs> {
    let happiness_path = config.happiness_path();
    let mut external = read_csv(&happiness_path)
        .with_context(|| format!("reading {}", happiness_path.display()))?;

    if !config.happiness_drop_columns.is_empty() {
        let drop: Vec<&str> = config
            .happiness_drop_columns
            .iter()
            .map(String::as_str)
            .collect();
        external = external
            .drop_columns(&drop)
            .context("dropping configured happiness columns")?;
    }

    let paths = config
        .reference_paths()
        .context("resolving reference sources")?;
    let mut references = Vec::with_capacity(paths.len());
    for path in &paths {
        let table = read_csv(path).with_context(|| format!("reading {}", path.display()))?;
        info!(path = %path.display(), rows = table.len(), "loaded reference source");
        references.push(table);
    }

    info!(
        happiness_rows = external.len(),
        sources = references.len(),
        "inputs loaded"
    );
    Ok(PipelineInputs {
        external,
        references,
    })
}
