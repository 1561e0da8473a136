//! Load → aggregate → filter.
//!
//! Plotting and export consume the [`PipelineOutput`]; they live in `main`
//! because both are optional side effects.

use crate::analysis;
use crate::config::Config;
use crate::loader::RunLoader;
use crate::models::{AggregatedTable, ReportMetadata};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

/// Result of running the pipeline up to the aggregated table.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Number of run files loaded.
    pub files_loaded: usize,
    /// Number of generation rows in the combined table.
    pub rows_loaded: usize,
    /// Aggregated table, after the optional filter.
    pub aggregated: AggregatedTable,
}

impl PipelineOutput {
    /// Export metadata describing this run.
    pub fn metadata(&self, config: &Config) -> ReportMetadata {
        ReportMetadata {
            generated_at: Utc::now(),
            input_dir: config.input.dir.display().to_string(),
            prefix: config.input.prefix.clone(),
            files_loaded: self.files_loaded,
            rows_loaded: self.rows_loaded,
        }
    }
}

/// Load every run file selected by `config` and aggregate it.
pub fn run(config: &Config, show_progress: bool) -> Result<PipelineOutput> {
    let loader = RunLoader::from_config(&config.input).context("Failed to prepare loader")?;

    let combined = loader
        .load(show_progress)
        .with_context(|| format!("Failed to load runs from {}", loader.dir().display()))?;
    if combined.is_empty() {
        warn!(
            "No rows loaded: no file in {} starting with '{}' has data",
            loader.dir().display(),
            config.input.prefix
        );
    }

    let mut aggregated = analysis::aggregate(
        &combined,
        &config.aggregate.group_by,
        &config.aggregate.columns,
    )
    .context("Failed to aggregate runs")?;
    info!(
        "Aggregated {} rows into {} groups",
        combined.len(),
        aggregated.len()
    );

    if let Some(ref filter) = config.plot.filter {
        aggregated = analysis::filter_eq(&aggregated, &filter.column, &filter.value)
            .context("Failed to apply filter")?;
        info!(
            "Filter {}={} kept {} groups",
            filter.column,
            filter.value,
            aggregated.len()
        );
        if aggregated.is_empty() && !combined.is_empty() {
            warn!("Filter {}={} matched no groups", filter.column, filter.value);
        }
    }

    Ok(PipelineOutput {
        files_loaded: combined.sources.len(),
        rows_loaded: combined.len(),
        aggregated,
    })
}
