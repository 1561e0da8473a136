//! Error types for loading, aggregating and plotting run statistics.

use std::path::PathBuf;

/// Errors raised while discovering and parsing run files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{file}:{line}: expected 6 columns, found {found}")]
    ColumnCount {
        file: String,
        line: u64,
        found: usize,
    },

    #[error("{file}:{line}: column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        file: String,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("Malformed filename '{file}': {reason}")]
    MalformedFilename { file: String, reason: String },

    #[error("Manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("No manifest entry for '{0}'")]
    MissingManifestEntry(String),
}

/// Errors raised while grouping the combined table.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{0}' cannot be averaged")]
    NotNumeric(String),

    #[error("At least one group column is required")]
    NoGroupColumns,

    #[error("At least one aggregate column is required")]
    NoAggregates,
}

/// Errors raised while rendering a chart.
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Nothing to plot: the aggregated table has no points")]
    NoData,

    #[error("Value '{value}' in column '{column}' is not numeric")]
    NonNumericAxis { column: String, value: String },

    #[error("Unsupported output format '{0}' (use .png or .svg)")]
    UnsupportedFormat(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Failed to launch viewer '{viewer}': {source}")]
    Viewer {
        viewer: String,
        #[source]
        source: std::io::Error,
    },
}
