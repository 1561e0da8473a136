//! Data models for run statistics.
//!
//! This module contains the tables passed between the pipeline stages:
//! the combined per-generation table produced by the loader and the
//! aggregated table produced by the aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed names of the six positional columns in a run file.
pub const RUN_COLUMNS: [&str; 6] = ["gen", "max", "min", "avg", "med", "none"];

/// Name of the generation column.
pub const GENERATION: &str = "gen";

/// A fitness statistic that can be averaged across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessColumn {
    Max,
    Min,
    Avg,
    Med,
}

impl FitnessColumn {
    /// Resolve a column name (`max`, `min`, `avg`, `med`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "max" => Some(FitnessColumn::Max),
            "min" => Some(FitnessColumn::Min),
            "avg" => Some(FitnessColumn::Avg),
            "med" => Some(FitnessColumn::Med),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FitnessColumn::Max => "max",
            FitnessColumn::Min => "min",
            FitnessColumn::Avg => "avg",
            FitnessColumn::Med => "med",
        }
    }
}

impl fmt::Display for FitnessColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One generation of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Index into [`CombinedTable::sources`].
    pub source: usize,
    /// Generation index.
    pub gen: u64,
    pub max: f64,
    pub min: f64,
    pub avg: f64,
    pub med: f64,
    /// Trailing sixth column. Read but never interpreted.
    pub none: String,
}

impl RunRecord {
    /// Returns the value of a fitness statistic.
    pub fn value(&self, column: FitnessColumn) -> f64 {
        match column {
            FitnessColumn::Max => self.max,
            FitnessColumn::Min => self.min,
            FitnessColumn::Avg => self.avg,
            FitnessColumn::Med => self.med,
        }
    }
}

/// A run file and the metadata derived for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSource {
    /// File name (no directory).
    pub file_name: String,
    /// Metadata values, aligned with [`CombinedTable::fields`].
    pub metadata: Vec<String>,
}

/// All run records from all matching files, concatenated in file order.
#[derive(Debug, Clone, Default)]
pub struct CombinedTable {
    /// Metadata field names (e.g. `mprob`, `mcauchy`, `run`).
    pub fields: Vec<String>,
    /// One entry per loaded file, in load order.
    pub sources: Vec<RunSource>,
    /// One entry per generation row.
    pub rows: Vec<RunRecord>,
}

impl CombinedTable {
    /// Creates an empty table with the given metadata fields.
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            sources: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Appends one file's rows. The `source` index of each record is rewritten.
    pub fn push_run(&mut self, source: RunSource, records: Vec<RunRecord>) {
        let index = self.sources.len();
        self.sources.push(source);
        self.rows.extend(records.into_iter().map(|mut r| {
            r.source = index;
            r
        }));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a metadata field, if it exists.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Metadata value of a row for the field at `field`.
    pub fn metadata(&self, row: &RunRecord, field: usize) -> &str {
        &self.sources[row.source].metadata[field]
    }
}

/// A single group-key component.
///
/// Generations compare numerically; metadata values compare as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Int(u64),
    Text(String),
}

impl KeyValue {
    /// Numeric view of the key, used for plot axes.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeyValue::Int(v) => Some(*v as f64),
            KeyValue::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for KeyValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyValue::Int(v) => serializer.serialize_u64(*v),
            KeyValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One row of the aggregated table.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    /// Key values, aligned with [`AggregatedTable::key_columns`].
    pub key: Vec<KeyValue>,
    /// Means, aligned with [`AggregatedTable::value_columns`].
    pub values: Vec<f64>,
    /// Number of combined-table rows in this group.
    pub count: usize,
}

/// Result of grouping the combined table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    pub key_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    pub fn key_index(&self, name: &str) -> Option<usize> {
        self.key_columns.iter().position(|c| c == name)
    }

    pub fn value_index(&self, name: &str) -> Option<usize> {
        self.value_columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Metadata about an exported table.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Date and time of the export.
    pub generated_at: DateTime<Utc>,
    /// Directory the run files were read from.
    pub input_dir: String,
    /// File name prefix used to select run files.
    pub prefix: String,
    /// Number of run files loaded.
    pub files_loaded: usize,
    /// Number of generation rows loaded.
    pub rows_loaded: usize,
}
