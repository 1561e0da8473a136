//! Manifest files mapping run file names to metadata.
//!
//! A manifest is a CSV file with a header row. The first column holds the
//! run file name, every further column is a metadata field:
//!
//! ```text
//! file,alg,popSize,run
//! results_a.csv,cosyne,50,1
//! results_b.csv,cosyne,50,2
//! ```

use crate::error::LoadError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    fields: Vec<String>,
    entries: HashMap<String, Vec<String>>,
}

impl Manifest {
    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let invalid = |reason: String| LoadError::Manifest {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

        let headers = reader
            .headers()
            .map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .clone();

        if headers.get(0) != Some("file") {
            return Err(invalid("first column must be named 'file'".to_string()));
        }
        let fields: Vec<String> = headers.iter().skip(1).map(String::from).collect();
        if fields.is_empty() {
            return Err(invalid("no metadata columns".to_string()));
        }

        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() != headers.len() {
                return Err(invalid(format!(
                    "line {}: expected {} columns, found {}",
                    line,
                    headers.len(),
                    record.len()
                )));
            }

            let file = record[0].to_string();
            let values = record.iter().skip(1).map(String::from).collect();
            if entries.insert(file.clone(), values).is_some() {
                return Err(invalid(format!("line {}: duplicate entry for '{}'", line, file)));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            fields,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Metadata values for a run file.
    pub fn lookup(&self, file_name: &str) -> Result<Vec<String>, LoadError> {
        self.entries
            .get(file_name)
            .cloned()
            .ok_or_else(|| LoadError::MissingManifestEntry(file_name.to_string()))
    }
}
