//! Metadata extraction from run file names.
//!
//! Run files are named `<prefix>_<field1>_<field2>_..._run<digit>...`.
//! Segment `i` (split on `_`) carries field `i`, and the fourth character
//! of the last segment is the run identifier.

use crate::error::LoadError;

/// Positional naming convention for run files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameSchema {
    fields: Vec<String>,
    run_field: String,
}

impl FilenameSchema {
    pub fn new(fields: Vec<String>, run_field: String) -> Self {
        Self { fields, run_field }
    }

    /// Field names in the order [`parse`](Self::parse) returns values.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = self.fields.clone();
        names.push(self.run_field.clone());
        names
    }

    /// Derive the metadata values for `file_name`.
    ///
    /// `gsCoSyNE128_0.3_true_run2.csv` yields `["0.3", "true", "2"]` for the
    /// fields `mprob`, `mcauchy`, `run`.
    pub fn parse(&self, file_name: &str) -> Result<Vec<String>, LoadError> {
        let malformed = |reason: String| LoadError::MalformedFilename {
            file: file_name.to_string(),
            reason,
        };

        let segments: Vec<&str> = file_name.split('_').collect();

        // prefix + one segment per field + the run segment
        let required = self.fields.len() + 2;
        if segments.len() < required {
            return Err(malformed(format!(
                "expected at least {} '_'-separated segments, found {}",
                required,
                segments.len()
            )));
        }

        let mut values = Vec::with_capacity(self.fields.len() + 1);
        for (i, field) in self.fields.iter().enumerate() {
            let segment = segments[i + 1];
            if segment.is_empty() {
                return Err(malformed(format!("segment {} ({}) is empty", i + 1, field)));
            }
            values.push(segment.to_string());
        }

        let last = segments[segments.len() - 1];
        if !last.starts_with("run") {
            return Err(malformed(format!(
                "last segment '{}' does not start with 'run'",
                last
            )));
        }
        match last.chars().nth(3) {
            Some(c) if c.is_ascii_digit() => values.push(c.to_string()),
            Some(c) => {
                return Err(malformed(format!("run identifier '{}' is not a digit", c)));
            }
            None => return Err(malformed("missing run identifier after 'run'".to_string())),
        }

        Ok(values)
    }
}
