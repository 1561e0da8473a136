//! Run file discovery and parsing.
//!
//! This module lists the run files in the input directory, reads each one
//! as a headerless six-column table, attaches the metadata derived from the
//! file name (or a manifest) and concatenates everything into a single
//! [`CombinedTable`].

pub mod filename;
pub mod manifest;

pub use filename::FilenameSchema;
pub use manifest::Manifest;

use crate::config::{Delimiter, InputConfig};
use crate::error::LoadError;
use crate::models::{CombinedTable, RunRecord, RunSource, RUN_COLUMNS};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Where the metadata of a run file comes from.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    Filename(FilenameSchema),
    Manifest(Manifest),
}

impl MetadataSource {
    pub fn field_names(&self) -> Vec<String> {
        match self {
            MetadataSource::Filename(schema) => schema.field_names(),
            MetadataSource::Manifest(manifest) => manifest.fields().to_vec(),
        }
    }

    pub fn metadata_for(&self, file_name: &str) -> Result<Vec<String>, LoadError> {
        match self {
            MetadataSource::Filename(schema) => schema.parse(file_name),
            MetadataSource::Manifest(manifest) => manifest.lookup(file_name),
        }
    }
}

/// Loader for a directory of run files.
pub struct RunLoader {
    dir: PathBuf,
    prefix: String,
    delimiter: Delimiter,
    metadata: MetadataSource,
}

impl RunLoader {
    pub fn new(dir: PathBuf, prefix: String, delimiter: Delimiter, metadata: MetadataSource) -> Self {
        Self {
            dir,
            prefix,
            delimiter,
            metadata,
        }
    }

    /// Create a loader from the input configuration, reading the manifest if one is set.
    pub fn from_config(input: &InputConfig) -> Result<Self, LoadError> {
        let metadata = match input.manifest_path() {
            Some(path) => {
                info!("Reading manifest: {}", path.display());
                MetadataSource::Manifest(Manifest::load(&path)?)
            }
            None => MetadataSource::Filename(FilenameSchema::new(
                input.fields.clone(),
                input.run_field.clone(),
            )),
        };

        Ok(Self::new(
            input.dir.clone(),
            input.prefix.clone(),
            input.delimiter,
            metadata,
        ))
    }

    /// Metadata field names, in column order.
    pub fn field_names(&self) -> Vec<String> {
        self.metadata.field_names()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List matching file names, sorted lexically.
    pub fn scan(&self) -> Result<Vec<String>, LoadError> {
        if !self.dir.is_dir() {
            return Err(LoadError::DirectoryNotFound(self.dir.clone()));
        }

        let manifest_path = match &self.metadata {
            MetadataSource::Manifest(m) => Some(m.path().to_path_buf()),
            MetadataSource::Filename(_) => None,
        };

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| LoadError::Io {
                path: self.dir.clone(),
                source: e.into(),
            })?;

            if !entry.path().is_file() {
                continue;
            }
            if manifest_path.as_deref() == Some(entry.path()) {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                debug!("Skipping non UTF-8 file name: {}", entry.path().display());
                continue;
            };

            if name.starts_with(&self.prefix) {
                names.push(name.to_string());
            }
        }

        debug!(
            "Found {} files with prefix '{}' in {}",
            names.len(),
            self.prefix,
            self.dir.display()
        );
        Ok(names)
    }

    /// List matching files with their metadata, without reading them.
    pub fn describe(&self) -> Result<Vec<RunSource>, LoadError> {
        self.scan()?
            .into_iter()
            .map(|file_name| -> Result<RunSource, LoadError> {
                let metadata = self.metadata.metadata_for(&file_name)?;
                Ok(RunSource {
                    file_name,
                    metadata,
                })
            })
            .collect()
    }

    /// Load and concatenate every matching file.
    pub fn load(&self, show_progress: bool) -> Result<CombinedTable, LoadError> {
        let files = self.scan()?;
        let mut table = CombinedTable::new(self.metadata.field_names());

        let progress = if show_progress && !files.is_empty() {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for file_name in files {
            if let Some(ref pb) = progress {
                pb.set_message(file_name.clone());
            }

            let metadata = self.metadata.metadata_for(&file_name)?;
            let records = read_run_file(&self.dir.join(&file_name), self.delimiter)?;
            debug!("{}: {} rows, metadata {:?}", file_name, records.len(), metadata);

            table.push_run(
                RunSource {
                    file_name,
                    metadata,
                },
                records,
            );

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!(
            "Loaded {} rows from {} files",
            table.len(),
            table.sources.len()
        );
        Ok(table)
    }
}

/// Read one headerless six-column run file.
///
/// The `source` index of the returned records is left at zero.
pub fn read_run_file(path: &Path, delimiter: Delimiter) -> Result<Vec<RunRecord>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let delimiter = match delimiter {
        Delimiter::Auto => detect_delimiter(&content),
        other => other,
    };

    match delimiter {
        Delimiter::Whitespace => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                parse_row(&fields, &file, i as u64 + 1)
            })
            .collect(),
        _ => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(content.as_bytes());

            let mut records = Vec::new();
            for record in reader.records() {
                let record = record.map_err(|source| LoadError::Csv {
                    path: path.to_path_buf(),
                    source,
                })?;
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                let fields: Vec<&str> = record.iter().collect();
                records.push(parse_row(&fields, &file, line)?);
            }
            Ok(records)
        }
    }
}

/// Comma if the first non-blank line contains one, whitespace otherwise.
fn detect_delimiter(content: &str) -> Delimiter {
    match content.lines().find(|l| !l.trim().is_empty()) {
        Some(line) if !line.contains(',') => Delimiter::Whitespace,
        _ => Delimiter::Comma,
    }
}

fn parse_row(fields: &[&str], file: &str, line: u64) -> Result<RunRecord, LoadError> {
    if fields.len() != RUN_COLUMNS.len() {
        return Err(LoadError::ColumnCount {
            file: file.to_string(),
            line,
            found: fields.len(),
        });
    }

    let number = |index: usize| -> Result<f64, LoadError> {
        fields[index]
            .parse::<f64>()
            .map_err(|_| LoadError::InvalidNumber {
                file: file.to_string(),
                line,
                column: RUN_COLUMNS[index],
                value: fields[index].to_string(),
            })
    };

    Ok(RunRecord {
        source: 0,
        gen: parse_generation(fields[0]).ok_or_else(|| LoadError::InvalidNumber {
            file: file.to_string(),
            line,
            column: RUN_COLUMNS[0],
            value: fields[0].to_string(),
        })?,
        max: number(1)?,
        min: number(2)?,
        avg: number(3)?,
        med: number(4)?,
        none: fields[5].to_string(),
    })
}

/// Generation index; integral floats such as `3.0` are accepted.
fn parse_generation(value: &str) -> Option<u64> {
    if let Ok(gen) = value.parse::<u64>() {
        return Some(gen);
    }
    let float = value.parse::<f64>().ok()?;
    if float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64 {
        Some(float as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gs1_loader(dir: &Path) -> RunLoader {
        RunLoader::new(
            dir.to_path_buf(),
            "gsCoSyNE128".to_string(),
            Delimiter::Auto,
            MetadataSource::Filename(FilenameSchema::new(
                vec!["mprob".to_string(), "mcauchy".to_string()],
                "run".to_string(),
            )),
        )
    }

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let loader = gs1_loader(&dir.path().join("missing"));
        assert!(matches!(loader.scan(), Err(LoadError::DirectoryNotFound(_))));
        assert!(matches!(loader.load(false), Err(LoadError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_scan_filters_prefix_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "gsCoSyNE128_0.3_true_run2.csv", "0,1,1,1,1,\n");
        write(&dir, "gsCoSyNE128_0.1_true_run1.csv", "0,1,1,1,1,\n");
        write(&dir, "notes.txt", "ignore me");
        std::fs::create_dir(dir.path().join("gsCoSyNE128_subdir")).unwrap();

        let names = gs1_loader(dir.path()).scan().unwrap();
        assert_eq!(
            names,
            vec!["gsCoSyNE128_0.1_true_run1.csv", "gsCoSyNE128_0.3_true_run2.csv"]
        );
    }

    #[test]
    fn test_empty_directory_gives_empty_table() {
        let dir = TempDir::new().unwrap();
        let table = gs1_loader(dir.path()).load(false).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.fields, vec!["mprob", "mcauchy", "run"]);
    }

    #[test]
    fn test_concatenation_follows_file_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "gsCoSyNE128_0.5_false_run1.csv", "0,50,0,0,0,\n1,51,0,0,0,\n");
        write(&dir, "gsCoSyNE128_0.1_false_run1.csv", "0,10,0,0,0,\n1,11,0,0,0,\n");

        let table = gs1_loader(dir.path()).load(false).unwrap();
        let maxes: Vec<f64> = table.rows.iter().map(|r| r.max).collect();
        assert_eq!(maxes, vec![10.0, 11.0, 50.0, 51.0]);
        assert_eq!(table.metadata(&table.rows[0], 0), "0.1");
        assert_eq!(table.metadata(&table.rows[3], 0), "0.5");
        assert_eq!(table.sources[1].file_name, "gsCoSyNE128_0.5_false_run1.csv");
    }

    #[test]
    fn test_short_row_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "gsCoSyNE128_0.3_true_run1.csv", "0,1,2,3,4,\n1,1,2,3\n");

        let err = gs1_loader(dir.path()).load(false).unwrap_err();
        match err {
            LoadError::ColumnCount { file, line, found } => {
                assert_eq!(file, "gsCoSyNE128_0.3_true_run1.csv");
                assert_eq!(line, 2);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_filename_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "gsCoSyNE128_broken.csv", "0,1,2,3,4,\n");

        let err = gs1_loader(dir.path()).load(false).unwrap_err();
        assert!(matches!(err, LoadError::MalformedFilename { .. }));
    }

    #[test]
    fn test_invalid_number() {
        let dir = TempDir::new().unwrap();
        write(&dir, "gsCoSyNE128_0.3_true_run1.csv", "0,abc,2,3,4,\n");

        let err = gs1_loader(dir.path()).load(false).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidNumber { column: "max", line: 1, .. }
        ));
    }

    #[test]
    fn test_whitespace_delimited_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        std::fs::write(&path, "0  12.5 1.0\t6.0 5.5 x\n\n1 13.0 2.0 7.0 6.5 y\n").unwrap();

        let records = read_run_file(&path, Delimiter::Auto).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].gen, 0);
        assert_eq!(records[0].max, 12.5);
        assert_eq!(records[0].none, "x");
        assert_eq!(records[1].gen, 1);
        assert_eq!(records[1].med, 6.5);
    }

    #[test]
    fn test_comma_row_in_whitespace_file() {
        let dir = TempDir::new().unwrap();

        // the first line decides the delimiter for the whole file
        let path = dir.path().join("packed.txt");
        std::fs::write(&path, "0 12 1 6 5 x\n\n1,13,2,7,6,y\n").unwrap();
        let err = read_run_file(&path, Delimiter::Auto).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ColumnCount { line: 3, found: 1, .. }
        ));

        let path = dir.path().join("spaced.txt");
        std::fs::write(&path, "0 12 1 6 5 x\n1, 13, 2, 7, 6, y\n").unwrap();
        let err = read_run_file(&path, Delimiter::Whitespace).unwrap_err();
        match err {
            LoadError::InvalidNumber { file, line, column, value } => {
                assert_eq!(file, "spaced.txt");
                assert_eq!(line, 2);
                assert_eq!(column, "gen");
                assert_eq!(value, "1,");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_comma_delimited_with_spaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.csv");
        std::fs::write(&path, "0, 10.0, 1.0, 5.0, 4.0, \n1.0, 20.0, 2.0, 9.0, 8.0, 0\n").unwrap();

        let records = read_run_file(&path, Delimiter::Comma).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].avg, 5.0);
        assert_eq!(records[0].none, "");
        assert_eq!(records[1].gen, 1);
        assert_eq!(records[1].none, "0");
    }

    #[test]
    fn test_manifest_metadata() {
        let dir = TempDir::new().unwrap();
        write(&dir, "eval_a.csv", "0,10,0,0,0,\n");
        write(&dir, "eval_b.csv", "0,12,0,0,0,\n");
        write(&dir, "eval_manifest.csv", "file,alg,popSize\neval_a.csv,cosyne,50\neval_b.csv,easyea,50\n");

        let input = InputConfig {
            dir: dir.path().to_path_buf(),
            prefix: "eval_".to_string(),
            manifest: Some(PathBuf::from("eval_manifest.csv")),
            ..InputConfig::default()
        };

        let loader = RunLoader::from_config(&input).unwrap();
        let sources = loader.describe().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].metadata, vec!["cosyne", "50"]);

        let table = loader.load(false).unwrap();
        assert_eq!(table.fields, vec!["alg", "popSize"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.metadata(&table.rows[1], 0), "easyea");
    }

    #[test]
    fn test_parse_generation() {
        assert_eq!(parse_generation("7"), Some(7));
        assert_eq!(parse_generation("7.0"), Some(7));
        assert_eq!(parse_generation("7.5"), None);
        assert_eq!(parse_generation("-1"), None);
    }
}
