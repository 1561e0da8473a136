//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::{FilterSpec, Preset};
use clap::Parser;
use std::path::PathBuf;

/// EvoStats - fitness statistics for evolutionary-algorithm runs
///
/// Loads per-generation fitness files, averages them across runs that
/// share the same parameters, and draws one line per parameter setting.
///
/// Examples:
///   evostats
///   evostats --preset eval
///   evostats --preset eval --filter alg=cosyne -y avg_mean
///   evostats --dir results/ --prefix gsCoSyNE128 --open
///   evostats --preset eval --export eval.csv
///   evostats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Built-in experiment layout [default: gs1]
    ///
    /// When given, .evostats.toml in the current directory is not read.
    #[arg(short, long, value_name = "PRESET")]
    pub preset: Option<Preset>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .evostats.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "EVOSTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the run files
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Only load files whose name starts with this prefix
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// CSV manifest mapping file names to metadata
    ///
    /// Replaces filename parsing. Relative paths are resolved against --dir.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Aggregated column to plot on the y axis
    #[arg(short, long, value_name = "COLUMN")]
    pub y: Option<String>,

    /// Column selecting the line color
    #[arg(long, value_name = "COLUMN")]
    pub hue: Option<String>,

    /// Column selecting the line style
    #[arg(long, value_name = "COLUMN")]
    pub style: Option<String>,

    /// Only plot groups where COLUMN equals VALUE
    ///
    /// Example: --filter alg=cosyne
    #[arg(long, value_name = "COLUMN=VALUE")]
    pub filter: Option<FilterSpec>,

    /// Output image path (.png or .svg)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long, value_name = "PX")]
    pub height: Option<u32>,

    /// Open the chart in an image viewer and wait until it is closed
    #[arg(long)]
    pub open: bool,

    /// Also write the aggregated table to this file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Format of the exported table
    #[arg(long, default_value = "csv", value_name = "FORMAT")]
    pub export_format: ExportFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list matching files and their metadata without loading them
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .evostats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values (default)
    #[default]
    Csv,
    /// JSON with run metadata
    Json,
    /// Markdown table
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.width == Some(0) || self.height == Some(0) {
            return Err("Width and height must be at least 1 pixel".to_string());
        }

        if let Some(ref output) = self.output {
            let ext = output
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            if !matches!(ext.as_deref(), Some("png") | Some("svg")) {
                return Err(format!(
                    "Output file must end in .png or .svg: {}",
                    output.display()
                ));
            }
        }

        // Validate input directory if provided
        if let Some(ref dir) = self.dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!("Input path is not a directory: {}", dir.display()));
            }
        }

        if let Some(ref prefix) = self.prefix {
            if prefix.is_empty() {
                return Err("Prefix must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `general.verbose` from the config file; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            preset: None,
            config: None,
            dir: None,
            prefix: None,
            manifest: None,
            y: None,
            hue: None,
            style: None,
            filter: None,
            output: None,
            width: None,
            height: None,
            open: false,
            export: None,
            export_format: ExportFormat::Csv,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "evostats",
            "--preset",
            "eval",
            "--filter",
            "alg=cosyne",
            "-y",
            "avg_mean",
            "--export-format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.preset, Some(Preset::Eval));
        assert_eq!(args.y.as_deref(), Some("avg_mean"));
        assert_eq!(args.export_format, ExportFormat::Json);
        let filter = args.filter.unwrap();
        assert_eq!(filter.column, "alg");
        assert_eq!(filter.value, "cosyne");
    }

    #[test]
    fn test_preset_is_unset_by_default() {
        let args = Args::try_parse_from(["evostats"]).unwrap();
        assert_eq!(args.preset, None);
    }

    #[test]
    fn test_parse_rejects_bad_filter() {
        assert!(Args::try_parse_from(["evostats", "--filter", "cosyne"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_output_extension() {
        let mut args = make_args();
        args.output = Some(PathBuf::from("chart.svg"));
        assert!(args.validate().is_ok());

        args.output = Some(PathBuf::from("chart.PNG"));
        assert!(args.validate().is_ok());

        args.output = Some(PathBuf::from("chart.pdf"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_size() {
        let mut args = make_args();
        args.width = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
