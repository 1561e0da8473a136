//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.evostats.toml` files, and provides the built-in presets for the
//! CoSyNE grid-search and algorithm-evaluation experiments.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".evostats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input discovery and parsing.
    #[serde(default)]
    pub input: InputConfig,

    /// Group-by settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,

    /// Chart settings.
    #[serde(default)]
    pub plot: PlotConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::preset(Preset::Gs1)
    }
}

/// Built-in experiment layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// CoSyNE grid search: mutation probability x Cauchy mutation
    #[default]
    Gs1,
    /// Algorithm evaluation: algorithm x population size
    Eval,
}

/// Where [`Config::resolve`] found the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// `--config FILE` or `EVOSTATS_CONFIG`.
    Explicit(PathBuf),
    /// `.evostats.toml` in the working directory.
    DefaultFile(PathBuf),
    /// A built-in preset, no config file present.
    Preset(Preset),
    /// `--preset` was given and `.evostats.toml` was skipped.
    PresetOverDefaultFile(Preset),
    /// `.evostats.toml` could not be parsed; the preset was used instead.
    InvalidDefaultFile { preset: Preset, error: String },
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// How columns are separated inside a run file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// Comma if the line contains one, whitespace otherwise.
    #[default]
    Auto,
    Comma,
    Whitespace,
}

/// Where run files live and how their metadata is derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the run files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Only files whose name starts with this prefix are loaded.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Column separator.
    #[serde(default)]
    pub delimiter: Delimiter,

    /// Names of the metadata carried by filename segments 1 and 2.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Name of the run identifier field.
    #[serde(default = "default_run_field")]
    pub run_field: String,

    /// Optional CSV manifest mapping file names to metadata.
    /// Relative paths are resolved against `dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            prefix: default_prefix(),
            delimiter: Delimiter::Auto,
            fields: default_fields(),
            run_field: default_run_field(),
            manifest: None,
        }
    }
}

impl InputConfig {
    /// Manifest path resolved against the input directory.
    pub fn manifest_path(&self) -> Option<PathBuf> {
        self.manifest.as_ref().map(|m| {
            if m.is_absolute() {
                m.clone()
            } else {
                self.dir.join(m)
            }
        })
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("CosyneGS1")
}

fn default_prefix() -> String {
    "gsCoSyNE128".to_string()
}

fn default_fields() -> Vec<String> {
    vec!["mprob".to_string(), "mcauchy".to_string()]
}

fn default_run_field() -> String {
    "run".to_string()
}

/// A mean to compute: `source` column averaged into `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub source: String,
    pub name: String,
}

impl AggregateSpec {
    pub fn new(source: &str, name: &str) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
        }
    }
}

/// Group-by settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Columns forming the group key.
    #[serde(default = "default_group_by")]
    pub group_by: Vec<String>,

    /// Means to compute per group.
    #[serde(default = "default_columns")]
    pub columns: Vec<AggregateSpec>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            group_by: default_group_by(),
            columns: default_columns(),
        }
    }
}

fn default_group_by() -> Vec<String> {
    vec!["gen".to_string(), "mprob".to_string(), "mcauchy".to_string()]
}

fn default_columns() -> Vec<AggregateSpec> {
    vec![AggregateSpec::new("avg", "avg_mean")]
}

/// Keep only aggregated rows where `column == value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub value: String,
}

impl std::str::FromStr for FilterSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((column, value)) if !column.trim().is_empty() => Ok(Self {
                column: column.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(format!("expected COLUMN=VALUE, got '{}'", s)),
        }
    }
}

/// Chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Column on the x axis.
    #[serde(default = "default_x")]
    pub x: String,

    /// Aggregated column on the y axis.
    #[serde(default = "default_y")]
    pub y: String,

    /// Key column selecting the line color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<String>,

    /// Key column selecting the line style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default = "default_x_label")]
    pub x_label: String,

    /// Defaults to the y column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSpec>,

    /// Output image; the extension picks PNG or SVG.
    #[serde(default = "default_plot_output")]
    pub output: PathBuf,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Open the rendered chart in an image viewer and wait for it to close.
    #[serde(default)]
    pub open: bool,

    /// Viewer command; the platform default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<String>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            x: default_x(),
            y: default_y(),
            hue: Some("mprob".to_string()),
            style: Some("mcauchy".to_string()),
            x_label: default_x_label(),
            y_label: None,
            title: None,
            filter: None,
            output: default_plot_output(),
            width: default_width(),
            height: default_height(),
            open: false,
            viewer: None,
        }
    }
}

impl PlotConfig {
    /// Label for the y axis.
    pub fn effective_y_label(&self) -> &str {
        self.y_label.as_deref().unwrap_or(&self.y)
    }
}

fn default_x() -> String {
    "gen".to_string()
}

fn default_y() -> String {
    "avg_mean".to_string()
}

fn default_x_label() -> String {
    "Generation".to_string()
}

fn default_plot_output() -> PathBuf {
    PathBuf::from("statsplot_gs1.png")
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    800
}

impl Config {
    /// Built-in configuration for a preset.
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Gs1 => Self {
                general: GeneralConfig::default(),
                input: InputConfig::default(),
                aggregate: AggregateConfig::default(),
                plot: PlotConfig::default(),
            },
            Preset::Eval => Self {
                general: GeneralConfig::default(),
                input: InputConfig {
                    dir: PathBuf::from("alg_eval"),
                    prefix: "eval_".to_string(),
                    delimiter: Delimiter::Auto,
                    fields: vec!["alg".to_string(), "popSize".to_string()],
                    run_field: default_run_field(),
                    manifest: None,
                },
                aggregate: AggregateConfig {
                    group_by: vec!["gen".to_string(), "alg".to_string(), "popSize".to_string()],
                    columns: vec![
                        AggregateSpec::new("max", "max_mean"),
                        AggregateSpec::new("avg", "avg_mean"),
                    ],
                },
                plot: PlotConfig {
                    y: "max_mean".to_string(),
                    hue: Some("alg".to_string()),
                    style: Some("popSize".to_string()),
                    y_label: Some("Mean of Max Fitness".to_string()),
                    output: PathBuf::from("statsplot_eval.png"),
                    ..PlotConfig::default()
                },
            },
        }
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Pick the configuration to run with.
    ///
    /// Order: `explicit` (`--config`), then an explicitly selected `preset`,
    /// then `default_path` (`.evostats.toml`), then the `gs1` preset. A default
    /// file that exists but cannot be parsed falls back to the preset; an
    /// unreadable explicit file is an error.
    pub fn resolve(
        explicit: Option<&Path>,
        preset: Option<Preset>,
        default_path: &Path,
    ) -> Result<(Self, ConfigOrigin)> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            return Ok((config, ConfigOrigin::Explicit(path.to_path_buf())));
        }

        if let Some(preset) = preset {
            let origin = if default_path.exists() {
                ConfigOrigin::PresetOverDefaultFile(preset)
            } else {
                ConfigOrigin::Preset(preset)
            };
            return Ok((Self::preset(preset), origin));
        }

        let preset = Preset::default();
        if !default_path.exists() {
            return Ok((Self::preset(preset), ConfigOrigin::Preset(preset)));
        }

        match Self::load(default_path) {
            Ok(config) => Ok((config, ConfigOrigin::DefaultFile(default_path.to_path_buf()))),
            Err(e) => Ok((
                Self::preset(preset),
                ConfigOrigin::InvalidDefaultFile {
                    preset,
                    error: format!("{:#}", e),
                },
            )),
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where the CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.dir {
            self.input.dir = dir.clone();
        }
        if let Some(ref prefix) = args.prefix {
            self.input.prefix = prefix.clone();
        }
        if let Some(ref manifest) = args.manifest {
            self.input.manifest = Some(manifest.clone());
        }

        if let Some(ref y) = args.y {
            self.plot.y = y.clone();
            // The preset label describes the preset's y column only.
            self.plot.y_label = None;
        }
        if let Some(ref hue) = args.hue {
            self.plot.hue = Some(hue.clone());
        }
        if let Some(ref style) = args.style {
            self.plot.style = Some(style.clone());
        }
        if let Some(ref filter) = args.filter {
            self.plot.filter = Some(filter.clone());
        }
        if let Some(ref output) = args.output {
            self.plot.output = output.clone();
        }
        if let Some(width) = args.width {
            self.plot.width = width;
        }
        if let Some(height) = args.height {
            self.plot.height = height;
        }

        // Flags always override
        if args.open {
            self.plot.open = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the configuration for inconsistencies before running.
    pub fn validate(&self) -> Result<()> {
        if self.input.prefix.is_empty() {
            bail!("input.prefix must not be empty");
        }
        if self.aggregate.group_by.is_empty() {
            bail!("aggregate.group_by must name at least one column");
        }
        if self.aggregate.columns.is_empty() {
            bail!("aggregate.columns must name at least one mean");
        }

        let mut seen = HashSet::new();
        for field in self.input.fields.iter().chain(std::iter::once(&self.input.run_field)) {
            if field == crate::models::GENERATION {
                bail!("metadata field '{}' clashes with the generation column", field);
            }
            if !seen.insert(field.as_str()) {
                bail!("metadata field '{}' is declared twice", field);
            }
        }

        if !self.aggregate.columns.iter().any(|c| c.name == self.plot.y) {
            bail!(
                "plot.y '{}' is not one of the aggregate columns ({})",
                self.plot.y,
                self.aggregate
                    .columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        if self.plot.width == 0 || self.plot.height == 0 {
            bail!("plot width and height must be at least 1 pixel");
        }

        Ok(())
    }

    /// Serialize this configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
