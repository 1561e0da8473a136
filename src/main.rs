//! EvoStats - fitness statistics plotter for evolutionary-algorithm runs
//!
//! Loads per-generation run files from a directory, derives experiment
//! metadata from each file name, averages the runs per generation and
//! draws one line per parameter combination.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing directory, malformed file, bad config, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod plot;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, ConfigOrigin, CONFIG_FILE};
use loader::RunLoader;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config(&args);
    }

    // Resolve the config before logging so general.verbose can raise the level
    let resolved = Config::resolve(args.config.as_deref(), args.preset, Path::new(CONFIG_FILE));
    let config_verbose = matches!(&resolved, Ok((config, _)) if config.general.verbose);
    init_logging(&args, config_verbose);

    info!("EvoStats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = resolved.and_then(|(config, origin)| {
        log_config_origin(&args, &origin);
        run(&args, config)
    });

    if let Err(e) = result {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: write the selected preset to .evostats.toml.
fn handle_init_config(args: &Args) -> Result<()> {
    let path = Path::new(CONFIG_FILE);
    let preset = args.preset.unwrap_or_default();

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::preset(preset).to_toml()?;
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} from the {:?} preset.", CONFIG_FILE, preset);
    println!("   Edit it to change the input directory, metadata fields, grouping and chart.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the load → aggregate → plot workflow.
fn run(args: &Args, mut config: Config) -> Result<()> {
    let start_time = Instant::now();

    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;
    debug!("Effective config: {:?}", config);

    if args.dry_run {
        return handle_dry_run(&config);
    }

    // Step 1 and 2: load and aggregate
    println!(
        "📥 Loading '{}*' runs from {}",
        config.input.prefix,
        config.input.dir.display()
    );
    let output = pipeline::run(&config, !args.quiet)?;

    // Step 3: optional export of the aggregated table
    if let Some(ref path) = args.export {
        let metadata = output.metadata(&config);
        report::write_export(&output.aggregated, &metadata, args.export_format, path)?;
        println!("💾 Exported {} groups to {}", output.aggregated.len(), path.display());
    }

    // Step 4: plot
    println!("\n📈 Plotting {} against {}...", config.plot.y, config.plot.x);
    let series = plot::build_series(&output.aggregated, &config.plot)
        .context("Failed to build chart series")?;
    plot::render(&series, &config.plot)
        .with_context(|| format!("Failed to render {}", config.plot.output.display()))?;

    println!("\n📊 Summary:");
    println!("   Files loaded: {}", output.files_loaded);
    println!("   Rows loaded: {}", output.rows_loaded);
    println!("   Groups: {}", output.aggregated.len());
    if let Ok(generations) = analysis::distinct_keys(&output.aggregated, models::GENERATION) {
        println!("   Generations: {}", generations.len());
    }
    println!("   Lines drawn: {}", series.len());
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Chart saved to: {}", config.plot.output.display());

    // Step 5: display, blocking until the viewer is closed
    if config.plot.open {
        plot::open_blocking(&config.plot.output, config.plot.viewer.as_deref())?;
    }

    Ok(())
}

/// Handle --dry-run: list matching files and their metadata, exit.
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("\n🔍 Dry run: scanning {} (no files read)...\n", config.input.dir.display());

    let loader = RunLoader::from_config(&config.input)?;
    let fields = loader.field_names();
    let sources = loader.describe()?;

    if sources.is_empty() {
        println!("   No files start with '{}'.", config.input.prefix);
    } else {
        println!("   Found {} files that would be loaded:\n", sources.len());
        for source in &sources {
            let metadata: Vec<String> = fields
                .iter()
                .zip(&source.metadata)
                .map(|(field, value)| format!("{}={}", field, value))
                .collect();
            println!("     📄 {} ({})", source.file_name, metadata.join(", "));
        }
        println!("\n   Total: {} files", sources.len());
    }

    println!("\n✅ Dry run complete. Nothing was plotted.");
    Ok(())
}

/// Report which configuration is in effect.
fn log_config_origin(args: &Args, origin: &ConfigOrigin) {
    match origin {
        ConfigOrigin::Explicit(path) => {
            info!("Loaded config from: {}", path.display());
            if let Some(preset) = args.preset {
                warn!("--preset {:?} ignored: {} takes precedence", preset, path.display());
            }
        }
        ConfigOrigin::DefaultFile(path) => {
            info!("Loaded default config from {}", path.display());
        }
        ConfigOrigin::Preset(preset) => {
            debug!("No config file found, using the {:?} preset", preset);
        }
        ConfigOrigin::PresetOverDefaultFile(preset) => {
            info!("Using the {:?} preset; {} not read", preset, CONFIG_FILE);
        }
        ConfigOrigin::InvalidDefaultFile { preset, error } => {
            warn!("Failed to load config: {}", error);
            warn!("Falling back to the {:?} preset", preset);
        }
    }
}
