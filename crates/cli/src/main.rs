//! Havvind CLI - offshore wind siting for Danish waters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use havvind_core::io::{read_geotiff, VectorPackage};
use havvind_core::Raster;
use havvind_pipeline::ingest::load_layers;
use havvind_pipeline::{analyze, publish, SitingConfig, SitingReport};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "havvind")]
#[command(author, version, about = "Offshore wind siting for Danish waters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the siting pipeline
    Run {
        /// JSON configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output directory, overriding the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write zone and suitability rasters as GeoTIFF
        #[arg(long)]
        geotiff: bool,
    },
    /// Print the default configuration as JSON
    DefaultConfig,
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// List the layers of a vector package
    Layers {
        /// Directory of shapefiles or a single .shp file
        package: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<SitingConfig> {
    match path {
        Some(path) => SitingConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => {
            info!("No configuration given, using defaults");
            Ok(SitingConfig::default())
        }
    }
}

/// Attach the failing step and the error class a user needs to act on
fn step<T>(result: havvind_pipeline::Result<T>, what: &str) -> Result<T> {
    result.map_err(|e| {
        let class = if e.is_data_access() {
            "input data"
        } else if e.is_configuration() {
            "configuration"
        } else {
            "processing"
        };
        anyhow::Error::new(e).context(format!("{what} ({class} error)"))
    })
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn print_summary(report: &SitingReport) {
    println!("CRS: {}", report.crs);
    println!(
        "Turbines: {} total, {} offshore, {} onshore",
        report.turbines.total, report.turbines.offshore, report.turbines.onshore
    );
    println!(
        "Offshore depth (m): min {}  max {}  mean {}",
        fmt_opt(report.offshore_depth.min),
        fmt_opt(report.offshore_depth.max),
        fmt_opt(report.offshore_depth.mean)
    );

    println!("\nZone cells:");
    for stage in &report.zones {
        let per_zone: Vec<String> = stage.per_zone.iter().map(|(z, n)| format!("{z}:{n}")).collect();
        println!("  {:<16} {:>8}  [{}]", stage.stage, stage.cells, per_zone.join(" "));
    }

    println!("\nExclusions:");
    for exclusion in &report.exclusions {
        println!(
            "  {:<16} {:>10.1} km²  {:>8} cells removed",
            exclusion.kind.name(), exclusion.area_km2, exclusion.cells_removed
        );
    }

    println!(
        "\nWind power over suitable cells (W/m²): min {}  max {}  mean {}  ({} cells)",
        fmt_opt(report.suitability.min),
        fmt_opt(report.suitability.max),
        fmt_opt(report.suitability.mean),
        report.suitability.count
    );
    if report.uncovered_cells > 0 {
        println!("  {} zone cells outside the wind raster", report.uncovered_cells);
    }
}

fn done(report: &SitingReport, elapsed: Duration) {
    for file in &report.files {
        println!("Saved: {}", file.display());
    }
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            output,
            geotiff,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(dir) = output {
                config.output.directory = dir;
            }
            config.output.geotiff |= geotiff;
            step(config.validate(), "Invalid configuration")?;

            let start = Instant::now();

            let pb = spinner("Loading layers...");
            let layers = step(
                load_layers(&config.inputs, config.analysis.depth_sign),
                "Failed to load input layers",
            )?;
            pb.finish_and_clear();

            let pb = spinner("Analysing...");
            let analysis = step(analyze(layers, &config.analysis), "Siting analysis failed")?;
            pb.finish_and_clear();

            let pb = spinner("Rendering figures...");
            let report = step(publish(&analysis, &config), "Failed to write results")?;
            pb.finish_and_clear();

            print_summary(&report);
            println!();
            done(&report, start.elapsed());
        }

        Commands::DefaultConfig => {
            let json = SitingConfig::default().to_json()?;
            println!("{json}");
        }

        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: Raster<f64> = read_geotiff(&input, None).context("Failed to read raster")?;
            pb.finish_and_clear();

            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: undefined"),
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            println!("  Min: {}", fmt_opt(stats.min));
            println!("  Max: {}", fmt_opt(stats.max));
            println!("  Mean: {}", fmt_opt(stats.mean));
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Layers { package } => {
            let package = VectorPackage::open(&package).context("Failed to open vector package")?;
            println!("Package: {}", package.path().display());
            for name in package.layer_names() {
                let layer = package
                    .read_layer(name)
                    .with_context(|| format!("Failed to read layer {name}"))?;
                let crs = layer.crs().map_or_else(|| "undefined".to_string(), |c| c.to_string());
                println!("  {:<24} {:>8} features  {}", name, layer.len(), crs);
            }
        }
    }

    Ok(())
}
