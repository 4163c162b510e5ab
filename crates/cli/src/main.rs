//! Earthworks CLI - cut and fill modelling on elevation rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use earthworks_algorithms::earthworks::{
    attractors_from_coordinates, attractors_from_raster, earthworks, earthworks_with_volume, parse_coordinate_list,
    parse_z_list, DecayFunction, EarthworksParams, Mode, Operation, Synthesis,
};
use earthworks_core::io::{read_geotiff, write_geotiff};
use earthworks_core::{Attractor, Grid};
use earthworks_parallel::{ProcessingMode, QuadtreeParams};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "earthworks")]
#[command(author, version, about = "Cut and fill modelling on elevation rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Model earthworks around attractors
    Model(ModelArgs),
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Input elevation raster
    #[arg(short, long)]
    elevation: PathBuf,
    /// Output earthworks raster
    #[arg(short = 'o', long)]
    earthworks: PathBuf,
    /// Output volume (earthworks - elevation) raster
    #[arg(long)]
    volume: Option<PathBuf>,
    /// Spot elevation raster; every valid cell becomes an attractor
    #[arg(short, long, conflicts_with = "coordinates", required_unless_present = "coordinates")]
    raster: Option<PathBuf>,
    /// Attractor coordinates as x,y,x,y,...
    #[arg(short, long, allow_hyphen_values = true)]
    coordinates: Option<String>,
    /// Target elevation(s) for coordinates; one value applies to all points
    #[arg(short, long, default_value = "1.0", allow_hyphen_values = true)]
    z: String,
    /// Interpretation of target elevations: absolute, relative
    #[arg(short, long, default_value = "absolute")]
    mode: String,
    /// Operation: cut, fill, cutfill
    #[arg(long, default_value = "cutfill")]
    operation: String,
    /// Decay function: linear, exponential, logistic, gaussian, lorentz, quadratic, cubic
    #[arg(short, long, default_value = "linear")]
    function: String,
    /// Decay rate (must be positive)
    #[arg(long, default_value = "0.1")]
    rate: f64,
    /// Radius of full influence around attractors, in map units
    #[arg(long, default_value = "0.0")]
    flat: f64,
    /// Print net cut, fill and change volumes
    #[arg(short, long)]
    print_volume: bool,
    /// Linear map units used when printing volumes
    #[arg(long, default_value = "meters")]
    units: String,
    /// Maximum attractors per quadtree partition
    #[arg(long, default_value = "50")]
    threshold: usize,
    /// Border around each partition in map units (default: derived from the decay reach)
    #[arg(long)]
    border: Option<f64>,
    /// Disable quadtree segmentation
    #[arg(long)]
    no_segment: bool,
    /// Evaluate all attractors in a single pass per cell
    #[arg(long)]
    joint: bool,
    /// Worker threads for partitions (default: all cores, 1 = sequential)
    #[arg(short, long)]
    threads: Option<usize>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_grid(path: &Path) -> Result<Grid> {
    let pb = spinner("Reading raster...");
    let grid = read_geotiff(path).with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", grid.cols(), grid.rows());
    Ok(grid)
}

fn write_result(grid: &Grid, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(grid, path).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn processing_mode(threads: Option<usize>) -> ProcessingMode {
    match threads {
        None => ProcessingMode::Parallel,
        Some(1) => ProcessingMode::Sequential,
        Some(n) => ProcessingMode::ParallelWith(n),
    }
}

fn model_params(args: &ModelArgs) -> Result<EarthworksParams> {
    let operation: Operation = args.operation.parse().context("Invalid --operation")?;
    let mode: Mode = args.mode.parse().context("Invalid --mode")?;
    let function: DecayFunction = args.function.parse().context("Invalid --function")?;

    let params = EarthworksParams {
        operation,
        mode,
        function,
        rate: args.rate,
        flat: args.flat,
        synthesis: if args.joint { Synthesis::Joint } else { Synthesis::PerAttractor },
        quadtree: QuadtreeParams {
            enabled: !args.no_segment,
            threshold: args.threshold,
            border: args.border,
            ..Default::default()
        },
        processing: processing_mode(args.threads),
    };
    params.validate().context("Invalid parameters")?;
    Ok(params)
}

fn load_attractors(args: &ModelArgs) -> Result<Vec<Attractor>> {
    let attractors = match (&args.raster, &args.coordinates) {
        (Some(path), _) => attractors_from_raster(&read_grid(path)?),
        (None, Some(coords)) => {
            let coords = parse_coordinate_list(coords).context("Invalid --coordinates")?;
            let z = parse_z_list(&args.z).context("Invalid --z")?;
            attractors_from_coordinates(&coords, &z)?
        }
        (None, None) => anyhow::bail!("Provide attractors with --raster or --coordinates"),
    };
    if attractors.is_empty() {
        anyhow::bail!("No attractors found in the input");
    }
    info!("Attractors: {}", attractors.len());
    Ok(attractors)
}

fn run_model(args: ModelArgs) -> Result<()> {
    let params = model_params(&args)?;
    let elevation = read_grid(&args.elevation)?;
    let attractors = load_attractors(&args)?;
    let operation = params.operation;

    let pb = spinner("Modelling earthworks...");
    let start = Instant::now();
    let (result, volume) = if args.volume.is_some() || args.print_volume {
        let (result, volume, summary) =
            earthworks_with_volume(&elevation, &attractors, params).context("Failed to model earthworks")?;
        (result, Some((volume, summary)))
    } else {
        let result = earthworks(&elevation, &attractors, params).context("Failed to model earthworks")?;
        (result, None)
    };
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    if result.segmented {
        info!("Processed {} partitions", result.partitions);
    }

    write_result(&result.earthworks, &args.earthworks)?;
    done(&format!("Earthworks ({})", operation), &args.earthworks, elapsed);

    if let Some((volume, summary)) = volume {
        if let Some(path) = &args.volume {
            write_result(&volume, path)?;
            println!("Volume saved to: {}", path.display());
        }
        if args.print_volume {
            for line in summary.lines(&args.units) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let grid = read_grid(input)?;
    let region = grid.region();
    let stats = grid.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", grid.cols(), grid.rows(), grid.len());
    println!("Resolution: {} (ns) x {} (ew)", region.ns_res, region.ew_res);
    println!(
        "Bounds: n={:.6} s={:.6} e={:.6} w={:.6}",
        region.north, region.south, region.east, region.west
    );
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / grid.len().max(1) as f64
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => show_info(&input),
        Commands::Model(args) => run_model(args),
    }
}
