//! coastmesh CLI: interpolate raster data onto mesh nodes from the command line

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use coastmesh_algorithms::interpolation::{
    DirectionalResult, Griddata, GriddataParams, InterpolationMethod, PointValues,
    ThresholdPolicy,
};
use coastmesh_core::io::read_geotiff;
use coastmesh_core::metadata::{self, OutputMetadata};
use coastmesh_core::{CRS, Point, RasterHandle, RasterMode};
use coastmesh_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "coastmesh",
    author,
    version,
    about = "Raster-to-mesh interpolation for coastal circulation models"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show raster information
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Interpolate raster values onto query points
    Interpolate {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Directional (per-sector) interpolation onto query points
    Directional {
        #[command(flatten)]
        run: RunArgs,
        /// Number of angular sectors
        #[arg(long)]
        sectors: Option<usize>,
        /// Search radius in meters
        #[arg(long)]
        radius: Option<f64>,
        /// Gaussian distance weighting sigma in kilometers
        #[arg(long)]
        sigma: Option<f64>,
        /// Angular half-width in degrees for sector weighting
        #[arg(long)]
        angular_width: Option<f64>,
    },
    /// List output variable metadata
    Metadata {
        /// Show only the entry containing this variable
        variable: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input raster (GeoTIFF)
    #[arg(short, long)]
    raster: PathBuf,
    /// Query points file: x,y[,resolution[,method[,filter]]] per line
    #[arg(short, long)]
    points: PathBuf,
    /// Output CSV file
    #[arg(short, long)]
    output: PathBuf,
    /// Reduction method (name or numeric code) for points without their own
    #[arg(short, long)]
    method: Option<InterpolationMethod>,
    /// Search filter width for points without their own
    #[arg(short, long)]
    filter: Option<f64>,
    /// Lookup table mapping raster category codes to values
    #[arg(long)]
    lookup: Option<PathBuf>,
    /// Value for categories missing from the lookup table
    #[arg(long)]
    lookup_default: Option<f64>,
    /// Multiplier applied to every sampled value
    #[arg(long)]
    multiplier: Option<f64>,
    /// Shift added to every sampled value after the multiplier
    #[arg(long)]
    datum_shift: Option<f64>,
    /// Drop sampled values above this threshold
    #[arg(long, conflicts_with = "threshold_below")]
    threshold_above: Option<f64>,
    /// Drop sampled values below this threshold
    #[arg(long)]
    threshold_below: Option<f64>,
    /// Value written where no result can be computed
    #[arg(long)]
    nodata: Option<f64>,
    /// Read the raster on demand instead of loading it whole
    #[arg(long)]
    streaming: bool,
    /// EPSG code of the query point coordinates
    #[arg(long)]
    query_epsg: Option<u32>,
    /// Number of worker threads (0 = all cores, 1 = sequential)
    #[arg(short, long)]
    threads: Option<usize>,
    /// JSON file with run parameters; command line options override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    // A second initialization only happens in tests; keep the first.
    let _ = tracing::subscriber::set_global_default(subscriber);
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

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} points ({eta})",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn done(name: &str, path: &Path, count: usize, elapsed: std::time::Duration) {
    println!("{} ({} points) saved to: {}", name, count, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Query points as read from a points file
#[derive(Debug, Default)]
struct PointsFile {
    points: Vec<Point>,
    resolutions: Vec<Option<f64>>,
    methods: Vec<Option<InterpolationMethod>>,
    filters: Vec<Option<f64>>,
}

impl PointsFile {
    fn has_methods(&self) -> bool {
        self.methods.iter().any(Option::is_some)
    }

    fn has_filters(&self) -> bool {
        self.filters.iter().any(Option::is_some)
    }
}

fn parse_points(text: &str) -> Result<PointsFile> {
    let mut file = PointsFile::default();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if !(2..=5).contains(&fields.len()) {
            bail!(
                "line {}: expected x,y[,resolution[,method[,filter]]], got {} fields",
                lineno + 1,
                fields.len()
            );
        }
        let number = |i: usize, what: &str| -> Result<f64> {
            fields[i]
                .parse::<f64>()
                .with_context(|| format!("line {}: invalid {} '{}'", lineno + 1, what, fields[i]))
        };
        file.points.push(Point {
            x: number(0, "x")?,
            y: number(1, "y")?,
        });
        file.resolutions
            .push(if fields.len() > 2 { Some(number(2, "resolution")?) } else { None });
        file.methods.push(match fields.get(3) {
            Some(m) => Some(
                m.parse::<InterpolationMethod>()
                    .with_context(|| format!("line {}: invalid method '{}'", lineno + 1, m))?,
            ),
            None => None,
        });
        file.filters
            .push(if fields.len() > 4 { Some(number(4, "filter")?) } else { None });
    }
    Ok(file)
}

fn read_points(path: &Path) -> Result<PointsFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read points file {}", path.display()))?;
    let file = parse_points(&text).with_context(|| format!("In {}", path.display()))?;
    if file.points.is_empty() {
        bail!("No query points in {}", path.display());
    }
    Ok(file)
}

fn read_config(path: &Path) -> Result<GriddataParams> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

impl RunArgs {
    /// Run parameters from the config file, overridden by explicit options
    fn params(&self) -> Result<GriddataParams> {
        let mut params = match &self.config {
            Some(path) => read_config(path)?,
            None => GriddataParams::default(),
        };
        if let Some(method) = self.method {
            params.methods = PointValues::Uniform(method);
        }
        if let Some(filter) = self.filter {
            params.filters = PointValues::Uniform(filter);
        }
        if let Some(v) = self.lookup_default {
            params.lookup_default = v;
        }
        if let Some(v) = self.multiplier {
            params.multiplier = v;
        }
        if let Some(v) = self.datum_shift {
            params.datum_shift = v;
        }
        if let Some(v) = self.nodata {
            params.nodata = v;
        }
        if let Some(t) = self.threshold_above {
            params.threshold = ThresholdPolicy::Above(t);
        } else if let Some(t) = self.threshold_below {
            params.threshold = ThresholdPolicy::Below(t);
        }
        if self.streaming {
            params.raster_mode = RasterMode::streaming();
        }
        if self.threads.is_some() {
            params.processing = ProcessingMode::from_threads(self.threads);
        }
        Ok(params)
    }

    /// Open the raster, read the points and configure a run
    fn prepare(&self, mut params: GriddataParams) -> Result<(Griddata, Option<ProgressBar>)> {
        let pb = spinner("Opening raster...");
        let raster = RasterHandle::open(&self.raster, params.raster_mode)
            .with_context(|| format!("Failed to open raster {}", self.raster.display()))?;
        pb.finish_and_clear();

        let file = read_points(&self.points)?;
        let cell = raster.cell_size();
        let resolutions: Vec<f64> = file.resolutions.iter().map(|r| r.unwrap_or(cell)).collect();
        if file.has_methods() {
            let fallback = params.methods.get(0);
            params.methods =
                PointValues::PerPoint(file.methods.iter().map(|m| m.unwrap_or(fallback)).collect());
        }
        if file.has_filters() {
            let fallback = params.filters.get(0);
            params.filters =
                PointValues::PerPoint(file.filters.iter().map(|f| f.unwrap_or(fallback)).collect());
        }
        info!(points = file.points.len(), cell, mode = ?params.raster_mode, "inputs ready");

        let mut grid = Griddata::new(file.points, resolutions)?;
        grid.set_params(params);
        grid.set_raster(raster);
        if let Some(code) = self.query_epsg {
            grid.set_query_crs(Some(CRS::from_epsg(code)));
        }
        if let Some(path) = &self.lookup {
            grid.read_lookup_table(path)
                .with_context(|| format!("Failed to read lookup table {}", path.display()))?;
        }

        let bar = if self.progress {
            let bar = progress_bar();
            let hook = bar.clone();
            grid.set_progress(move |completed, total| {
                hook.set_length(total as u64);
                hook.set_position(completed as u64);
            });
            Some(bar)
        } else {
            None
        };
        Ok((grid, bar))
    }
}

fn write_values(path: &Path, points: &[Point], values: &[f64]) -> Result<()> {
    let mut out = String::from("x,y,value\n");
    for (p, v) in points.iter().zip(values) {
        let _ = writeln!(out, "{},{},{}", p.x, p.y, v);
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_directional(path: &Path, points: &[Point], results: &[DirectionalResult]) -> Result<()> {
    let sectors = results.first().map_or(0, DirectionalResult::sectors);
    let mut out = String::from("x,y");
    for k in 0..sectors {
        let _ = write!(out, ",v{}", k);
    }
    out.push_str(",magnitude\n");
    for (p, r) in points.iter().zip(results) {
        let _ = write!(out, "{},{}", p.x, p.y);
        for v in &r.values {
            let _ = write!(out, ",{}", v);
        }
        let _ = writeln!(out, ",{}", r.magnitude);
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_entry(entry: &OutputMetadata) {
    let mut kind = Vec::new();
    if entry.is_vector {
        kind.push("vector");
    }
    if entry.is_max {
        kind.push("extremum");
    }
    if kind.is_empty() {
        kind.push("scalar");
    }
    println!("{} [{}]", entry.primary().name, kind.join(", "));
    for v in entry.variables {
        println!(
            "  {:<24} {:<10} {:<12} {} ({})",
            v.name, v.units, v.convention, v.long_name, v.standard_name
        );
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster = read_geotiff::<f32, _>(&input).context("Failed to read raster")?;
            pb.finish_and_clear();
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.xmin, bounds.ymin, bounds.xmax, bounds.ymax
            );
            match raster.crs() {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: unknown"),
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
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
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Interpolate ──────────────────────────────────────────────
        Commands::Interpolate { run } => {
            let params = run.params()?;
            let (grid, bar) = run.prepare(params)?;
            let start = Instant::now();
            let values = grid
                .compute_values(run.lookup.is_some())
                .context("Interpolation failed")?;
            let elapsed = start.elapsed();
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            let nodata = grid.params().nodata;
            let missing = values.iter().filter(|&&v| v == nodata).count();
            debug!(missing, "points without a value");
            write_values(&run.output, grid.points(), &values)?;
            done("Interpolation", &run.output, values.len(), elapsed);
            if missing > 0 {
                println!("  Points without data: {}", missing);
            }
        }

        // ── Directional ──────────────────────────────────────────────
        Commands::Directional {
            run,
            sectors,
            radius,
            sigma,
            angular_width,
        } => {
            let mut params = run.params()?;
            if let Some(n) = sectors {
                params.directional.sectors = n;
            }
            if let Some(r) = radius {
                params.directional.radius = r;
            }
            if let Some(s) = sigma {
                params.directional.sigma_km = s;
            }
            if angular_width.is_some() {
                params.directional.angular_width = angular_width;
            }
            let (grid, bar) = run.prepare(params)?;
            let start = Instant::now();
            let results = grid
                .compute_directional(run.lookup.is_some())
                .context("Directional interpolation failed")?;
            let elapsed = start.elapsed();
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            write_directional(&run.output, grid.points(), &results)?;
            done("Directional interpolation", &run.output, results.len(), elapsed);
        }

        // ── Metadata ─────────────────────────────────────────────────
        Commands::Metadata { variable } => match variable {
            Some(name) => match metadata::find(&name) {
                Some(entry) => print_entry(entry),
                None => bail!("Unknown output variable: {}", name),
            },
            None => {
                for entry in metadata::registry() {
                    print_entry(entry);
                }
            }
        },
    }

    Ok(())
}
