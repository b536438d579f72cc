//! table-digitizer CLI: digitize photographed tables, re-render edited
//! matrices, and calibrate lens distortion from a dot grid.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use image::RgbImage;
use table_digitizer::cells::CellGrid;
use table_digitizer::core::column_sums_csv;
use table_digitizer::io::{self, Artifacts, COLUMN_SUMS_CSV, OVERLAY_PNG, REPORT_JSON};
use table_digitizer::undistort::{
    calibrate, metadata_to_string, perspective_to_string, render_line_plot, render_residual_plot,
};
use table_digitizer::{
    digitize, Calibration, DigitizeConfig, DigitizeContext, Digitization, Matrix, UndistortParams,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "table-digitizer")]
#[command(about = "Turn a photographed table into a binary occupancy matrix")]
#[command(version)]
struct Cli {
    /// Raise the log level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every cell of a table image.
    Digitize(DigitizeArgs),

    /// Re-derive column sums and the overlay from an edited matrix.
    Recompute(RecomputeArgs),

    /// Estimate lens distortion from a photographed dot grid.
    Calibrate(CalibrateArgs),
}

#[derive(Debug, Clone, Args)]
struct DigitizeArgs {
    /// Path to the input image (JPEG, PNG, ...).
    #[arg(long)]
    image: PathBuf,

    /// Four corner points, e.g. "[[10,20],[300,18],[305,200],[8,210]]".
    /// Without corners the grid is detected from the ruled lines.
    #[arg(long)]
    corners: Option<String>,

    /// JSON configuration; missing fields use the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// Columns of the uniform grid (corner mode).
    #[arg(long)]
    cols: Option<usize>,

    /// Rows of the uniform grid (corner mode); inferred from square cells if omitted.
    #[arg(long)]
    rows: Option<usize>,

    /// Radial distortion coefficients written by `calibrate`.
    #[arg(long)]
    distortion: Option<PathBuf>,

    /// Perspective coefficients written by `calibrate`; requires --distortion.
    #[arg(long, requires = "distortion")]
    perspective: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RecomputeArgs {
    /// Rectified image written by `digitize`.
    #[arg(long)]
    rectified: PathBuf,

    /// Edited matrix CSV (header-less, 0/1).
    #[arg(long)]
    matrix: PathBuf,

    /// report.json written by `digitize`; its cell boundaries are reused.
    /// Defaults to report.json next to the rectified image, then to a
    /// uniform grid.
    #[arg(long)]
    report: Option<PathBuf>,

    /// JSON configuration (overlay colours).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Image of the calibration dot grid.
    #[arg(long)]
    image: PathBuf,

    /// JSON configuration; only the `undistort` section is used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// Number of radial polynomial coefficients.
    #[arg(long)]
    num_coef: Option<usize>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Digitize(args) => run_digitize(&args),
        Commands::Recompute(args) => run_recompute(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
    }
}

#[cfg_attr(feature = "tracing", allow(unused_variables))]
fn init_logging(verbose: u8) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        table_digitizer::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = table_digitizer::core::level_from_verbosity(verbose);
        let _ = table_digitizer::core::init_with_level(level);
    }
}

fn load_config(path: Option<&Path>) -> CliResult<DigitizeConfig> {
    match path {
        Some(p) => {
            log::info!("Loading config: {}", p.display());
            Ok(DigitizeConfig::load_json(p)?)
        }
        None => Ok(DigitizeConfig::default()),
    }
}

fn run_digitize(args: &DigitizeArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(cols) = args.cols {
        config.cols = cols;
    }
    if args.rows.is_some() {
        config.rows = args.rows;
    }

    // Corners are validated before the image is even read.
    let corners = args
        .corners
        .as_deref()
        .map(io::parse_corners)
        .transpose()?;

    let mut ctx = DigitizeContext::new(config);
    if let Some(distortion) = &args.distortion {
        let calibration = Calibration::load(distortion, args.perspective.as_deref())?;
        ctx = ctx.with_calibration(calibration);
    }

    log::info!("Loading image: {}", args.image.display());
    let bytes = std::fs::read(&args.image)?;
    let result = digitize(&bytes, corners.as_ref(), &ctx)?;

    let written = io::digitization_artifacts(&result, &args.out_dir)?.write_all()?;
    let (rows, cols) = result.matrix().shape();
    println!(
        "{rows}x{cols} cells, {} shaded; wrote {} files to {}",
        result.matrix().count_shaded(),
        written.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn run_recompute(args: &RecomputeArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let rectified = io::load_rgb(&args.rectified)?;
    let matrix = io::load_matrix_csv(&args.matrix)?;
    let grid = recompute_grid(args, &rectified, &matrix)?;
    let result = Digitization::from_parts(rectified, grid, matrix, config.overlay)?;

    let mut out = Artifacts::new(&args.out_dir);
    out.push_text(COLUMN_SUMS_CSV, column_sums_csv(&result.column_sums()));
    out.push_png(OVERLAY_PNG, result.overlay())?;
    out.write_all()?;
    println!(
        "column sums: {:?}; wrote {}",
        result.column_sums(),
        args.out_dir.display()
    );
    Ok(())
}

fn recompute_grid(
    args: &RecomputeArgs,
    rectified: &RgbImage,
    matrix: &Matrix,
) -> CliResult<CellGrid> {
    let report_path = args.report.clone().or_else(|| {
        let sibling = args.rectified.with_file_name(REPORT_JSON);
        sibling.is_file().then_some(sibling)
    });
    let (w, h) = rectified.dimensions();
    match report_path {
        Some(path) => {
            log::info!("Reusing cell boundaries from {}", path.display());
            let report = io::load_report(&path)?;
            if (report.width, report.height) != (w, h) {
                return Err(format!(
                    "{} describes a {}x{} image but the rectified image is {w}x{h}",
                    path.display(),
                    report.width,
                    report.height
                )
                .into());
            }
            Ok(report.cell_grid()?)
        }
        None => {
            log::warn!("no report.json found; assuming a uniform grid");
            Ok(CellGrid::uniform(w, h, matrix.cols(), Some(matrix.rows()))?)
        }
    }
}

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    let mut params: UndistortParams = load_config(args.config.as_deref())?.undistort;
    if let Some(n) = args.num_coef {
        params.num_coef = n;
    }

    log::info!("Loading image: {}", args.image.display());
    let image = io::load_rgb(&args.image)?;
    let result = calibrate(&image, &params)?;
    let (w, h) = image.dimensions();

    let mut out = Artifacts::new(&args.out_dir);
    out.push_text(
        "coefficients_radial_distortion.txt",
        metadata_to_string(&result.model),
    );
    out.push_text(
        "perspective_coefficients.txt",
        perspective_to_string(&result.perspective),
    );
    out.push_png("segmented_dots.png", &result.segmented.to_luma8())?;
    out.push_png("image_radial_corrected.png", &result.radial_corrected)?;
    out.push_png("image_corrected.png", &result.corrected)?;
    out.push_png(
        "horizontal_lines.png",
        &render_line_plot(&result.hor_lines, w, h),
    )?;
    out.push_png("vertical_lines.png", &render_line_plot(&result.ver_lines, w, h))?;
    out.push_png(
        "residual_hor_before_correction.png",
        &render_residual_plot(&result.residuals_before.hor),
    )?;
    out.push_png(
        "residual_ver_before_correction.png",
        &render_residual_plot(&result.residuals_before.ver),
    )?;
    out.push_png(
        "residual_hor_after_correction.png",
        &render_residual_plot(&result.residuals_after.hor),
    )?;
    out.push_png(
        "residual_ver_after_correction.png",
        &render_residual_plot(&result.residuals_after.ver),
    )?;
    out.push_json("calibration_report.json", &result.report())?;
    out.write_all()?;

    let before = result.residuals_before.summary();
    let after = result.residuals_after.summary();
    println!(
        "centre ({:.2}, {:.2}), {} coefficients; mean residual {:.3} -> {:.3} px",
        result.model.xcenter,
        result.model.ycenter,
        result.model.coefficients.len(),
        before.mean,
        after.mean
    );
    Ok(())
}
