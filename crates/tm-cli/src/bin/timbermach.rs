use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{Rgba, RgbaImage};
use log::info;
use serde::{Deserialize, Serialize};
use tm_core::{Image, Rgba8};
use tm_edge::{BinarizeConfig, LocalThreshold, Orientation};
use tm_measure::{
    Calibration, CameraGeometry, EdgeMap, EdgeMapParams, GuideLimits, GuideLines, MeasureParams,
    MeasurementResult, edge_map, measure, measure_from_lines, measure_height, measure_length,
    measure_width,
};

const WIDTH_COLOR: Rgba<u8> = Rgba([230, 40, 40, 255]);
const HEIGHT_COLOR: Rgba<u8> = Rgba([40, 200, 60, 255]);
const MAJOR_COLOR: Rgba<u8> = Rgba([255, 64, 64, 255]);
const MINOR_COLOR: Rgba<u8> = Rgba([255, 200, 0, 255]);

#[derive(Parser, Debug)]
#[command(name = "timbermach")]
#[command(about = "Measure timber specimens in images with sub-pixel edge detection")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan-line measurement of a dark specimen on a bright background.
    Measure(MeasureArgs),
    /// Sub-pixel edge map for visual inspection.
    Edges(EdgesArgs),
    /// Compute a calibration factor.
    #[command(subcommand)]
    Calibrate(CalibrateCmd),
    /// Measure between operator-placed guide lines.
    Lines(LinesArgs),
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Write JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write a PNG overlay of the detected geometry.
    #[arg(long)]
    overlay: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct CalibrationArgs {
    /// Known factor in mm per pixel.
    #[arg(long, conflicts_with_all = ["reference_px", "distance"])]
    factor: Option<f64>,
    /// Manual calibration: reference span in pixels.
    #[arg(long, requires = "reference_mm")]
    reference_px: Option<f64>,
    /// Manual calibration: reference length in millimetres.
    #[arg(long, requires = "reference_px")]
    reference_mm: Option<f64>,
    /// Camera calibration: camera to specimen distance in millimetres.
    #[arg(long, conflicts_with = "reference_px")]
    distance: Option<f64>,
    #[arg(long, default_value_t = 4.8)]
    sensor_width: f64,
    #[arg(long, default_value_t = 4.0)]
    focal_length: f64,
}

impl CalibrationArgs {
    /// Camera geometry uses the width of the image being measured.
    fn resolve(&self, image_width: usize) -> Result<Calibration> {
        let cal = if let Some(factor) = self.factor {
            Calibration::fixed(factor)?
        } else if let (Some(px), Some(mm)) = (self.reference_px, self.reference_mm) {
            Calibration::manual(px, mm)?
        } else if let Some(distance_mm) = self.distance {
            Calibration::camera(CameraGeometry {
                sensor_width_mm: self.sensor_width,
                focal_length_mm: self.focal_length,
                distance_mm,
                image_width_px: u32::try_from(image_width).context("image too wide")?,
            })?
        } else {
            bail!("no calibration given: pass --factor, --reference-px/--reference-mm or --distance");
        };
        info!("calibration {:.5} mm/px", cal.mm_per_px());
        Ok(cal)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Width and height.
    Area,
    Width,
    Height,
    /// Larger of width and height.
    Length,
}

#[derive(Args, Debug, Clone)]
struct MeasureArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    /// JSON file with measurement parameters; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Mode::Area)]
    mode: Mode,
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(long)]
    sigma: Option<f32>,
    /// Scan the luminance instead of the binarized image.
    #[arg(long)]
    no_binarize: bool,
    /// Threshold against the local mean over an odd window (uneven lighting).
    #[arg(long, conflicts_with = "threshold")]
    adaptive_window: Option<usize>,
    #[arg(long)]
    max_mm: Option<f64>,
    #[command(flatten)]
    calibration: CalibrationArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
struct EdgesArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    /// JSON file with edge-map parameters; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    sigma: Option<f32>,
    /// Binarize with this threshold before edge detection.
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(long)]
    base_threshold: Option<f32>,
    #[arg(long)]
    show_minor: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Subcommand, Debug)]
enum CalibrateCmd {
    /// Factor from a known reference length.
    Manual {
        #[arg(long)]
        reference_px: f64,
        #[arg(long)]
        reference_mm: f64,
    },
    /// Factor from pinhole camera geometry.
    Camera {
        #[arg(long, default_value_t = 300.0)]
        distance: f64,
        #[arg(long, default_value_t = 4.8)]
        sensor_width: f64,
        #[arg(long, default_value_t = 4.0)]
        focal_length: f64,
        #[arg(long, default_value_t = 1280)]
        image_width: u32,
    },
}

#[derive(Args, Debug, Clone)]
struct LinesArgs {
    /// Image the lines were placed on; used for bounds and the overlay.
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, allow_hyphen_values = true)]
    width_line1: i64,
    #[arg(long, allow_hyphen_values = true)]
    width_line2: i64,
    #[arg(long, allow_hyphen_values = true)]
    height_line1: i64,
    #[arg(long, allow_hyphen_values = true)]
    height_line2: i64,
    /// Physical limit in millimetres; 0 disables it.
    #[arg(long, default_value_t = tm_measure::guide::DEFAULT_MAX_DIMENSION_MM)]
    max_mm: f64,
    #[command(flatten)]
    calibration: CalibrationArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CalibrationDto {
    calibration_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    camera_distance: Option<f64>,
    calibration: Calibration,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Measure(args) => run_measure(args),
        Command::Edges(args) => run_edges(args),
        Command::Calibrate(cmd) => run_calibrate(cmd),
        Command::Lines(args) => run_lines(args),
    }
}

fn run_measure(args: MeasureArgs) -> Result<()> {
    let mut params: MeasureParams = match &args.config {
        Some(path) => read_json(path)?,
        None => MeasureParams::default(),
    };
    if let Some(t) = args.threshold {
        params.binarization.threshold = t;
    }
    if let Some(s) = args.sigma {
        params.binarization.sigma = s;
    }
    if args.no_binarize {
        params.binarize = false;
    }
    if let Some(window) = args.adaptive_window {
        params.binarization.adaptive = Some(LocalThreshold {
            window,
            ..LocalThreshold::default()
        });
    }
    if args.max_mm.is_some() {
        params.max_dimension_mm = args.max_mm;
    }

    let img = load_input_rgba(&args.input)?;
    let cal = args.calibration.resolve(img.width())?;
    let out = &args.output;

    if args.mode == Mode::Area {
        let result = measure(&img, &cal, &params)
            .with_context(|| format!("measuring {}", args.input.display()))?;
        info!(
            "{}: {:.2} x {:.2} mm ({:.2} mm2)",
            args.input.display(),
            result.width_mm,
            result.height_mm,
            result.area_mm2
        );
        emit_json(out.out.as_deref(), &result)?;
        if let Some(path) = &out.overlay {
            save_rgba(path, &render_measurement(&img, &result)?)?;
        }
        return Ok(());
    }

    let dim = match args.mode {
        Mode::Width => measure_width(&img, &cal, &params),
        Mode::Height => measure_height(&img, &cal, &params),
        _ => measure_length(&img, &cal, &params),
    }
    .with_context(|| format!("measuring {}", args.input.display()))?;
    info!("{}: {} {:.2} mm", args.input.display(), dim.orientation, dim.mm);
    emit_json(out.out.as_deref(), &dim)?;
    if let Some(path) = &out.overlay {
        let mut canvas = to_rgba_image(&img)?;
        let color = match dim.orientation {
            Orientation::Width => WIDTH_COLOR,
            Orientation::Height => HEIGHT_COLOR,
        };
        for pos in [dim.edge.edge_a, dim.edge.edge_b] {
            draw_guide(&mut canvas, dim.orientation, pos, color, img.width(), img.height());
        }
        save_rgba(path, &canvas)?;
    }
    Ok(())
}

fn run_edges(args: EdgesArgs) -> Result<()> {
    let mut params: EdgeMapParams = match &args.config {
        Some(path) => read_json(path)?,
        None => EdgeMapParams::default(),
    };
    if let Some(s) = args.sigma {
        params.sigma = s;
    }
    if let Some(t) = args.threshold {
        params.binarize = Some(BinarizeConfig {
            threshold: t,
            ..BinarizeConfig::default()
        });
    }
    if let Some(t) = args.base_threshold {
        params.refine.base_threshold = t;
    }
    if args.show_minor {
        params.refine.show_minor_edges = true;
    }

    let img = load_input_rgba(&args.input)?;
    let map = edge_map(&img, &params)
        .with_context(|| format!("edge map of {}", args.input.display()))?;
    info!(
        "{}: {} major, {} minor edge points",
        args.input.display(),
        map.major_count,
        map.minor_count
    );

    emit_json(args.output.out.as_deref(), &map)?;
    if let Some(path) = &args.output.overlay {
        save_rgba(path, &render_edge_map(&img, &map)?)?;
    }
    Ok(())
}

fn run_calibrate(cmd: CalibrateCmd) -> Result<()> {
    let cal = match cmd {
        CalibrateCmd::Manual {
            reference_px,
            reference_mm,
        } => Calibration::manual(reference_px, reference_mm)?,
        CalibrateCmd::Camera {
            distance,
            sensor_width,
            focal_length,
            image_width,
        } => Calibration::camera(CameraGeometry {
            sensor_width_mm: sensor_width,
            focal_length_mm: focal_length,
            distance_mm: distance,
            image_width_px: image_width,
        })?,
    };
    emit_json(
        None,
        &CalibrationDto {
            calibration_factor: cal.mm_per_px(),
            camera_distance: cal.camera_distance(),
            calibration: cal,
        },
    )
}

fn run_lines(args: LinesArgs) -> Result<()> {
    let img = load_input_rgba(&args.input)?;
    let cal = args.calibration.resolve(img.width())?;
    let lines = GuideLines {
        width_line1: args.width_line1,
        width_line2: args.width_line2,
        height_line1: args.height_line1,
        height_line2: args.height_line2,
    };
    let limits = GuideLimits {
        max_dimension_mm: (args.max_mm > 0.0).then_some(args.max_mm),
        ..GuideLimits::default()
    };

    let result = measure_from_lines(&lines, img.width(), img.height(), &cal, &limits)
        .context("measuring from guide lines")?;
    info!(
        "guide lines: {:.2} x {:.2} mm",
        result.width_mm, result.height_mm
    );

    emit_json(args.output.out.as_deref(), &result)?;
    if let Some(path) = &args.output.overlay {
        let mut canvas = to_rgba_image(&img)?;
        let (w, h) = (img.width(), img.height());
        for x in [lines.width_line1, lines.width_line2] {
            draw_guide(&mut canvas, Orientation::Width, x as f32, WIDTH_COLOR, w, h);
        }
        for y in [lines.height_line1, lines.height_line2] {
            draw_guide(&mut canvas, Orientation::Height, y as f32, HEIGHT_COLOR, w, h);
        }
        save_rgba(path, &canvas)?;
    }
    Ok(())
}

fn load_input_rgba(path: &Path) -> Result<Image<Rgba8>> {
    let dyn_img =
        image::open(path).with_context(|| format!("opening input image {}", path.display()))?;
    let rgba = dyn_img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let data = rgba
        .into_raw()
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();

    Image::from_vec(w as usize, h as usize, data)
        .with_context(|| format!("constructing tm-core image from {}", path.display()))
}

fn to_rgba_image(img: &Image<Rgba8>) -> Result<RgbaImage> {
    let raw = img.data().iter().flatten().copied().collect();
    RgbaImage::from_raw(img.width() as u32, img.height() as u32, raw)
        .context("constructing RgbaImage from raw bytes")
}

fn save_rgba(path: &Path, img: &RgbaImage) -> Result<()> {
    img.save(path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn render_measurement(img: &Image<Rgba8>, result: &MeasurementResult) -> Result<RgbaImage> {
    let mut canvas = to_rgba_image(img)?;
    let (w, h) = (img.width(), img.height());
    if let Some(edges) = &result.edges {
        for x in [edges.width.edge_a, edges.width.edge_b] {
            draw_guide(&mut canvas, Orientation::Width, x, WIDTH_COLOR, w, h);
        }
        for y in [edges.height.edge_a, edges.height.edge_b] {
            draw_guide(&mut canvas, Orientation::Height, y, HEIGHT_COLOR, w, h);
        }
    }
    Ok(canvas)
}

fn render_edge_map(img: &Image<Rgba8>, map: &EdgeMap) -> Result<RgbaImage> {
    let mut canvas = to_rgba_image(img)?;
    for p in &map.points {
        let color = if p.is_major { MAJOR_COLOR } else { MINOR_COLOR };
        draw_dot(&mut canvas, p.subpixel_x, p.subpixel_y, color);
    }
    Ok(canvas)
}

/// Full-length line across the image: vertical for width positions,
/// horizontal for height positions.
fn draw_guide(
    canvas: &mut RgbaImage,
    orientation: Orientation,
    pos: f32,
    color: Rgba<u8>,
    width: usize,
    height: usize,
) {
    let p = pos.round();
    if p < 0.0 {
        return;
    }
    let p = p as u32;
    match orientation {
        Orientation::Width if p < width as u32 => {
            for y in 0..height as u32 {
                canvas.put_pixel(p, y, color);
            }
        }
        Orientation::Height if p < height as u32 => {
            for x in 0..width as u32 {
                canvas.put_pixel(x, p, color);
            }
        }
        _ => {}
    }
}

fn draw_dot(img: &mut RgbaImage, x: f32, y: f32, color: Rgba<u8>) {
    let xi = x.round() as i32;
    let yi = y.round() as i32;
    if xi < 0 || yi < 0 {
        return;
    }
    let (ux, uy) = (xi as u32, yi as u32);
    if ux < img.width() && uy < img.height() {
        img.put_pixel(ux, uy, color);
    }
}

fn emit_json(path: Option<&Path>, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("writing json {}", path.display()))
        }
        None => {
            println!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing json {}", path.display()))
}
