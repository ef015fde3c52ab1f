//! Example: measure every frame of a multi-snap capture.
//!
//! Loads a horizontally-merged image of N equal-width frames (a burst taken
//! while the specimen sits in the jig), splits it into individual snaps and
//! measures each one with the same calibration. Results go to the
//! measurement history, which is written as JSON next to the input image.
//! Per-snap and total timing is printed to stdout.
//!
//! Run from the workspace root:
//!   cargo run -p timbermach --example multisnap -- --help
//!   cargo run -p timbermach --example multisnap -- --input data/board_0.png --factor 0.1

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::ImageReader;
use timbermach::{
    Calibration, Image, MeasureParams, MeasurementHistory, Rgba8, SharedCalibration, measure,
};

#[derive(Parser, Debug)]
#[command(about = "Measure each frame of a horizontally-merged multi-snap image")]
struct Args {
    #[arg(long, default_value = "data/board_0.png")]
    input: String,

    /// Number of equal-width snaps merged in the image
    #[arg(long, default_value_t = 4)]
    n_snaps: usize,

    /// Calibration factor in mm per pixel
    #[arg(long, default_value_t = 0.1)]
    factor: f64,

    /// Binarization threshold
    #[arg(long, default_value_t = 200)]
    threshold: u8,

    /// Output JSON path (default: <input stem>_history.json next to input)
    #[arg(long)]
    out: Option<String>,
}

fn to_image(rgba: &image::RgbaImage) -> Result<Image<Rgba8>> {
    let pixels = rgba.pixels().map(|p| p.0).collect();
    Image::from_vec(rgba.width() as usize, rgba.height() as usize, pixels)
        .context("converting decoded frame")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let img_path = &args.input;
    let out_path = args.out.clone().unwrap_or_else(|| {
        let p = Path::new(img_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let dir = p.parent().unwrap_or(Path::new("."));
        dir.join(format!("{stem}_history.json"))
            .to_string_lossy()
            .into_owned()
    });

    let rgba = ImageReader::open(img_path)
        .with_context(|| format!("opening {img_path}"))?
        .decode()
        .with_context(|| format!("decoding {img_path}"))?
        .into_rgba8();

    let merged = to_image(&rgba)?;
    let full_width = merged.width();
    let height = merged.height();
    let n_snaps = args.n_snaps;
    if n_snaps == 0 || full_width % n_snaps != 0 {
        bail!("image width {full_width} is not divisible by n_snaps={n_snaps}");
    }
    let snap_w = full_width / n_snaps;

    println!(
        "loaded {img_path}: {full_width}x{height}, splitting into {n_snaps} snaps of {snap_w}x{height}"
    );

    let calibration = SharedCalibration::with(Calibration::fixed(args.factor)?);
    let mut params = MeasureParams::default();
    params.binarization.threshold = args.threshold;

    let mut history = MeasurementHistory::new();
    let total_start = Instant::now();

    for snap_idx in 0..n_snaps {
        let snap = merged
            .crop(snap_idx * snap_w, 0, snap_w, height)
            .with_context(|| format!("cropping snap {snap_idx}"))?;

        let t0 = Instant::now();
        let outcome = measure(&snap, &calibration.snapshot()?, &params);
        let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;

        match outcome {
            Ok(result) => {
                println!(
                    "  snap {snap_idx}: {:.2} x {:.2} mm  ({elapsed_ms:.2} ms)",
                    result.width_mm, result.height_mm
                );
                history.record(format!("{img_path}#{snap_idx}"), result);
            }
            Err(err) => println!("  snap {snap_idx}: {err}  ({elapsed_ms:.2} ms)"),
        }
    }

    let total_ms = total_start.elapsed().as_secs_f64() * 1e3;
    println!(
        "measured {}/{n_snaps} snaps in {total_ms:.2} ms",
        history.len()
    );

    let out_file =
        std::fs::File::create(&out_path).with_context(|| format!("creating {out_path}"))?;
    serde_json::to_writer_pretty(out_file, &history)
        .with_context(|| format!("writing JSON to {out_path}"))?;

    println!("history written to {out_path}");
    Ok(())
}
