//! Scan-line measurement of a dark specimen on a bright background.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tm_core::{Image, ImageBuffer};
use tm_edge::{
    EdgePairResult, Orientation, PairSelector, ScanConfig, ScanLineDetector, TieBreak, binarize,
    best_pair_on_line, enhance_contrast, extract_profile, gaussian_blur, luminance_image,
    scan_line_positions,
};

use crate::calibration::Calibration;
use crate::cancel::{CancelToken, Deadline};
use crate::error::{MeasureError, Result};
use crate::params::MeasureParams;

pub const MM_PER_INCH: f64 = 25.4;
pub const MM2_PER_IN2: f64 = 645.16;

/// Winning pair per orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredEdges {
    pub width: EdgePairResult,
    pub height: EdgePairResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResult {
    pub width_pixels: f32,
    pub height_pixels: f32,
    pub area_pixels: f64,
    #[serde(rename = "widthMM")]
    pub width_mm: f64,
    #[serde(rename = "heightMM")]
    pub height_mm: f64,
    #[serde(rename = "areaMM2")]
    pub area_mm2: f64,
    #[serde(rename = "areaIN2")]
    pub area_in2: f64,
    #[serde(rename = "widthInches")]
    pub width_in: f64,
    #[serde(rename = "heightInches")]
    pub height_in: f64,
    pub calibration_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub camera_distance: Option<f64>,
    /// Absent for guide-line measurements.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub edges: Option<MeasuredEdges>,
}

impl MeasurementResult {
    pub fn from_pixels(width_pixels: f32, height_pixels: f32, calibration: &Calibration) -> Self {
        let factor = calibration.factor;
        let width_mm = factor.to_mm(f64::from(width_pixels));
        let height_mm = factor.to_mm(f64::from(height_pixels));
        let area_mm2 = width_mm * height_mm;
        Self {
            width_pixels,
            height_pixels,
            area_pixels: f64::from(width_pixels) * f64::from(height_pixels),
            width_mm,
            height_mm,
            area_mm2,
            area_in2: area_mm2 / MM2_PER_IN2,
            width_in: width_mm / MM_PER_INCH,
            height_in: height_mm / MM_PER_INCH,
            calibration_factor: factor.mm_per_px(),
            camera_distance: calibration.camera_distance(),
            edges: None,
        }
    }

    pub fn check_bounds(&self, max_dimension_mm: Option<f64>) -> Result<()> {
        let Some(limit) = max_dimension_mm else {
            return Ok(());
        };
        for (orientation, value_mm) in [
            (Orientation::Width, self.width_mm),
            (Orientation::Height, self.height_mm),
        ] {
            check_limit(orientation, value_mm, limit)?;
        }
        Ok(())
    }
}

/// One dimension, as produced by [`measure_width`], [`measure_height`] and
/// [`measure_length`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionMeasurement {
    pub orientation: Orientation,
    pub pixels: f32,
    #[serde(rename = "millimeters")]
    pub mm: f64,
    pub inches: f64,
    pub calibration_factor: f64,
    pub edge: EdgePairResult,
}

impl DimensionMeasurement {
    fn new(orientation: Orientation, edge: EdgePairResult, calibration: &Calibration) -> Self {
        let mm = calibration.factor.to_mm(f64::from(edge.pixel_span));
        Self {
            orientation,
            pixels: edge.pixel_span,
            mm,
            inches: mm / MM_PER_INCH,
            calibration_factor: calibration.mm_per_px(),
            edge,
        }
    }
}

pub(crate) fn check_image<B: ImageBuffer + ?Sized>(image: &B) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(MeasureError::InvalidImage(format!(
            "zero-sized image {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

fn check_limit(orientation: Orientation, value_mm: f64, limit_mm: f64) -> Result<()> {
    if value_mm > limit_mm {
        warn!("{orientation} {value_mm:.2} mm exceeds limit {limit_mm:.2} mm");
        return Err(MeasureError::MeasurementOutOfBounds {
            orientation,
            value_mm,
            limit_mm,
        });
    }
    Ok(())
}

/// Binary image when `params.binarize`, else the luminance quantized to `u8`.
pub fn preprocess<B: ImageBuffer + ?Sized>(image: &B, params: &MeasureParams) -> Image<u8> {
    let cfg = &params.binarization;
    if params.binarize {
        return binarize(image, cfg);
    }

    let mut gray = luminance_image(image);
    if (cfg.contrast_factor - 1.0).abs() > f32::EPSILON {
        gray = enhance_contrast(&gray.as_view(), cfg.contrast_factor);
    }
    if cfg.sigma > 0.0 {
        gray = gaussian_blur(&gray.as_view(), cfg.sigma, cfg.border);
    }
    gray.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

fn scan_one<B: ImageBuffer + ?Sized>(
    image: &B,
    orientation: Orientation,
    index: usize,
    position: usize,
    cfg: &ScanConfig,
    detector: &mut ScanLineDetector,
    profile: &mut Vec<f32>,
) -> PairSelector {
    extract_profile(image, orientation, position, profile);
    let edges = detector.detect(profile, cfg);
    best_pair_on_line(profile, edges, index, position, cfg)
}

#[cfg(not(feature = "parallel"))]
fn scan_lines<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    orientation: Orientation,
    positions: &[usize],
    cfg: &ScanConfig,
    deadline: &Deadline,
) -> Result<Vec<PairSelector>> {
    let mut detector = ScanLineDetector::new(cfg.sigma);
    let mut profile = Vec::new();
    positions
        .iter()
        .enumerate()
        .map(|(index, &position)| {
            deadline.check()?;
            Ok(scan_one(
                image,
                orientation,
                index,
                position,
                cfg,
                &mut detector,
                &mut profile,
            ))
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn scan_lines<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    orientation: Orientation,
    positions: &[usize],
    cfg: &ScanConfig,
    deadline: &Deadline,
) -> Result<Vec<PairSelector>> {
    use rayon::prelude::*;

    positions
        .par_iter()
        .enumerate()
        .map_init(
            || (ScanLineDetector::new(cfg.sigma), Vec::new()),
            |(detector, profile), (index, &position)| {
                deadline.check()?;
                Ok(scan_one(
                    image,
                    orientation,
                    index,
                    position,
                    cfg,
                    detector,
                    profile,
                ))
            },
        )
        .collect()
}

/// Best-scoring edge pair over all configured scan lines of `orientation`.
///
/// Per-line selections are merged in scan-line order, so the result does not
/// depend on whether lines ran in parallel.
pub fn detect_edge_pair<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    orientation: Orientation,
    cfg: &ScanConfig,
    deadline: &Deadline,
) -> Result<EdgePairResult> {
    let positions = scan_line_positions(orientation, image.width(), image.height(), cfg);
    let mut selector = PairSelector::default();
    for line in scan_lines(image, orientation, &positions, cfg, deadline)? {
        selector.merge(line);
    }

    let Some(best) = selector.best().copied() else {
        warn!(
            "{orientation}: no valid edge pair on {} scan lines",
            positions.len()
        );
        return Err(MeasureError::NoEdgesDetected { orientation });
    };
    if cfg.tie_break == TieBreak::Reject
        && let Some(tie) = selector.tie()
    {
        return Err(MeasureError::AmbiguousEdgePair {
            orientation,
            span_a: best.pixel_span,
            span_b: tie.pixel_span,
        });
    }

    debug!(
        "{orientation}: edges {:.2}..{:.2} span {:.2} px on line {} (score {:.1})",
        best.edge_a, best.edge_b, best.pixel_span, best.scan_line_index, best.strength
    );
    Ok(best)
}

pub fn measure<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    calibration: &Calibration,
    params: &MeasureParams,
) -> Result<MeasurementResult> {
    measure_with_cancel(image, calibration, params, &CancelToken::new())
}

/// Width and height of the specimen in `image`.
pub fn measure_with_cancel<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    calibration: &Calibration,
    params: &MeasureParams,
    cancel: &CancelToken,
) -> Result<MeasurementResult> {
    params.validate()?;
    check_image(image)?;
    let deadline = Deadline::new(cancel.clone(), params.time_budget_ms);

    let prepared = preprocess(image, params);
    deadline.check()?;
    let width = detect_edge_pair(&prepared, Orientation::Width, &params.scan, &deadline)?;
    let height = detect_edge_pair(&prepared, Orientation::Height, &params.scan, &deadline)?;

    let mut result = MeasurementResult::from_pixels(width.pixel_span, height.pixel_span, calibration);
    result.edges = Some(MeasuredEdges { width, height });
    result.check_bounds(params.max_dimension_mm)?;

    debug!(
        "measured {:.2} x {:.2} mm in {:?}",
        result.width_mm,
        result.height_mm,
        deadline.elapsed()
    );
    Ok(result)
}

fn measure_dimension<B: ImageBuffer + Sync + ?Sized>(
    prepared: &B,
    orientation: Orientation,
    calibration: &Calibration,
    params: &MeasureParams,
    deadline: &Deadline,
) -> Result<DimensionMeasurement> {
    let edge = detect_edge_pair(prepared, orientation, &params.scan, deadline)?;
    let dim = DimensionMeasurement::new(orientation, edge, calibration);
    if let Some(limit) = params.max_dimension_mm {
        check_limit(orientation, dim.mm, limit)?;
    }
    Ok(dim)
}

fn measure_single<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    orientation: Orientation,
    calibration: &Calibration,
    params: &MeasureParams,
) -> Result<DimensionMeasurement> {
    params.validate()?;
    check_image(image)?;
    let deadline = Deadline::with_budget(params.time_budget_ms);
    let prepared = preprocess(image, params);
    measure_dimension(&prepared, orientation, calibration, params, &deadline)
}

/// Horizontal extent only.
pub fn measure_width<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    calibration: &Calibration,
    params: &MeasureParams,
) -> Result<DimensionMeasurement> {
    measure_single(image, Orientation::Width, calibration, params)
}

/// Vertical extent only.
pub fn measure_height<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    calibration: &Calibration,
    params: &MeasureParams,
) -> Result<DimensionMeasurement> {
    measure_single(image, Orientation::Height, calibration, params)
}

/// The more convincing of width and height, by `span * score`; height wins
/// ties. Falls back to whichever orientation found a pair.
pub fn measure_length<B: ImageBuffer + Sync + ?Sized>(
    image: &B,
    calibration: &Calibration,
    params: &MeasureParams,
) -> Result<DimensionMeasurement> {
    params.validate()?;
    check_image(image)?;
    let deadline = Deadline::with_budget(params.time_budget_ms);
    let prepared = preprocess(image, params);

    let width = measure_dimension(&prepared, Orientation::Width, calibration, params, &deadline);
    let height = measure_dimension(&prepared, Orientation::Height, calibration, params, &deadline);
    match (width, height) {
        (Ok(w), Ok(h)) => {
            let w_score = w.pixels * w.edge.strength;
            let h_score = h.pixels * h.edge.strength;
            Ok(if w_score > h_score { w } else { h })
        }
        (Ok(w), Err(MeasureError::NoEdgesDetected { .. })) => Ok(w),
        (Err(MeasureError::NoEdgesDetected { .. }), Ok(h)) => Ok(h),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use tm_core::Image;
    use tm_edge::{Orientation, TieBreak};

    use super::{
        MeasurementResult, detect_edge_pair, measure, measure_height, measure_length,
        measure_width, measure_with_cancel, preprocess,
    };
    use crate::{Calibration, CancelToken, Deadline, MeasureError, MeasureParams};

    fn board(w: usize, h: usize, xs: (usize, usize), ys: (usize, usize)) -> Image<u8> {
        Image::from_fn(w, h, |x, y| {
            if (xs.0..xs.1).contains(&x) && (ys.0..ys.1).contains(&y) {
                30
            } else {
                240
            }
        })
    }

    fn fixed(factor: f64) -> Calibration {
        Calibration::fixed(factor).expect("valid factor")
    }

    #[test]
    fn preprocess_binarizes_by_default() {
        let img = board(20, 10, (5, 15), (2, 8));
        let out = preprocess(&img, &MeasureParams::default());
        assert!(out.data().iter().all(|&v| v == 0 || v == 255));

        let gray = preprocess(
            &img,
            &MeasureParams {
                binarize: false,
                ..MeasureParams::default()
            },
        );
        assert_eq!(gray.data(), img.data());
    }

    #[test]
    fn width_and_height_of_board() {
        let img = board(400, 300, (100, 300), (60, 240));
        let result = measure(&img, &fixed(0.5), &MeasureParams::default()).expect("measured");

        assert!((result.width_pixels - 200.0).abs() <= 1.0);
        assert!((result.height_pixels - 180.0).abs() <= 1.0);
        assert!((result.width_mm - 100.0).abs() <= 0.5);
        assert!((result.area_mm2 - result.width_mm * result.height_mm).abs() < 1e-9);
        assert!((result.area_in2 - result.area_mm2 / 645.16).abs() < 1e-9);
        assert!((result.width_in - result.width_mm / 25.4).abs() < 1e-9);
        assert_eq!(result.camera_distance, None);

        let edges = result.edges.expect("edges attached");
        assert!(edges.width.edge_a < edges.width.edge_b);
        assert_eq!(edges.width.scan_line_index, 0);
    }

    #[test]
    fn blank_image_has_no_edges() {
        let img = Image::new_fill(64, 48, 240u8);
        assert_eq!(
            measure(&img, &fixed(0.1), &MeasureParams::default()),
            Err(MeasureError::NoEdgesDetected {
                orientation: Orientation::Width
            })
        );
    }

    #[test]
    fn empty_image_is_invalid() {
        let img = Image::<u8>::new_fill(0, 10, 0);
        assert!(matches!(
            measure(&img, &fixed(0.1), &MeasureParams::default()),
            Err(MeasureError::InvalidImage(_))
        ));
    }

    #[test]
    fn limit_rejects_large_specimen() {
        let img = board(400, 300, (100, 300), (60, 240));
        let params = MeasureParams {
            max_dimension_mm: Some(50.0),
            ..MeasureParams::default()
        };
        assert!(matches!(
            measure(&img, &fixed(0.5), &params),
            Err(MeasureError::MeasurementOutOfBounds {
                orientation: Orientation::Width,
                ..
            })
        ));
    }

    #[test]
    fn cancelled_token_stops_measurement() {
        let img = board(400, 300, (100, 300), (60, 240));
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            measure_with_cancel(&img, &fixed(0.5), &MeasureParams::default(), &token),
            Err(MeasureError::Cancelled)
        );
    }

    #[test]
    fn identical_lines_tie_without_conflict() {
        // Every scan line sees the same pair; the first line wins and the
        // equal spans are not ambiguous.
        let img = board(400, 300, (100, 300), (0, 300));
        let mut params = MeasureParams::default();
        params.scan.tie_break = TieBreak::Reject;
        let deadline = Deadline::with_budget(10_000);
        let prepared = preprocess(&img, &params);

        let best = detect_edge_pair(&prepared, Orientation::Width, &params.scan, &deadline)
            .expect("pair");
        assert_eq!(best.scan_line_index, 0);
        assert_eq!(best.scan_line_position, 90);
    }

    /// Row 180 (first width scan line) crosses a 200 px band, the other
    /// lines a 300 px band; both are fully dark.
    fn two_band_image() -> Image<u8> {
        Image::from_fn(1000, 600, |x, y| {
            let end = if y < 210 { 500 } else { 600 };
            if (300..end).contains(&x) { 0 } else { 255 }
        })
    }

    #[test]
    fn equal_scores_keep_first_scan_line() {
        let params = MeasureParams::default();
        let prepared = preprocess(&two_band_image(), &params);
        let deadline = Deadline::with_budget(10_000);

        let best = detect_edge_pair(&prepared, Orientation::Width, &params.scan, &deadline)
            .expect("pair");
        assert_eq!(best.scan_line_index, 0);
        assert!((best.pixel_span - 200.0).abs() < 0.01);
    }

    #[test]
    fn equal_scores_with_different_spans_are_ambiguous_under_reject() {
        let mut params = MeasureParams::default();
        params.scan.tie_break = TieBreak::Reject;

        let err = measure_width(&two_band_image(), &fixed(0.1), &params).expect_err("ambiguous");
        let MeasureError::AmbiguousEdgePair {
            orientation,
            span_a,
            span_b,
        } = err
        else {
            panic!("expected AmbiguousEdgePair, got {err:?}");
        };
        assert_eq!(orientation, Orientation::Width);
        assert!((span_a - 200.0).abs() < 0.01);
        assert!((span_b - 300.0).abs() < 0.01);
    }

    #[test]
    fn single_dimension_modes() {
        let img = board(400, 300, (100, 300), (60, 240));
        let cal = fixed(0.25);
        let params = MeasureParams::default();

        let w = measure_width(&img, &cal, &params).expect("width");
        assert_eq!(w.orientation, Orientation::Width);
        assert!((w.mm - 50.0).abs() <= 0.25);

        let h = measure_height(&img, &cal, &params).expect("height");
        assert_eq!(h.orientation, Orientation::Height);
        assert!((h.pixels - 180.0).abs() <= 1.0);

        let len = measure_length(&img, &cal, &params).expect("length");
        assert_eq!(len.orientation, Orientation::Width);
    }

    #[test]
    fn length_falls_back_to_found_orientation() {
        // Full-height band: no vertical transitions.
        let img = board(400, 300, (100, 300), (0, 300));
        let len = measure_length(&img, &fixed(1.0), &MeasureParams::default()).expect("length");
        assert_eq!(len.orientation, Orientation::Width);
    }

    #[test]
    fn result_uses_rest_field_names() {
        let r = MeasurementResult::from_pixels(100.0, 50.0, &fixed(0.1));
        let json = serde_json::to_value(&r).expect("serializable");
        assert_eq!(json["widthPixels"], 100.0);
        assert_eq!(json["areaPixels"], 5000.0);
        assert!((json["widthMM"].as_f64().expect("number") - 10.0).abs() < 1e-9);
        assert!(json.get("areaMM2").is_some());
        assert!(json.get("areaIN2").is_some());
        assert!(json.get("edges").is_none());
    }
}
