//! Measurement from operator-placed guide lines.
//!
//! Width lines are vertical (x positions), height lines horizontal (y
//! positions). Positions may equal the image size so a line can sit on the
//! far border.

use serde::{Deserialize, Serialize};
use tm_edge::Orientation;

use crate::calibration::Calibration;
use crate::error::{MeasureError, Result};
use crate::measure::MeasurementResult;

/// Four inches, the jaw limit of the reference machine.
pub const DEFAULT_MAX_DIMENSION_MM: f64 = 101.6;
pub const MIN_LINE_SEPARATION_PX: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideLines {
    pub width_line1: i64,
    pub width_line2: i64,
    pub height_line1: i64,
    pub height_line2: i64,
}

impl GuideLines {
    pub fn width_pixels(&self) -> u64 {
        self.width_line1.abs_diff(self.width_line2)
    }

    pub fn height_pixels(&self) -> u64 {
        self.height_line1.abs_diff(self.height_line2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideLimits {
    pub min_separation_px: i64,
    /// `None` disables the physical limit.
    pub max_dimension_mm: Option<f64>,
}

impl Default for GuideLimits {
    fn default() -> Self {
        Self {
            min_separation_px: MIN_LINE_SEPARATION_PX,
            max_dimension_mm: Some(DEFAULT_MAX_DIMENSION_MM),
        }
    }
}

fn invalid(msg: String) -> MeasureError {
    MeasureError::InvalidGuideLines(msg)
}

/// Checks bounds and separation. The physical limit is only checked when a
/// calibration is supplied.
pub fn validate_guide_lines(
    lines: &GuideLines,
    image_width: usize,
    image_height: usize,
    calibration: Option<&Calibration>,
    limits: &GuideLimits,
) -> Result<()> {
    let checks = [
        ("width", lines.width_line1, lines.width_line2, image_width),
        ("height", lines.height_line1, lines.height_line2, image_height),
    ];
    for (name, a, b, extent) in checks {
        for (i, pos) in [(1, a), (2, b)] {
            if pos < 0 || pos as u64 > extent as u64 {
                return Err(invalid(format!(
                    "{name} line {i} ({pos}) out of bounds (0-{extent})"
                )));
            }
        }
        if a == b {
            return Err(invalid(format!("{name} lines cannot be at the same position")));
        }
        if a.abs_diff(b) < limits.min_separation_px.max(0) as u64 {
            return Err(invalid(format!(
                "{name} lines must be at least {} pixels apart",
                limits.min_separation_px
            )));
        }
    }

    if let (Some(cal), Some(limit_mm)) = (calibration, limits.max_dimension_mm) {
        for (orientation, px) in [
            (Orientation::Width, lines.width_pixels()),
            (Orientation::Height, lines.height_pixels()),
        ] {
            let value_mm = cal.factor.to_mm(px as f64);
            if value_mm > limit_mm {
                return Err(MeasureError::MeasurementOutOfBounds {
                    orientation,
                    value_mm,
                    limit_mm,
                });
            }
        }
    }
    Ok(())
}

/// Validates `lines` and converts their spans with `calibration`.
pub fn measure_from_lines(
    lines: &GuideLines,
    image_width: usize,
    image_height: usize,
    calibration: &Calibration,
    limits: &GuideLimits,
) -> Result<MeasurementResult> {
    validate_guide_lines(lines, image_width, image_height, Some(calibration), limits)?;
    Ok(MeasurementResult::from_pixels(
        lines.width_pixels() as f32,
        lines.height_pixels() as f32,
        calibration,
    ))
}

#[cfg(test)]
mod tests {
    use tm_edge::Orientation;

    use super::{GuideLimits, GuideLines, measure_from_lines, validate_guide_lines};
    use crate::{Calibration, MeasureError};

    fn lines(w1: i64, w2: i64, h1: i64, h2: i64) -> GuideLines {
        GuideLines {
            width_line1: w1,
            width_line2: w2,
            height_line1: h1,
            height_line2: h2,
        }
    }

    #[test]
    fn reversed_lines_measure_absolute_span() {
        let cal = Calibration::manual(100.0, 10.0).expect("manual");
        let r = measure_from_lines(&lines(500, 100, 50, 350), 640, 480, &cal, &GuideLimits::default())
            .expect("valid lines");
        assert_eq!(r.width_pixels, 400.0);
        assert_eq!(r.height_pixels, 300.0);
        assert!((r.width_mm - 40.0).abs() < 1e-9);
        assert!((r.area_mm2 - 1200.0).abs() < 1e-9);
        assert!(r.edges.is_none());
    }

    #[test]
    fn line_on_far_border_is_allowed() {
        let limits = GuideLimits::default();
        validate_guide_lines(&lines(0, 640, 0, 480), 640, 480, None, &limits).expect("borders");
    }

    #[test]
    fn geometry_errors() {
        let limits = GuideLimits::default();
        for bad in [
            lines(-1, 100, 0, 100),
            lines(0, 641, 0, 100),
            lines(0, 100, 0, 481),
            lines(50, 50, 0, 100),
            lines(50, 55, 0, 100),
            lines(0, 100, 20, 29),
        ] {
            assert!(
                matches!(
                    validate_guide_lines(&bad, 640, 480, None, &limits),
                    Err(MeasureError::InvalidGuideLines(_))
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn four_inch_limit_needs_calibration() {
        let wide = lines(0, 600, 0, 100);
        let limits = GuideLimits::default();
        validate_guide_lines(&wide, 640, 480, None, &limits).expect("no calibration, no limit");

        let cal = Calibration::fixed(0.2).expect("factor");
        assert!(matches!(
            validate_guide_lines(&wide, 640, 480, Some(&cal), &limits),
            Err(MeasureError::MeasurementOutOfBounds {
                orientation: Orientation::Width,
                ..
            })
        ));

        let unlimited = GuideLimits {
            max_dimension_mm: None,
            ..limits
        };
        measure_from_lines(&wide, 640, 480, &cal, &unlimited).expect("limit disabled");
    }
}
