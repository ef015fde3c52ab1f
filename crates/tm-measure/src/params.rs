use serde::{Deserialize, Serialize};
use tm_edge::{BinarizeConfig, NmsConfig, RefineConfig, ScanConfig};

use crate::error::{MeasureError, Result};

/// Default per-image processing budget.
pub const DEFAULT_TIME_BUDGET_MS: u64 = 2000;

/// Parameters of the scan-line measurement path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureParams {
    /// Threshold the luminance before scanning. When off, scan lines read the
    /// (optionally blurred) luminance directly.
    pub binarize: bool,
    pub binarization: BinarizeConfig,
    pub scan: ScanConfig,
    /// Physical limit, e.g. the machine's maximum jaw opening.
    pub max_dimension_mm: Option<f64>,
    pub time_budget_ms: u64,
}

impl Default for MeasureParams {
    fn default() -> Self {
        Self {
            binarize: true,
            binarization: BinarizeConfig::default(),
            scan: ScanConfig::default(),
            max_dimension_mm: None,
            time_budget_ms: DEFAULT_TIME_BUDGET_MS,
        }
    }
}

impl MeasureParams {
    pub fn validate(&self) -> Result<()> {
        let b = &self.binarization;
        ensure(b.sigma.is_finite() && b.sigma >= 0.0, "binarization.sigma", || {
            format!("must be >= 0, got {}", b.sigma)
        })?;
        ensure(
            b.contrast_factor.is_finite() && b.contrast_factor > 0.0,
            "binarization.contrast_factor",
            || format!("must be > 0, got {}", b.contrast_factor),
        )?;
        if let Some(local) = &b.adaptive {
            ensure(
                local.window >= 3 && local.window % 2 == 1,
                "binarization.adaptive.window",
                || format!("must be odd and >= 3, got {}", local.window),
            )?;
            ensure(local.offset.is_finite(), "binarization.adaptive.offset", || {
                format!("must be finite, got {}", local.offset)
            })?;
        }

        let s = &self.scan;
        ensure(!s.relative_positions.is_empty(), "scan.relative_positions", || {
            "at least one scan line is required".into()
        })?;
        ensure(
            s.relative_positions
                .iter()
                .all(|r| (0.0..=1.0).contains(r)),
            "scan.relative_positions",
            || "positions must lie in [0, 1]".into(),
        )?;
        ensure(s.sigma.is_finite() && s.sigma >= 0.0, "scan.sigma", || {
            format!("must be >= 0, got {}", s.sigma)
        })?;
        ensure(
            0.0 <= s.min_separation && s.min_separation < s.max_separation && s.max_separation <= 1.0,
            "scan.min_separation",
            || {
                format!(
                    "need 0 <= min < max <= 1, got [{}, {}]",
                    s.min_separation, s.max_separation
                )
            },
        )?;

        if let Some(limit) = self.max_dimension_mm {
            ensure(limit.is_finite() && limit > 0.0, "max_dimension_mm", || {
                format!("must be > 0, got {limit}")
            })?;
        }
        ensure(self.time_budget_ms > 0, "time_budget_ms", || "must be > 0".into())
    }
}

/// Parameters of the 2D edge-map visualization path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMapParams {
    /// Gaussian blur applied to the luminance before Sobel; `0` disables it.
    pub sigma: f32,
    /// Threshold to a binary image before Sobel.
    pub binarize: Option<BinarizeConfig>,
    pub nms: NmsConfig,
    pub refine: RefineConfig,
}

impl Default for EdgeMapParams {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            binarize: None,
            nms: NmsConfig::default(),
            refine: RefineConfig::default(),
        }
    }
}

impl EdgeMapParams {
    pub fn validate(&self) -> Result<()> {
        ensure(self.sigma.is_finite() && self.sigma >= 0.0, "sigma", || {
            format!("must be >= 0, got {}", self.sigma)
        })?;
        ensure(
            self.refine.base_threshold.is_finite() && self.refine.base_threshold >= 0.0,
            "refine.base_threshold",
            || format!("must be >= 0, got {}", self.refine.base_threshold),
        )
    }
}

fn ensure(ok: bool, name: &'static str, reason: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(MeasureError::InvalidParameter {
            name,
            reason: reason(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{EdgeMapParams, MeasureParams};
    use crate::MeasureError;

    #[test]
    fn defaults_are_valid() {
        let p = MeasureParams::default();
        p.validate().expect("default params");
        assert!(p.binarize);
        assert_eq!(p.binarization.threshold, 200);
        assert_eq!(p.time_budget_ms, 2000);
        EdgeMapParams::default().validate().expect("default edge map params");
    }

    #[test]
    fn inverted_separation_band_is_rejected() {
        let mut p = MeasureParams::default();
        p.scan.min_separation = 0.9;
        p.scan.max_separation = 0.1;
        assert!(matches!(
            p.validate(),
            Err(MeasureError::InvalidParameter { name: "scan.min_separation", .. })
        ));
    }

    #[test]
    fn empty_scan_lines_are_rejected() {
        let mut p = MeasureParams::default();
        p.scan.relative_positions.clear();
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: MeasureParams = serde_json::from_str(
            r#"{ "binarization": { "threshold": 180 }, "max_dimension_mm": 101.6 }"#,
        )
        .expect("partial config");
        assert_eq!(p.binarization.threshold, 180);
        assert_eq!(p.binarization.sigma, 0.0);
        assert_eq!(p.max_dimension_mm, Some(101.6));
        assert_eq!(p.scan.relative_positions.len(), 5);
    }

    #[test]
    fn adaptive_window_must_be_odd() {
        let p: MeasureParams =
            serde_json::from_str(r#"{ "binarization": { "adaptive": { "window": 24 } } }"#)
                .expect("adaptive config");
        assert!(matches!(
            p.validate(),
            Err(MeasureError::InvalidParameter {
                name: "binarization.adaptive.window",
                ..
            })
        ));

        let p: MeasureParams = serde_json::from_str(r#"{ "binarization": { "adaptive": {} } }"#)
            .expect("adaptive defaults");
        let local = p.binarization.adaptive.expect("adaptive set");
        assert_eq!((local.window, local.offset), (25, 10.0));
        p.validate().expect("default adaptive window");
    }
}
