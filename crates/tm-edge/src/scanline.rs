//! 1D edge-pair detection along scan lines.
//!
//! Coordinates follow pixel-center convention: profile sample `i` sits at
//! position `i` along the line.
//!
//! A width measurement scans rows, a height measurement scans columns. On
//! each line the luminance profile is Gaussian-smoothed, differentiated,
//! and every extremum of the derivative above an adaptive threshold becomes a
//! [`ScanLineEdge`]. Pairs of edges are scored by how dark the profile is
//! between them times their mean strength.
//!
//! Tie-breaking: candidates are visited in a fixed order (left edge
//! ascending, then right edge ascending; scan lines by index). A candidate
//! replaces the current best only with a strictly higher score, so the
//! first-encountered pair wins ties. [`PairSelector`] additionally remembers
//! the first tied candidate whose span disagrees with the winner.

use core::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use tm_core::{BorderMode, ImageBuffer};

use crate::conv1d::central_difference;
use crate::kernels1d::GaussianKernel1D;
use crate::subpix::devernay_offset;

/// Spans closer than this (pixels) are the same measurement.
pub const SPAN_TOLERANCE: f32 = 0.5;

const MAX_LUMA: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Horizontal scan lines, distance along x.
    Width,
    /// Vertical scan lines, distance along y.
    Height,
}

impl Orientation {
    /// Length of one scan line.
    pub fn scanned_len(self, width: usize, height: usize) -> usize {
        match self {
            Self::Width => width,
            Self::Height => height,
        }
    }

    /// Dimension across which scan lines are distributed.
    pub fn perpendicular_len(self, width: usize, height: usize) -> usize {
        match self {
            Self::Width => height,
            Self::Height => width,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Width => write!(f, "width"),
            Self::Height => write!(f, "height"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolarity {
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    FirstEncountered,
    /// Equal-score pairs with different spans are reported as ambiguous.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Scan-line placement as fractions of the perpendicular dimension.
    pub relative_positions: Vec<f32>,
    pub sigma: f32,
    /// Floor of the adaptive gradient threshold.
    pub min_gradient_threshold: f32,
    /// Threshold is `max(min, factor * mean|g|)`.
    pub gradient_threshold_factor: f32,
    /// Pair separation band, as fractions of the scan-line length.
    pub min_separation: f32,
    pub max_separation: f32,
    /// Multiply scores by `min(1, span / (0.2 * len))`, down-weighting narrow
    /// pairs.
    pub width_prior: bool,
    pub tie_break: TieBreak,
    pub border: BorderMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            relative_positions: vec![0.3, 0.4, 0.5, 0.6, 0.7],
            sigma: 2.0,
            min_gradient_threshold: 5.0,
            gradient_threshold_factor: 2.0,
            min_separation: 0.05,
            max_separation: 0.9,
            width_prior: false,
            tie_break: TieBreak::FirstEncountered,
            border: BorderMode::Clamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLineEdge {
    /// Sub-pixel position along the line.
    pub position: f32,
    /// `|derivative|` at the detected sample.
    pub strength: f32,
    pub polarity: EdgePolarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePairResult {
    pub edge_a: f32,
    pub edge_b: f32,
    pub pixel_span: f32,
    /// Darkness-weighted score the pair won with.
    pub strength: f32,
    pub scan_line_index: usize,
    /// Row (width) or column (height) the line was sampled at.
    pub scan_line_position: usize,
}

/// Pixel row/column of every configured scan line.
pub fn scan_line_positions(
    orientation: Orientation,
    width: usize,
    height: usize,
    cfg: &ScanConfig,
) -> Vec<usize> {
    let perp = orientation.perpendicular_len(width, height);
    if perp == 0 {
        return Vec::new();
    }
    cfg.relative_positions
        .iter()
        .map(|&r| {
            // Absorb rounding so that e.g. 0.7 * 600 lands on row 420.
            let p = r.clamp(0.0, 1.0) * perp as f32 + 1e-3;
            (p.floor() as usize).min(perp - 1)
        })
        .collect()
}

/// Copies the luminance along one scan line into `out`.
pub fn extract_profile<B: ImageBuffer + ?Sized>(
    img: &B,
    orientation: Orientation,
    position: usize,
    out: &mut Vec<f32>,
) {
    out.clear();
    match orientation {
        Orientation::Width => out.extend((0..img.width()).map(|x| img.luma(x, position))),
        Orientation::Height => out.extend((0..img.height()).map(|y| img.luma(position, y))),
    }
}

/// `max(min_gradient_threshold, factor * mean|g|)`.
pub fn adaptive_threshold(gradient: &[f32], cfg: &ScanConfig) -> f32 {
    if gradient.is_empty() {
        return cfg.min_gradient_threshold;
    }
    let mean_abs = gradient.iter().map(|g| g.abs()).sum::<f32>() / gradient.len() as f32;
    cfg.min_gradient_threshold
        .max(cfg.gradient_threshold_factor * mean_abs)
}

/// Reusable scratch buffers for per-line edge detection.
#[derive(Debug, Clone, Default)]
pub struct ScanLineDetector {
    kernel: Option<GaussianKernel1D>,
    smoothed: Vec<f32>,
    gradient: Vec<f32>,
    edges: Vec<ScanLineEdge>,
}

impl ScanLineDetector {
    pub fn new(sigma: f32) -> Self {
        Self {
            kernel: GaussianKernel1D::new(sigma),
            ..Self::default()
        }
    }

    pub fn set_sigma(&mut self, sigma: f32) {
        let current = self.kernel.as_ref().map_or(0.0, |k| k.sigma);
        if (sigma - current).abs() > f32::EPSILON {
            self.kernel = GaussianKernel1D::new(sigma);
        }
    }

    /// Derivative of the smoothed profile from the last [`Self::detect`].
    pub fn gradient(&self) -> &[f32] {
        &self.gradient
    }

    pub fn detect(&mut self, profile: &[f32], cfg: &ScanConfig) -> &[ScanLineEdge] {
        self.set_sigma(cfg.sigma);
        self.edges.clear();

        let n = profile.len();
        self.smoothed.resize(n, 0.0);
        self.gradient.resize(n, 0.0);
        if n < 3 {
            return &self.edges;
        }

        match &self.kernel {
            Some(k) => k.smooth(profile, cfg.border, &mut self.smoothed),
            None => self.smoothed.copy_from_slice(profile),
        }
        central_difference(&self.smoothed, &mut self.gradient);

        let thresh = adaptive_threshold(&self.gradient, cfg);
        let g = &self.gradient;
        for i in 1..n - 1 {
            let (a, b, c) = (g[i - 1], g[i], g[i + 1]);
            let polarity = if b >= a && b > c && b > thresh {
                EdgePolarity::Rising
            } else if b <= a && b < c && -b > thresh {
                EdgePolarity::Falling
            } else {
                continue;
            };

            // Two-sample plateau: the peak lies midway.
            let eta = if a == b {
                -0.5
            } else {
                devernay_offset(a.abs(), b.abs(), c.abs())
            };
            self.edges.push(ScanLineEdge {
                position: i as f32 + eta,
                strength: b.abs(),
                polarity,
            });
        }

        &self.edges
    }
}

/// Mean of `255 - v` over the samples in `[ceil(a), ceil(b))`.
///
/// Edges of a pixel-aligned band sit on half-pixel boundaries, so an edge
/// pair at `299.5 .. 599.5` averages exactly the samples `300..600`.
pub fn darkness_between(profile: &[f32], a: f32, b: f32) -> f32 {
    let start = (a.max(0.0).ceil() as usize).min(profile.len());
    let end = (b.max(0.0).ceil() as usize).min(profile.len());
    if end <= start {
        return 0.0;
    }
    let window = &profile[start..end];
    window.iter().map(|&v| (MAX_LUMA - v).max(0.0)).sum::<f32>() / window.len() as f32
}

/// Scores every ordered pair of `edges` on one line and returns the
/// selection. `edges` must be sorted by position, as produced by
/// [`ScanLineDetector::detect`].
pub fn best_pair_on_line(
    profile: &[f32],
    edges: &[ScanLineEdge],
    scan_line_index: usize,
    scan_line_position: usize,
    cfg: &ScanConfig,
) -> PairSelector {
    let len = profile.len() as f32;
    let min_sep = cfg.min_separation * len;
    let max_sep = cfg.max_separation * len;

    let mut selector = PairSelector::default();
    let mut rejected = 0usize;
    for (i, left) in edges.iter().enumerate() {
        for right in &edges[i + 1..] {
            let span = right.position - left.position;
            if span < min_sep || span > max_sep {
                rejected += 1;
                continue;
            }

            let darkness = darkness_between(profile, left.position, right.position);
            let mut score = darkness * 0.5 * (left.strength + right.strength);
            if cfg.width_prior {
                score *= (span / (0.2 * len)).min(1.0);
            }

            selector.offer(EdgePairResult {
                edge_a: left.position,
                edge_b: right.position,
                pixel_span: span,
                strength: score,
                scan_line_index,
                scan_line_position,
            });
        }
    }

    debug!(
        "scan line {scan_line_index} @ {scan_line_position}: {} edges, {rejected} pairs outside [{min_sep:.1}, {max_sep:.1}] px",
        edges.len()
    );
    selector
}

/// Running maximum over candidate pairs with first-encountered tie-breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairSelector {
    best: Option<EdgePairResult>,
    tie: Option<EdgePairResult>,
}

impl PairSelector {
    pub fn offer(&mut self, cand: EdgePairResult) {
        let Some(best) = &self.best else {
            self.best = Some(cand);
            return;
        };

        if scores_equal(cand.strength, best.strength) {
            if self.tie.is_none() && (cand.pixel_span - best.pixel_span).abs() > SPAN_TOLERANCE {
                self.tie = Some(cand);
            }
        } else if cand.strength > best.strength {
            self.best = Some(cand);
            self.tie = None;
        }
    }

    /// Folds another selection in as if its candidates came after ours.
    pub fn merge(&mut self, other: PairSelector) {
        if let Some(b) = other.best {
            self.offer(b);
        }
        if let Some(t) = other.tie {
            self.offer(t);
        }
    }

    pub fn best(&self) -> Option<&EdgePairResult> {
        self.best.as_ref()
    }

    /// First equal-score candidate whose span differs from the winner.
    pub fn tie(&self) -> Option<&EdgePairResult> {
        self.tie.as_ref()
    }

    pub fn into_best(self) -> Option<EdgePairResult> {
        self.best
    }
}

#[inline]
fn scores_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}
