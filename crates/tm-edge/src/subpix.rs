//! Edge classification and Devernay sub-pixel refinement on the suppressed
//! magnitude field.
//!
//! Both stages are lazy iterators over the image in row-major order. They are
//! finite, consume themselves, and may yield nothing.

use serde::{Deserialize, Serialize};
use tm_core::{Image, Point2f, Vec2f};

use crate::sobel::GradientField;

/// Denominators smaller than this are treated as a flat parabola.
const DEVERNAY_EPS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleField {
    /// Gradient magnitude before suppression (classic Devernay).
    #[default]
    Magnitude,
    /// Raw luminance.
    Luminance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Base threshold `T`: minor above `T`, major above `major_factor * T`.
    pub base_threshold: f32,
    pub major_factor: f32,
    pub show_minor_edges: bool,
    /// Refined points need `magnitude * (1 - |eta|)` above this.
    pub min_quality: f32,
    pub sample_field: SampleField,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            base_threshold: 20.0,
            major_factor: 2.5,
            show_minor_edges: false,
            min_quality: 10.0,
            sample_field: SampleField::Magnitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCandidate {
    pub x: usize,
    pub y: usize,
    pub magnitude: f32,
    pub direction: f32,
    pub is_major: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedEdgePoint {
    pub subpixel_x: f32,
    pub subpixel_y: f32,
    pub magnitude: f32,
    pub quality: f32,
    pub is_major: bool,
}

impl RefinedEdgePoint {
    pub fn position(&self) -> Point2f {
        Point2f {
            x: self.subpixel_x,
            y: self.subpixel_y,
        }
    }
}

/// Parabolic peak offset through `(-1, a)`, `(0, b)`, `(1, c)`.
///
/// Only defined when `b` is a strict local maximum; otherwise, or when the
/// parabola is degenerate, the offset is `0`. The result always satisfies
/// `|eta| < 1`.
pub fn devernay_offset(a: f32, b: f32, c: f32) -> f32 {
    if !(b > a && b > c) {
        return 0.0;
    }
    let denom = a + c - 2.0 * b;
    if denom.abs() < DEVERNAY_EPS {
        return 0.0;
    }
    let eta = 0.5 * (a - c) / denom;
    if eta.is_finite() && eta.abs() < 1.0 {
        eta
    } else {
        0.0
    }
}

pub fn classify(magnitude: f32, cfg: &RefineConfig) -> Option<EdgeClass> {
    if magnitude > cfg.major_factor * cfg.base_threshold {
        Some(EdgeClass::Major)
    } else if magnitude > cfg.base_threshold {
        Some(EdgeClass::Minor)
    } else {
        None
    }
}

/// Thresholded edge pixels of a suppressed field.
pub struct EdgeCandidates<'a> {
    suppressed: &'a Image<f32>,
    field: &'a GradientField,
    cfg: &'a RefineConfig,
    next: usize,
}

pub fn candidates<'a>(
    suppressed: &'a Image<f32>,
    field: &'a GradientField,
    cfg: &'a RefineConfig,
) -> EdgeCandidates<'a> {
    EdgeCandidates {
        suppressed,
        field,
        cfg,
        next: 0,
    }
}

impl Iterator for EdgeCandidates<'_> {
    type Item = EdgeCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        let w = self.suppressed.width();
        let mags = self.suppressed.data();
        while self.next < mags.len() {
            let idx = self.next;
            self.next += 1;

            let (x, y) = (idx % w, idx / w);
            if self.field.is_border(x, y) {
                continue;
            }
            let is_major = match classify(mags[idx], self.cfg) {
                Some(EdgeClass::Major) => true,
                Some(EdgeClass::Minor) if self.cfg.show_minor_edges => false,
                _ => continue,
            };
            return Some(EdgeCandidate {
                x,
                y,
                magnitude: mags[idx],
                direction: self.field.direction.data()[idx],
                is_major,
            });
        }
        None
    }
}

/// Candidates refined to sub-pixel positions and filtered by quality.
pub struct RefinedEdges<'a> {
    candidates: EdgeCandidates<'a>,
    samples: &'a Image<f32>,
}

/// `luminance` is only read with [`SampleField::Luminance`].
pub fn refine_edges<'a>(
    suppressed: &'a Image<f32>,
    field: &'a GradientField,
    luminance: &'a Image<f32>,
    cfg: &'a RefineConfig,
) -> RefinedEdges<'a> {
    let samples = match cfg.sample_field {
        SampleField::Magnitude => &field.magnitude,
        SampleField::Luminance => luminance,
    };
    RefinedEdges {
        candidates: candidates(suppressed, field, cfg),
        samples,
    }
}

impl RefinedEdges<'_> {
    fn refine(&self, cand: &EdgeCandidate) -> Option<RefinedEdgePoint> {
        let field = self.candidates.field;
        let idx = cand.y * field.width() + cand.x;
        let normal = Vec2f::edge_normal(field.gx.data()[idx], field.gy.data()[idx])?;
        let (sx, sy) = normal.dominant_step();

        let at = |dx: isize, dy: isize| {
            let x = (cand.x as isize + dx) as usize;
            let y = (cand.y as isize + dy) as usize;
            self.samples.data()[y * self.samples.width() + x]
        };
        let eta = devernay_offset(at(-sx, -sy), at(0, 0), at(sx, sy));
        let quality = cand.magnitude * (1.0 - eta.abs());
        if quality <= self.candidates.cfg.min_quality {
            return None;
        }

        let p = Point2f::pixel(cand.x, cand.y).along(normal, eta);
        Some(RefinedEdgePoint {
            subpixel_x: p.x,
            subpixel_y: p.y,
            magnitude: cand.magnitude,
            quality,
            is_major: cand.is_major,
        })
    }
}

impl Iterator for RefinedEdges<'_> {
    type Item = RefinedEdgePoint;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(cand) = self.candidates.next() {
            if let Some(point) = self.refine(&cand) {
                return Some(point);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use tm_core::Image;

    use super::{
        EdgeClass, RefineConfig, SampleField, candidates, classify, devernay_offset,
        refine_edges,
    };
    use crate::binarize::{gaussian_blur, luminance_image};
    use crate::nms::{NmsConfig, suppress};
    use crate::sobel::sobel;

    #[test]
    fn offset_requires_strict_local_max() {
        assert_eq!(devernay_offset(3.0, 3.0, 1.0), 0.0);
        assert_eq!(devernay_offset(1.0, 2.0, 5.0), 0.0);
        assert_eq!(devernay_offset(4.0, 4.0, 4.0), 0.0);
        assert_eq!(devernay_offset(1.0, 2.0, 1.0), 0.0);
        // Peak leans towards the larger neighbour.
        assert!(devernay_offset(2.0, 3.0, 1.0) < 0.0);
        assert!(devernay_offset(1.0, 3.0, 2.0) > 0.0);
        assert!((devernay_offset(2.0, 3.0, 1.0) + 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn offset_is_bounded_for_all_strict_maxima() {
        let samples = [0.0f32, 0.001, 0.5, 1.0, 3.0, 9.99, 10.0];
        for &a in &samples {
            for &c in &samples {
                let eta = devernay_offset(a, 10.0, c);
                assert!(eta.is_finite());
                assert!(eta.abs() < 1.0, "a={a} c={c} eta={eta}");
            }
        }
        assert_eq!(devernay_offset(1.0, 1.0 + 1e-8, 1.0), 0.0);
    }

    #[test]
    fn classification_bands() {
        let cfg = RefineConfig {
            base_threshold: 10.0,
            ..RefineConfig::default()
        };
        assert_eq!(classify(26.0, &cfg), Some(EdgeClass::Major));
        assert_eq!(classify(25.0, &cfg), Some(EdgeClass::Minor));
        assert_eq!(classify(10.5, &cfg), Some(EdgeClass::Minor));
        assert_eq!(classify(10.0, &cfg), None);
    }

    #[test]
    fn minor_edges_only_with_flag() {
        // Weak step (minor) next to a strong one (major).
        let img = Image::from_fn(40, 12, |x, _| match x {
            0..10 => 0u8,
            10..30 => 200,
            _ => 208,
        });
        let field = sobel(&img);
        let suppressed = suppress(&field, &NmsConfig::default());

        let mut cfg = RefineConfig {
            base_threshold: 30.0,
            ..RefineConfig::default()
        };
        let majors: Vec<_> = candidates(&suppressed, &field, &cfg).collect();
        assert!(!majors.is_empty());
        assert!(majors.iter().all(|c| c.is_major && (9..=10).contains(&c.x)));

        cfg.show_minor_edges = true;
        let all: Vec<_> = candidates(&suppressed, &field, &cfg).collect();
        assert!(all.iter().any(|c| !c.is_major && (29..=30).contains(&c.x)));
    }

    #[test]
    fn blurred_vertical_edge_refines_towards_true_position() {
        let edge_x = 20.5f32;
        let raw = Image::from_fn(48, 16, |x, _| if (x as f32) > edge_x { 255.0f32 } else { 0.0 });
        let gray = gaussian_blur(&raw.as_view(), 1.5, Default::default());
        let field = sobel(&gray);
        let suppressed = suppress(&field, &NmsConfig::default());
        let lum = luminance_image(&gray);
        let cfg = RefineConfig::default();

        let points: Vec<_> = refine_edges(&suppressed, &field, &lum, &cfg).collect();
        assert!(!points.is_empty());
        for p in &points {
            assert!((p.subpixel_x - edge_x).abs() <= 0.5, "x={}", p.subpixel_x);
            assert!(p.quality > cfg.min_quality);
            assert!(p.quality <= p.magnitude);
        }
    }

    #[test]
    fn flat_image_yields_no_edges() {
        let img = Image::new_fill(16, 16, 128u8);
        let field = sobel(&img);
        let suppressed = suppress(&field, &NmsConfig::default());
        let lum = luminance_image(&img);
        let cfg = RefineConfig {
            sample_field: SampleField::Luminance,
            ..RefineConfig::default()
        };
        assert_eq!(refine_edges(&suppressed, &field, &lum, &cfg).count(), 0);
    }
}
