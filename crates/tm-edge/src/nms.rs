//! Non-maximum suppression along the gradient direction, followed by a
//! direction-consistency boost.
//!
//! Directions are folded into `[0, pi)` and bucketed into four octant classes
//! with `pi/8` boundaries. A pixel survives when its magnitude is `>=` both
//! neighbours along its class. The second pass scans a square window around
//! every survivor and multiplies its magnitude by `boost` when enough
//! surviving neighbours share its direction (within `consistency_angle`).
//! Isolated texture responses are left unboosted.

use std::f32::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};
use tm_core::Image;

use crate::sobel::GradientField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmsConfig {
    /// Magnitudes below this are discarded before suppression.
    pub noise_floor: f32,
    /// Half-size of the consistency window (2 -> 5x5).
    pub consistency_radius: usize,
    /// Maximum direction difference, radians.
    pub consistency_angle: f32,
    pub min_consistent_neighbors: usize,
    pub boost: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            noise_floor: 5.0,
            consistency_radius: 2,
            consistency_angle: PI / 6.0,
            min_consistent_neighbors: 3,
            boost: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Octant {
    Horizontal,
    Diagonal45,
    Vertical,
    Diagonal135,
}

impl Octant {
    pub fn from_direction(direction: f32) -> Self {
        let mut a = direction.rem_euclid(PI);
        if a >= PI {
            a = 0.0;
        }
        if a < PI / 8.0 || a >= 7.0 * PI / 8.0 {
            Self::Horizontal
        } else if a < 3.0 * PI / 8.0 {
            Self::Diagonal45
        } else if a < 5.0 * PI / 8.0 {
            Self::Vertical
        } else {
            Self::Diagonal135
        }
    }

    /// Neighbour offsets `(dx, dy)` along the gradient, image y pointing down.
    pub fn neighbors(self) -> [(isize, isize); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::Diagonal45 => [(-1, -1), (1, 1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::Diagonal135 => [(1, -1), (-1, 1)],
        }
    }
}

/// Smallest absolute difference between two angles, in `[0, pi]`.
#[inline]
pub fn angle_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(2.0 * PI);
    d.min(2.0 * PI - d)
}

/// Returns the suppressed (and possibly boosted) magnitude field. Directions
/// are left in `field.direction`.
pub fn suppress(field: &GradientField, cfg: &NmsConfig) -> Image<f32> {
    let thinned = thin(field, cfg);
    boost_consistent(field, &thinned, cfg)
}

fn thin(field: &GradientField, cfg: &NmsConfig) -> Image<f32> {
    let w = field.width();
    let h = field.height();
    let mag = field.magnitude.data();
    let dir = field.direction.data();

    let mut out = vec![0.0f32; w * h];
    if w >= 3 && h >= 3 {
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let idx = y * w + x;
                let m = mag[idx];
                if m < cfg.noise_floor {
                    continue;
                }
                let is_max = Octant::from_direction(dir[idx])
                    .neighbors()
                    .iter()
                    .all(|&(dx, dy)| {
                        let nx = (x as isize + dx) as usize;
                        let ny = (y as isize + dy) as usize;
                        m >= mag[ny * w + nx]
                    });
                if is_max {
                    out[idx] = m;
                }
            }
        }
    }

    Image::from_vec(w, h, out).expect("nms buffer matches field size")
}

fn boost_consistent(field: &GradientField, thinned: &Image<f32>, cfg: &NmsConfig) -> Image<f32> {
    let w = thinned.width();
    let h = thinned.height();
    let src = thinned.data();
    let dir = field.direction.data();
    let r = cfg.consistency_radius as isize;

    let mut out = src.to_vec();
    let mut boosted = 0usize;
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if src[idx] <= 0.0 {
                continue;
            }

            let mut consistent = 0usize;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if src[nidx] > 0.0
                        && angle_distance(dir[nidx], dir[idx]) <= cfg.consistency_angle
                    {
                        consistent += 1;
                    }
                }
            }

            if consistent >= cfg.min_consistent_neighbors {
                out[idx] = src[idx] * cfg.boost;
                boosted += 1;
            }
        }
    }

    debug!("nms: {boosted} of {w}x{h} pixels boosted for direction consistency");
    Image::from_vec(w, h, out).expect("boost buffer matches field size")
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use tm_core::Image;

    use super::{NmsConfig, Octant, angle_distance, suppress};
    use crate::sobel::sobel;

    #[test]
    fn octant_buckets_use_pi_over_8_boundaries() {
        assert_eq!(Octant::from_direction(0.0), Octant::Horizontal);
        assert_eq!(Octant::from_direction(PI), Octant::Horizontal);
        assert_eq!(Octant::from_direction(-PI / 16.0), Octant::Horizontal);
        assert_eq!(Octant::from_direction(PI / 4.0), Octant::Diagonal45);
        assert_eq!(Octant::from_direction(-3.0 * PI / 4.0), Octant::Diagonal45);
        assert_eq!(Octant::from_direction(PI / 2.0), Octant::Vertical);
        assert_eq!(Octant::from_direction(-PI / 2.0), Octant::Vertical);
        assert_eq!(Octant::from_direction(3.0 * PI / 4.0), Octant::Diagonal135);
    }

    #[test]
    fn angle_distance_wraps() {
        assert!((angle_distance(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-5);
        assert!((angle_distance(0.5, -0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn straight_edge_is_thinned_and_boosted() {
        let img = Image::from_fn(20, 20, |x, _| if x >= 10 { 255u8 } else { 0 });
        let field = sobel(&img);
        let out = suppress(&field, &NmsConfig::default());

        // Sobel gives a two-pixel plateau; both columns are maxima (>=).
        let m = *field.magnitude.get(9, 10).expect("in bounds");
        assert!((out.get(9, 10).expect("in bounds") - 1.5 * m).abs() < 1e-3);
        assert!((out.get(10, 10).expect("in bounds") - 1.5 * m).abs() < 1e-3);
        assert_eq!(out.get(5, 10), Some(&0.0));
        assert_eq!(out.get(9, 0), Some(&0.0));
    }

    #[test]
    fn isolated_response_is_not_boosted() {
        let mut data = vec![0u8; 15 * 15];
        data[7 * 15 + 7] = 255;
        let img = Image::from_vec(15, 15, data).expect("valid");
        let field = sobel(&img);
        let out = suppress(&field, &NmsConfig::default());

        for (o, m) in out.data().iter().zip(field.magnitude.data()) {
            assert!(*o <= *m + 1e-3, "suppressed {o} exceeds magnitude {m}");
        }
    }

    #[test]
    fn suppression_is_bounded_by_boost() {
        let mut state = 0x1234_5678u32;
        let img = Image::from_fn(32, 24, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        });
        let field = sobel(&img);
        let cfg = NmsConfig::default();
        let out = suppress(&field, &cfg);

        for (o, m) in out.data().iter().zip(field.magnitude.data()) {
            assert!(*o >= 0.0);
            assert!(*o <= cfg.boost * *m + 1e-3);
            if *m < cfg.noise_floor {
                assert_eq!(*o, 0.0);
            }
        }
    }
}
