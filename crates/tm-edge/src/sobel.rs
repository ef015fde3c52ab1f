//! 3x3 Sobel gradients with magnitude and direction.
//!
//! The outermost 1-pixel frame is never convolved: no wraparound and no
//! padding. All four channels read `0.0` there.

use tm_core::{Image, ImageBuffer};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Per-pixel gradient buffers, indexed like the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    pub gx: Image<f32>,
    pub gy: Image<f32>,
    /// `sqrt(gx^2 + gy^2)`
    pub magnitude: Image<f32>,
    /// `atan2(gy, gx)` in `(-pi, pi]`
    pub direction: Image<f32>,
}

impl GradientField {
    pub fn width(&self) -> usize {
        self.magnitude.width()
    }

    pub fn height(&self) -> usize {
        self.magnitude.height()
    }

    #[inline]
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 >= self.width() || y + 1 >= self.height()
    }
}

pub fn sobel<B: ImageBuffer + ?Sized>(src: &B) -> GradientField {
    let w = src.width();
    let h = src.height();
    let n = w * h;
    let mut gx = vec![0.0f32; n];
    let mut gy = vec![0.0f32; n];
    let mut mag = vec![0.0f32; n];
    let mut dir = vec![0.0f32; n];

    if w >= 3 && h >= 3 {
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let mut sx = 0.0f32;
                let mut sy = 0.0f32;
                for (ky, (kx_row, ky_row)) in SOBEL_KERNEL_X.iter().zip(&SOBEL_KERNEL_Y).enumerate() {
                    for kx in 0..3 {
                        let v = src.luma(x + kx - 1, y + ky - 1);
                        sx += v * kx_row[kx];
                        sy += v * ky_row[kx];
                    }
                }

                let idx = y * w + x;
                gx[idx] = sx;
                gy[idx] = sy;
                mag[idx] = (sx * sx + sy * sy).sqrt();
                dir[idx] = sy.atan2(sx);
            }
        }
    }

    let wrap = |data| Image::from_vec(w, h, data).expect("gradient buffers match source size");
    GradientField {
        gx: wrap(gx),
        gy: wrap(gy),
        magnitude: wrap(mag),
        direction: wrap(dir),
    }
}
