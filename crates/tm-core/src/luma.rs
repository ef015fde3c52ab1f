//! Luminance access independent of any graphics context.
//!
//! Color pixels use the fixed weighting `Y = 0.21 R + 0.72 G + 0.07 B`.
//! These are not the Rec. 601 / Rec. 709 coefficients. Every brightness
//! threshold downstream was tuned against this weighting, so it must not be
//! swapped for a standard one. Alpha is ignored.

use crate::image::{Image, ImageView, Rgba8};

pub const LUMA_WEIGHTS: [f32; 3] = [0.21, 0.72, 0.07];

#[inline]
pub fn luminance(px: Rgba8) -> f32 {
    LUMA_WEIGHTS[0] * px[0] as f32 + LUMA_WEIGHTS[1] * px[1] as f32 + LUMA_WEIGHTS[2] * px[2] as f32
}

/// Pixel types that carry a luminance value on the `[0, 255]` scale.
pub trait LumaPixel: Copy {
    fn luma(self) -> f32;
}

impl LumaPixel for u8 {
    #[inline]
    fn luma(self) -> f32 {
        self as f32
    }
}

impl LumaPixel for f32 {
    #[inline]
    fn luma(self) -> f32 {
        self
    }
}

impl LumaPixel for Rgba8 {
    #[inline]
    fn luma(self) -> f32 {
        luminance(self)
    }
}

/// Read-only pixel accessor consumed by the measurement algorithms.
pub trait ImageBuffer {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Luminance at `(x, y)`. Callers stay inside `width() x height()`.
    fn luma(&self, x: usize, y: usize) -> f32;
}

impl<T: LumaPixel> ImageBuffer for ImageView<'_, T> {
    fn width(&self) -> usize {
        ImageView::width(self)
    }

    fn height(&self) -> usize {
        ImageView::height(self)
    }

    fn luma(&self, x: usize, y: usize) -> f32 {
        self.row(y)[x].luma()
    }
}

impl<T: LumaPixel> ImageBuffer for Image<T> {
    fn width(&self) -> usize {
        Image::width(self)
    }

    fn height(&self) -> usize {
        Image::height(self)
    }

    fn luma(&self, x: usize, y: usize) -> f32 {
        self.data()[y * Image::width(self) + x].luma()
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageBuffer, LUMA_WEIGHTS, luminance};
    use crate::Image;

    #[test]
    fn weights_are_kept_verbatim() {
        assert_eq!(LUMA_WEIGHTS, [0.21, 0.72, 0.07]);
        assert!((luminance([100, 0, 0, 255]) - 21.0).abs() < 1e-4);
        assert!((luminance([0, 100, 0, 0]) - 72.0).abs() < 1e-4);
        assert!((luminance([0, 0, 100, 17]) - 7.0).abs() < 1e-4);
    }

    #[test]
    fn gray_and_rgba_buffers_agree_on_neutral_pixels() {
        let gray = Image::from_fn(4, 2, |x, y| (x * 40 + y * 10) as u8);
        let rgba = gray.map(|&v| [v, v, v, 255]);

        for y in 0..2 {
            for x in 0..4 {
                let g = gray.luma(x, y);
                assert!((rgba.luma(x, y) - g).abs() < 1e-3);
                assert!((gray.as_view().luma(x, y) - g).abs() < 1e-6);
            }
        }
    }
}
