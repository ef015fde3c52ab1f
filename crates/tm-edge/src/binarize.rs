//! Grayscale conversion, noise suppression and brightness thresholding.
//!
//! Output of [`binarize`] has the input's dimensions and contains only
//! [`BINARY_BLACK`] and [`BINARY_WHITE`].

use serde::{Deserialize, Serialize};
use tm_core::{BorderMode, Image, ImageBuffer, ImageView};

use crate::kernels1d::GaussianKernel1D;

pub const BINARY_BLACK: u8 = 0;
pub const BINARY_WHITE: u8 = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// Pixels with luminance `>= threshold` become white.
    pub threshold: u8,
    /// Gaussian blur sigma applied before thresholding; `0` disables it.
    pub sigma: f32,
    /// Contrast stretch around the image mean; `1.0` disables it.
    pub contrast_factor: f32,
    pub border: BorderMode,
    /// Compare each pixel with its neighbourhood instead of `threshold`.
    pub adaptive: Option<LocalThreshold>,
}

/// Gaussian-weighted local mean thresholding for unevenly lit scenes.
///
/// A pixel is white when `Y >= mean - offset`, where `mean` is the Gaussian
/// average over a `window x window` neighbourhood. Regions wider than the
/// window turn white in their interior; only their outlines stay dark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalThreshold {
    /// Odd neighbourhood size in pixels, at least 3.
    pub window: usize,
    pub offset: f32,
}

impl Default for LocalThreshold {
    fn default() -> Self {
        Self {
            window: 25,
            offset: 10.0,
        }
    }
}

impl LocalThreshold {
    /// Gaussian sigma covering the window (the usual `0.3 (k/2 - 1) + 0.8`).
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.window as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            threshold: 200,
            sigma: 0.0,
            contrast_factor: 1.0,
            border: BorderMode::Clamp,
            adaptive: None,
        }
    }
}

pub fn luminance_image<B: ImageBuffer + ?Sized>(img: &B) -> Image<f32> {
    Image::from_fn(img.width(), img.height(), |x, y| img.luma(x, y))
}

/// Separable Gaussian blur. `sigma == 0` (or any non-positive value) returns
/// an unmodified copy.
pub fn gaussian_blur(src: &ImageView<'_, f32>, sigma: f32, border: BorderMode) -> Image<f32> {
    let Some(kernel) = GaussianKernel1D::new(sigma) else {
        return src.to_image();
    };

    let w = src.width();
    let h = src.height();
    if w == 0 || h == 0 {
        return src.to_image();
    }

    let mut horizontal = vec![0.0f32; w * h];
    for y in 0..h {
        kernel.smooth(src.row(y), border, &mut horizontal[y * w..(y + 1) * w]);
    }

    let mut out = vec![0.0f32; w * h];
    let mut column = vec![0.0f32; h];
    let mut blurred = vec![0.0f32; h];
    for x in 0..w {
        for (y, c) in column.iter_mut().enumerate() {
            *c = horizontal[y * w + x];
        }
        kernel.smooth(&column, border, &mut blurred);
        for (y, &v) in blurred.iter().enumerate() {
            out[y * w + x] = v;
        }
    }

    Image::from_fn(w, h, |x, y| out[y * w + x])
}

/// Stretches values around the image mean: `mean + (v - mean) * factor`,
/// clamped to `[0, 255]`.
pub fn enhance_contrast(src: &ImageView<'_, f32>, factor: f32) -> Image<f32> {
    let n = src.width() * src.height();
    if n == 0 {
        return src.to_image();
    }

    let mut sum = 0.0f64;
    for y in 0..src.height() {
        sum += src.row(y).iter().map(|&v| v as f64).sum::<f64>();
    }
    let mean = (sum / n as f64) as f32;

    Image::from_fn(src.width(), src.height(), |x, y| {
        let v = src.row(y)[x];
        (mean + (v - mean) * factor).clamp(0.0, 255.0)
    })
}

pub fn threshold<B: ImageBuffer + ?Sized>(src: &B, threshold: u8) -> Image<u8> {
    let t = threshold as f32;
    Image::from_fn(src.width(), src.height(), |x, y| {
        if src.luma(x, y) >= t {
            BINARY_WHITE
        } else {
            BINARY_BLACK
        }
    })
}

pub fn local_threshold(
    src: &ImageView<'_, f32>,
    cfg: &LocalThreshold,
    border: BorderMode,
) -> Image<u8> {
    let mean = gaussian_blur(src, cfg.sigma(), border);
    Image::from_fn(src.width(), src.height(), |x, y| {
        if src.row(y)[x] >= mean.data()[y * src.width() + x] - cfg.offset {
            BINARY_WHITE
        } else {
            BINARY_BLACK
        }
    })
}

pub fn binarize<B: ImageBuffer + ?Sized>(img: &B, cfg: &BinarizeConfig) -> Image<u8> {
    let mut gray = luminance_image(img);
    if (cfg.contrast_factor - 1.0).abs() > f32::EPSILON {
        gray = enhance_contrast(&gray.as_view(), cfg.contrast_factor);
    }
    if cfg.sigma > 0.0 {
        gray = gaussian_blur(&gray.as_view(), cfg.sigma, cfg.border);
    }
    match &cfg.adaptive {
        Some(local) => local_threshold(&gray.as_view(), local, cfg.border),
        None => threshold(&gray, cfg.threshold),
    }
}
