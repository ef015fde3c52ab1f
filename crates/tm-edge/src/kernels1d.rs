use tm_core::BorderMode;

use crate::conv1d::convolve_f32;

/// Sampled Gaussian used for profile smoothing and the separable blur.
///
/// `radius = ceil(3 sigma)` (at least 1) and the taps sum to one, so a flat
/// signal keeps its level.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel1D {
    pub sigma: f32,
    pub radius: usize,
    pub taps: Vec<f32>,
}

impl GaussianKernel1D {
    /// `None` unless `sigma` is finite and positive.
    pub fn new(sigma: f32) -> Option<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return None;
        }
        let radius = ((3.0 * sigma).ceil() as usize).max(1);
        let denom = 2.0 * sigma * sigma;
        let raw: Vec<f32> = (-(radius as isize)..=radius as isize)
            .map(|d| (-((d * d) as f32) / denom).exp())
            .collect();
        let total: f32 = raw.iter().sum();
        let taps = raw.into_iter().map(|t| t / total).collect();
        Some(Self {
            sigma,
            radius,
            taps,
        })
    }

    /// Smooths `signal` into `out` (same length).
    pub fn smooth(&self, signal: &[f32], border: BorderMode, out: &mut [f32]) {
        convolve_f32(signal, &self.taps, self.radius, border, out);
    }
}
