//! Pixel-to-millimetre calibration.
//!
//! A factor comes either from a manual reference (a known length measured
//! in pixels) or from pinhole camera geometry. [`SharedCalibration`] holds
//! the process-wide current value; readers take a snapshot and writers
//! replace the whole value, so a measurement never sees a half-updated
//! calibration.

use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, Result};

/// Millimetres per pixel; always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CalibrationFactor(f64);

impl CalibrationFactor {
    pub fn new(mm_per_px: f64) -> Result<Self> {
        if mm_per_px.is_finite() && mm_per_px > 0.0 {
            Ok(Self(mm_per_px))
        } else {
            Err(MeasureError::CalibrationMissingOrInvalid(format!(
                "factor must be positive and finite, got {mm_per_px}"
            )))
        }
    }

    pub fn mm_per_px(self) -> f64 {
        self.0
    }

    pub fn to_mm(self, pixels: f64) -> f64 {
        pixels * self.0
    }
}

impl TryFrom<f64> for CalibrationFactor {
    type Error = MeasureError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CalibrationFactor> for f64 {
    fn from(value: CalibrationFactor) -> Self {
        value.0
    }
}

/// `reference_mm / reference_pixels`.
pub fn manual_calibration(reference_pixels: f64, reference_mm: f64) -> Result<CalibrationFactor> {
    if !(reference_pixels.is_finite() && reference_pixels > 0.0) {
        return Err(MeasureError::CalibrationMissingOrInvalid(format!(
            "reference span must be positive, got {reference_pixels} px"
        )));
    }
    CalibrationFactor::new(reference_mm / reference_pixels)
}

/// Pinhole camera parameters. Defaults describe a typical phone camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraGeometry {
    pub sensor_width_mm: f64,
    pub focal_length_mm: f64,
    /// Camera to specimen.
    pub distance_mm: f64,
    pub image_width_px: u32,
}

impl Default for CameraGeometry {
    fn default() -> Self {
        Self {
            sensor_width_mm: 4.8,
            focal_length_mm: 4.0,
            distance_mm: 300.0,
            image_width_px: 1280,
        }
    }
}

impl CameraGeometry {
    /// `(sensor * distance) / (focal * image_width)`.
    pub fn factor(&self) -> Result<CalibrationFactor> {
        let denom = self.focal_length_mm * f64::from(self.image_width_px);
        if !(denom.is_finite() && denom > 0.0) {
            return Err(MeasureError::CalibrationMissingOrInvalid(format!(
                "focal length {} mm and image width {} px must be positive",
                self.focal_length_mm, self.image_width_px
            )));
        }
        CalibrationFactor::new(self.sensor_width_mm * self.distance_mm / denom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum CalibrationSource {
    Manual {
        reference_pixels: f64,
        reference_mm: f64,
    },
    Camera(CameraGeometry),
    /// Factor supplied directly by the caller.
    Fixed,
}

/// A factor together with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    pub factor: CalibrationFactor,
    pub source: CalibrationSource,
}

impl Calibration {
    pub fn manual(reference_pixels: f64, reference_mm: f64) -> Result<Self> {
        Ok(Self {
            factor: manual_calibration(reference_pixels, reference_mm)?,
            source: CalibrationSource::Manual {
                reference_pixels,
                reference_mm,
            },
        })
    }

    pub fn camera(geometry: CameraGeometry) -> Result<Self> {
        Ok(Self {
            factor: geometry.factor()?,
            source: CalibrationSource::Camera(geometry),
        })
    }

    pub fn fixed(mm_per_px: f64) -> Result<Self> {
        Ok(Self {
            factor: CalibrationFactor::new(mm_per_px)?,
            source: CalibrationSource::Fixed,
        })
    }

    pub fn mm_per_px(&self) -> f64 {
        self.factor.mm_per_px()
    }

    /// Only camera-geometry calibrations know the distance.
    pub fn camera_distance(&self) -> Option<f64> {
        match self.source {
            CalibrationSource::Camera(g) => Some(g.distance_mm),
            _ => None,
        }
    }
}

/// Process-wide current calibration with replace-on-write updates.
#[derive(Debug, Default)]
pub struct SharedCalibration {
    current: RwLock<Option<Calibration>>,
}

impl SharedCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(calibration: Calibration) -> Self {
        Self {
            current: RwLock::new(Some(calibration)),
        }
    }

    /// Installs `calibration`, returning the previous value.
    pub fn replace(&self, calibration: Calibration) -> Option<Calibration> {
        info!(
            "calibration set to {:.5} mm/px ({:?})",
            calibration.mm_per_px(),
            calibration.source
        );
        self.current.write().replace(calibration)
    }

    pub fn clear(&self) -> Option<Calibration> {
        self.current.write().take()
    }

    pub fn get(&self) -> Option<Calibration> {
        *self.current.read()
    }

    /// Current value, or `CalibrationMissingOrInvalid` when unset.
    pub fn snapshot(&self) -> Result<Calibration> {
        self.get().ok_or_else(|| {
            MeasureError::CalibrationMissingOrInvalid("no calibration has been set".into())
        })
    }

    /// Switches to camera-geometry mode (keeping any existing geometry) and
    /// recomputes the factor for the new distance.
    pub fn set_camera_distance(&self, distance_mm: f64) -> Result<Calibration> {
        let mut guard = self.current.write();
        let mut geometry = match guard.as_ref().map(|c| c.source) {
            Some(CalibrationSource::Camera(g)) => g,
            _ => CameraGeometry::default(),
        };
        geometry.distance_mm = distance_mm;
        let next = Calibration::camera(geometry)?;
        *guard = Some(next);
        info!(
            "camera distance {distance_mm} mm -> {:.5} mm/px",
            next.mm_per_px()
        );
        Ok(next)
    }

    /// Recomputes a camera-geometry factor for a new frame width. Manual and
    /// fixed factors are left untouched.
    pub fn set_image_width(&self, image_width_px: u32) -> Result<Calibration> {
        let mut guard = self.current.write();
        match guard.as_ref().copied() {
            Some(Calibration {
                source: CalibrationSource::Camera(mut geometry),
                ..
            }) => {
                geometry.image_width_px = image_width_px;
                let next = Calibration::camera(geometry)?;
                *guard = Some(next);
                Ok(next)
            }
            Some(other) => Ok(other),
            None => Err(MeasureError::CalibrationMissingOrInvalid(
                "no calibration has been set".into(),
            )),
        }
    }
}
