use thiserror::Error;
use tm_edge::Orientation;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("calibration missing or invalid: {0}")]
    CalibrationMissingOrInvalid(String),
    #[error("no valid edge pair detected for {orientation}")]
    NoEdgesDetected { orientation: Orientation },
    #[error("ambiguous {orientation} edge pair: spans {span_a:.2} px and {span_b:.2} px score equally")]
    AmbiguousEdgePair {
        orientation: Orientation,
        span_a: f32,
        span_b: f32,
    },
    #[error("{orientation} of {value_mm:.2} mm exceeds the {limit_mm:.2} mm limit")]
    MeasurementOutOfBounds {
        orientation: Orientation,
        value_mm: f64,
        limit_mm: f64,
    },
    #[error("invalid guide lines: {0}")]
    InvalidGuideLines(String),
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("measurement cancelled")]
    Cancelled,
    #[error("measurement timed out after {budget_ms} ms")]
    TimedOut { budget_ms: u64 },
}

impl From<tm_core::Error> for MeasureError {
    fn from(err: tm_core::Error) -> Self {
        Self::InvalidImage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MeasureError>;
