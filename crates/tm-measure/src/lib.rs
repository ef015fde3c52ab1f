//! Dimensional measurement of timber specimens.
//!
//! [`measure`] finds the dark specimen on a bright background with a few
//! horizontal and vertical scan lines, then converts the pixel spans with a
//! [`Calibration`]. [`edge_map`] is the independent 2D path used for visual
//! feedback; [`measure_from_lines`] converts operator-placed guide lines.
//!
//! Everything here is synchronous. Long runs are bounded by
//! [`MeasureParams::time_budget_ms`] and can be stopped with a
//! [`CancelToken`]; the only shared state is [`SharedCalibration`].

pub mod calibration;
pub mod cancel;
pub mod debounce;
pub mod edge_map;
pub mod error;
pub mod guide;
pub mod history;
pub mod measure;
pub mod params;

pub use calibration::{
    Calibration, CalibrationFactor, CalibrationSource, CameraGeometry, SharedCalibration,
    manual_calibration,
};
pub use cancel::{CancelToken, Deadline};
pub use debounce::Debouncer;
pub use edge_map::{EdgeMap, edge_map};
pub use error::{MeasureError, Result};
pub use guide::{GuideLimits, GuideLines, measure_from_lines, validate_guide_lines};
pub use history::{HistoryEntry, MeasurementHistory};
pub use measure::{
    DimensionMeasurement, MeasuredEdges, MeasurementResult, detect_edge_pair, measure,
    measure_height, measure_length, measure_width, measure_with_cancel, preprocess,
};
pub use params::{EdgeMapParams, MeasureParams};
