//! Pixel-level edge primitives for dimensional measurement.
//!
//! Coordinates follow pixel-center convention: pixel `(x, y)` is located at
//! position `(x, y)`, with `y` growing downwards.
//!
//! Two independent paths share the same building blocks:
//! - the scan-line path ([`scanline`]) measures a dark object against a bright
//!   background with a handful of 1D profiles;
//! - the 2D path ([`sobel`] -> [`nms`] -> [`subpix`]) produces a thinned,
//!   sub-pixel edge map for visualization.

pub mod binarize;
pub mod conv1d;
pub mod kernels1d;
pub mod nms;
pub mod scanline;
pub mod sobel;
pub mod subpix;

pub use binarize::{
    BINARY_BLACK, BINARY_WHITE, BinarizeConfig, LocalThreshold, binarize, enhance_contrast,
    gaussian_blur, local_threshold, luminance_image, threshold,
};
pub use kernels1d::GaussianKernel1D;
pub use nms::{NmsConfig, Octant, suppress};
pub use scanline::{
    EdgePairResult, EdgePolarity, Orientation, PairSelector, ScanConfig, ScanLineDetector,
    ScanLineEdge, TieBreak, best_pair_on_line, extract_profile, scan_line_positions,
};
pub use sobel::{GradientField, sobel};
pub use subpix::{
    EdgeCandidate, EdgeClass, RefineConfig, RefinedEdgePoint, SampleField, candidates,
    devernay_offset, refine_edges,
};
