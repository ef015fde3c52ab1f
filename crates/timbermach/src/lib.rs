//! Umbrella crate for the TimberMach measurement engine.
//!
//! Re-exports the image containers of `tm-core`, the edge primitives of
//! `tm-edge` and the measurement pipeline of `tm-measure`.

pub use tm_core::*;
pub use tm_edge::{
    BinarizeConfig, EdgePairResult, EdgePolarity, LocalThreshold, NmsConfig, Orientation,
    RefineConfig, RefinedEdgePoint, SampleField, ScanConfig, ScanLineEdge, TieBreak,
};
pub use tm_measure::*;

pub mod edge {
    //! Lower-level edge primitives.
    pub use tm_edge::*;
}
