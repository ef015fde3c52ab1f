//! Foundational primitives for the TimberMach measurement engine.
//!
//! ## Image Views and Stride
//! Images use element stride (not byte stride). `stride` is the distance, in
//! elements, between adjacent row starts and may be greater than `width`.
//!
//! ## Pixel Access
//! Algorithms read pixels through [`ImageBuffer`], which exposes dimensions and
//! a luminance accessor. Decoding and canvas handling stay with the caller.
//!
//! ## Coordinates
//! Integer coordinates refer to pixel centers.

mod border;
mod error;
mod geom;
mod image;
mod luma;

pub use border::{BorderMode, map_index};
pub use error::Error;
pub use geom::{Point2f, Vec2f};
pub use image::{Image, ImageView, Rgba8};
pub use luma::{ImageBuffer, LUMA_WEIGHTS, LumaPixel, luminance};
