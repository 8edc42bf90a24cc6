//! Scribe core types
//!
//! Geometry and colour primitives shared by `scribe_text` and the `scribe`
//! command line tool. Everything here is plain `Copy` data measured in
//! pixels (geometry) or normalised channels (colour).

pub mod color;
pub mod geometry;

pub use color::{Color, ColorParseError};
pub use geometry::{Point, Rect, Size};
