//! Vector geometry operations
//!
//! - Buffer: discs around points, capsules along lines, grown polygons
//! - Union: merging overlapping polygons into one seamless geometry
//! - Measurements: planar area

mod buffer;
mod measurements;
mod union;

pub use buffer::{buffer_geometry, buffer_line, buffer_point, BufferParams};
pub use measurements::total_area;
pub use union::{union_all, union_pair};
