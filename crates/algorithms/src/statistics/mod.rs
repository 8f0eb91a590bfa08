//! Statistics over raster values
//!
//! - **zonal**: per-class statistics of a value raster under a class raster
//! - **summary**: count/min/max/mean that stay undefined on empty input

pub mod summary;
pub mod zonal;

pub use summary::{summarize, Summary};
pub use zonal::{zonal_statistics, ZonalResult};
