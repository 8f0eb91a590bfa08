//! # Havvind Algorithms
//!
//! Raster and vector operations used by the siting pipeline.
//!
//! - **classify**: range-bin reclassification into categorical rasters
//! - **sampling**: point values from a raster (nearest cell, bilinear)
//! - **vector**: buffers, polygon union, measurements
//! - **mask**: excluding raster cells covered by polygons
//! - **resample**: warping a raster onto another grid and CRS
//! - **statistics**: zonal statistics and empty-safe summaries

pub mod classify;
pub mod mask;
pub(crate) mod maybe_rayon;
pub mod resample;
pub mod sampling;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classify::{reclassify, ReclassEntry, ReclassifyParams};
    pub use crate::mask::{exclusion_mask, mask_out, MaskParams};
    pub use crate::resample::{warp, Resampling};
    pub use crate::sampling::{sample, SampleMethod};
    pub use crate::statistics::{summarize, zonal_statistics, Summary, ZonalResult};
    pub use crate::vector::{
        buffer_geometry, buffer_line, buffer_point, union_all, BufferParams,
    };
    pub use havvind_core::prelude::*;
}
