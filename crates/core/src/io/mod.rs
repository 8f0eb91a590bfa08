//! Reading and writing geospatial data
//!
//! - [`read_geotiff`] / [`write_geotiff`]: single-band GeoTIFF rasters
//! - [`read_shapefile`] / [`VectorPackage`]: shapefile layers and multi-layer packages
//!
//! With the `gdal` feature, packages may also be single-file OGR containers
//! such as GeoPackage.

mod geotiff;
#[cfg(feature = "gdal")]
mod gpkg;
mod shp;

pub use geotiff::{read_geotiff, write_geotiff};
pub use shp::{read_shapefile, VectorPackage};
