//! # Havvind Colormap
//!
//! Color mapping, map figures and PNG export.
//!
//! A [`Figure`] is a fixed-size RGBA canvas that maps a world extent into a
//! padded, aspect-preserving plot area. Rasters are drawn through a
//! [`ColormapParams`], vector layers as anti-aliased points, lines or
//! outlines, and text in an embedded font. The canvas is written as a PNG
//! carrying its print resolution.
//!
//! ## Usage
//!
//! ```ignore
//! use havvind_colormap::{auto_params, ColorScheme, Figure};
//!
//! let params = auto_params(&wind, ColorScheme::Wind);
//! let mut fig = Figure::new(1600, 1200, wind.bounds())?;
//! fig.draw_raster(&wind, &params);
//! fig.draw_title("Wind power density (W/m²)");
//! fig.draw_colorbar(&params);
//! fig.save("wind_power.png", 200)?;
//! ```

mod figure;
mod png;
mod render;
mod scheme;

pub use figure::{Extent, Figure};
pub use png::{encode_png, RenderError};
pub use render::{auto_params, ColormapParams};
pub use scheme::{evaluate, ColorScheme, Rgb};
