//! Warping a raster onto another grid
//!
//! Each target cell centre is transformed into the source CRS and sampled
//! there, so the output matches the template's CRS, transform and shape
//! exactly. Target cells outside the source coverage are NaN.

use crate::maybe_rayon::*;
use crate::sampling::{sample, SampleMethod};
use havvind_core::crs::CoordinateTransform;
use havvind_core::raster::{Raster, RasterElement};
use havvind_core::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Interpolation used when warping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Value of the source cell containing the target centre
    Nearest,
    /// Bilinear interpolation, suitable for continuous fields
    #[default]
    Bilinear,
}

impl From<Resampling> for SampleMethod {
    fn from(r: Resampling) -> Self {
        match r {
            Resampling::Nearest => SampleMethod::Nearest,
            Resampling::Bilinear => SampleMethod::Bilinear,
        }
    }
}

/// Warp `source` onto the grid of `template`.
///
/// Both rasters need a CRS. The result has the template's transform, shape
/// and CRS, with NaN as its no-data value.
pub fn warp<U: RasterElement>(
    source: &Raster<f64>,
    template: &Raster<U>,
    method: Resampling,
) -> Result<Raster<f64>> {
    let src_crs = source
        .crs()
        .ok_or_else(|| Error::MissingCrs("warp source".into()))?;
    let dst_crs = template
        .crs()
        .ok_or_else(|| Error::MissingCrs("warp template".into()))?;
    let to_source = CoordinateTransform::new(dst_crs, src_crs)?;

    let (rows, cols) = template.shape();
    let gt = *template.transform();
    let method = SampleMethod::from(method);
    debug!(
        "warping {}x{} {} onto {}x{} {}",
        source.rows(),
        source.cols(),
        src_crs,
        rows,
        cols,
        dst_crs
    );

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (x, y) = gt.pixel_to_geo(col, row);
                    let (sx, sy) = to_source.transform(x, y);
                    if !sx.is_finite() || !sy.is_finite() {
                        return f64::NAN;
                    }
                    sample(source, sx, sy, method).unwrap_or(f64::NAN)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = template.with_same_meta::<f64>();
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
