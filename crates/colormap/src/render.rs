//! Value ranges for rendering rasters with a color scheme

use crate::scheme::{evaluate, ColorScheme, Rgb};
use havvind_core::raster::{Raster, RasterElement};

/// Parameters for colormap rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ColormapParams {
    /// Scheme evaluated over `[min, max]`
    pub scheme: ColorScheme,
    /// Value mapped to the start of the scheme; lower values are clamped.
    pub min: f64,
    /// Value mapped to the end of the scheme; higher values are clamped.
    pub max: f64,
}

impl ColormapParams {
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
        }
    }

    /// Color of a value, `None` for values that are not finite
    pub fn color_of(&self, value: f64) -> Option<Rgb> {
        if !value.is_finite() {
            return None;
        }
        let range = self.max - self.min;
        let t = if range.abs() > f64::EPSILON {
            (value - self.min) / range
        } else {
            0.0
        };
        Some(evaluate(self.scheme, t))
    }
}

/// Colormap parameters spanning the defined values of `raster`.
///
/// Categorical schemes use their fixed class range. An all-no-data raster
/// gets `[0, 1]` and a constant one `[v, v + 1]`.
pub fn auto_params<T: RasterElement>(raster: &Raster<T>, scheme: ColorScheme) -> ColormapParams {
    if let Some((min, max)) = scheme.fixed_range() {
        return ColormapParams::with_range(scheme, min, max);
    }

    let stats = raster.statistics();
    let min = stats.min.and_then(|v| v.to_f64()).filter(|v| v.is_finite());
    let max = stats.max.and_then(|v| v.to_f64()).filter(|v| v.is_finite());

    let (min, max) = match (min, max) {
        (Some(lo), Some(hi)) if (hi - lo).abs() < f64::EPSILON => (lo, lo + 1.0),
        (Some(lo), Some(hi)) => (lo, hi),
        _ => (0.0, 1.0),
    };

    ColormapParams::with_range(scheme, min, max)
}
