//! Range-bin reclassification
//!
//! Maps continuous cell values into small integer classes using an ordered
//! table of half-open `[min, max)` bins.

use crate::maybe_rayon::*;
use havvind_core::raster::Raster;
use havvind_core::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Class value for cells that are no-data or match no bin.
/// It is also the no-data value of every classified raster.
pub const UNCLASSIFIED: u8 = 0;

/// A bin mapping `[min, max)` to a class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReclassEntry {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (exclusive)
    pub max: f64,
    /// Output class, never [`UNCLASSIFIED`]
    pub class: u8,
}

impl ReclassEntry {
    pub fn new(min: f64, max: f64, class: u8) -> Self {
        Self { min, max, class }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }
}

/// Reclassification table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReclassifyParams {
    /// Bins in ascending order
    pub classes: Vec<ReclassEntry>,
}

impl ReclassifyParams {
    pub fn new(classes: Vec<ReclassEntry>) -> Self {
        Self { classes }
    }

    /// Check that bins are finite, non-empty, ascending and non-overlapping,
    /// and that no bin uses the reserved class 0.
    pub fn validate(&self) -> Result<()> {
        for (i, entry) in self.classes.iter().enumerate() {
            if !entry.min.is_finite() || !entry.max.is_finite() || entry.min >= entry.max {
                return Err(Error::InvalidParameter {
                    name: "classes",
                    value: format!("[{}, {})", entry.min, entry.max),
                    reason: "bin bounds must be finite with min < max".into(),
                });
            }
            if entry.class == UNCLASSIFIED {
                return Err(Error::InvalidParameter {
                    name: "classes",
                    value: format!("[{}, {}) -> {}", entry.min, entry.max, entry.class),
                    reason: "class 0 is reserved for unclassified cells".into(),
                });
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &self.classes[p]) {
                if entry.min < prev.max {
                    return Err(Error::InvalidParameter {
                        name: "classes",
                        value: format!("[{}, {}) after [{}, {})", entry.min, entry.max, prev.min, prev.max),
                        reason: "bins must be ascending and non-overlapping".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Class of a single value: the first bin containing it, else [`UNCLASSIFIED`]
#[inline]
pub fn classify_value(value: f64, classes: &[ReclassEntry]) -> u8 {
    if value.is_nan() {
        return UNCLASSIFIED;
    }
    classes
        .iter()
        .find(|entry| entry.contains(value))
        .map_or(UNCLASSIFIED, |entry| entry.class)
}

/// Reclassify a continuous raster into a categorical one.
///
/// Every bin is lower-inclusive and upper-exclusive, including the last one.
/// No-data cells and values outside all bins become [`UNCLASSIFIED`], which
/// is set as the output no-data value. The output keeps the input grid and CRS.
///
/// # Example
/// ```
/// use havvind_algorithms::classify::{reclassify, ReclassEntry, ReclassifyParams};
/// use havvind_core::Raster;
///
/// let depth = Raster::from_vec(vec![5.0, 10.0, 19.9, 20.0], 2, 2).unwrap();
/// let params = ReclassifyParams::new(vec![
///     ReclassEntry::new(10.0, 20.0, 1),
///     ReclassEntry::new(20.0, 30.0, 2),
/// ]);
/// let zones = reclassify(&depth, &params).unwrap();
/// assert_eq!(zones.data().as_slice().unwrap(), &[0, 1, 1, 2]);
/// ```
pub fn reclassify(raster: &Raster<f64>, params: &ReclassifyParams) -> Result<Raster<u8>> {
    params.validate()?;

    let (rows, cols) = raster.shape();
    let classes = params.classes.as_slice();
    let source = raster.data();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            source
                .row(row)
                .iter()
                .map(|&value| {
                    if raster.is_nodata(value) {
                        UNCLASSIFIED
                    } else {
                        classify_value(value, classes)
                    }
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    let mut output = raster.with_same_meta::<u8>();
    output.set_nodata(Some(UNCLASSIFIED));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
