//! Zonal statistics
//!
//! Statistics of a value raster for each class of a categorical raster on
//! the same grid. Class 0 and the class raster's no-data value are skipped,
//! as are undefined values.

use havvind_core::raster::Raster;
use havvind_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalResult {
    /// Class value in the zone raster
    pub zone: u8,
    /// Defined values in the class
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Mean of the two middle values for even counts
    pub median: f64,
}

/// Compute per-class statistics of `values` under `zones`.
///
/// Classes without any defined value are absent from the result.
pub fn zonal_statistics(values: &Raster<f64>, zones: &Raster<u8>) -> Result<BTreeMap<u8, ZonalResult>> {
    let (rows_v, cols_v) = values.shape();
    let (rows_z, cols_z) = zones.shape();

    if rows_v != rows_z || cols_v != cols_z {
        return Err(Error::SizeMismatch {
            er: rows_v,
            ec: cols_v,
            ar: rows_z,
            ac: cols_z,
        });
    }
    if values.transform() != zones.transform() {
        return Err(Error::GridMismatch("zonal statistics".into()));
    }

    let mut zone_values: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    for (&zone, &val) in zones.data().iter().zip(values.data().iter()) {
        if zone == 0 || zones.is_nodata(zone) || values.is_nodata(val) {
            continue;
        }
        zone_values.entry(zone).or_default().push(val);
    }

    let results = zone_values
        .into_iter()
        .map(|(zone, mut vals)| {
            let count = vals.len();
            let sum: f64 = vals.iter().sum();
            let mean = sum / count as f64;
            let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;

            vals.sort_by(f64::total_cmp);
            let median = if count % 2 == 0 {
                (vals[count / 2 - 1] + vals[count / 2]) / 2.0
            } else {
                vals[count / 2]
            };

            (
                zone,
                ZonalResult {
                    zone,
                    count,
                    sum,
                    mean,
                    std_dev: var.sqrt(),
                    min: vals[0],
                    max: vals[count - 1],
                    median,
                },
            )
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use havvind_core::GeoTransform;

    fn grid<T: havvind_core::RasterElement>(data: Vec<T>) -> Raster<T> {
        let mut r = Raster::from_vec(data, 2, 3).unwrap();
        r.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_per_class() {
        let values = grid(vec![100.0, 200.0, 300.0, 400.0, f64::NAN, 600.0]);
        let mut zones = grid(vec![1u8, 1, 2, 2, 2, 0]);
        zones.set_nodata(Some(0));

        let stats = zonal_statistics(&values, &zones).unwrap();
        assert_eq!(stats.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        let z1 = &stats[&1];
        assert_eq!(z1.count, 2);
        assert_relative_eq!(z1.mean, 150.0);
        assert_relative_eq!(z1.std_dev, 50.0);
        assert_relative_eq!(z1.median, 150.0);

        let z2 = &stats[&2];
        assert_eq!(z2.count, 2);
        assert_relative_eq!(z2.min, 300.0);
        assert_relative_eq!(z2.max, 400.0);
    }

    #[test]
    fn test_all_undefined_is_empty() {
        let values = grid(vec![f64::NAN; 6]);
        let zones = grid(vec![1u8; 6]);
        assert!(zonal_statistics(&values, &zones).unwrap().is_empty());
    }

    #[test]
    fn test_shape_and_grid_mismatch() {
        let values: Raster<f64> = Raster::new(5, 5);
        let zones: Raster<u8> = Raster::new(3, 3);
        assert!(matches!(zonal_statistics(&values, &zones), Err(Error::SizeMismatch { .. })));

        let values = grid(vec![1.0; 6]);
        let mut zones = grid(vec![1u8; 6]);
        zones.set_transform(GeoTransform::new(10.0, 2.0, 1.0, -1.0));
        assert!(matches!(zonal_statistics(&values, &zones), Err(Error::GridMismatch(_))));
    }
}
