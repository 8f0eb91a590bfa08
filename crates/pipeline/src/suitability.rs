//! Stage 6: wind power over the remaining zones

use crate::error::Result;
use havvind_algorithms::classify::UNCLASSIFIED;
use havvind_algorithms::resample::{warp, Resampling};
use havvind_algorithms::statistics::{summarize, zonal_statistics, Summary, ZonalResult};
use havvind_core::{ensure_same_crs, Raster};
use ndarray::Zip;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Suitability rasters on the zone grid
#[derive(Debug, Clone)]
pub struct Suitability {
    /// Wind power warped onto the zone grid, NaN where the source has no coverage
    pub wind_aligned: Raster<f64>,
    /// Aligned wind power where a zone remains, NaN elsewhere
    pub suitability: Raster<f64>,
    /// Statistics of the defined suitability cells
    pub summary: Summary,
    /// Wind statistics per remaining zone
    pub per_zone: BTreeMap<u8, ZonalResult>,
    /// Zone cells the wind raster does not cover
    pub uncovered_cells: usize,
}

/// Warp `wind` onto the grid of `zones` and keep the cells with a zone.
///
/// Missing wind coverage yields NaN cells, not an error.
pub fn score(wind: &Raster<f64>, zones: &Raster<u8>, method: Resampling) -> Result<Suitability> {
    let wind_aligned = warp(wind, zones, method)?;
    ensure_same_crs(wind_aligned.crs(), zones.crs(), "suitability")?;

    let mut data = wind_aligned.data().clone();
    let mut uncovered_cells = 0usize;
    Zip::from(&mut data).and(zones.data()).for_each(|value, &zone| {
        if zone == UNCLASSIFIED || zones.is_nodata(zone) {
            *value = f64::NAN;
        } else if value.is_nan() {
            uncovered_cells += 1;
        }
    });
    let suitability = wind_aligned.with_data(data)?;

    let summary = summarize(suitability.data().iter().copied());
    let per_zone = zonal_statistics(&suitability, zones)?;

    info!(
        "suitability: {} cells, wind {:?}..{:?} W/m²",
        summary.count, summary.min, summary.max
    );
    if uncovered_cells > 0 {
        warn!("{uncovered_cells} zone cells lie outside the wind raster");
    }
    if summary.is_empty() {
        warn!("no suitable cells remain");
    }

    Ok(Suitability {
        wind_aligned,
        suitability,
        summary,
        per_zone,
        uncovered_cells,
    })
}
