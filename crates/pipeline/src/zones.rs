//! Stage 4: depth bands to cost zones

use crate::config::DepthBands;
use crate::error::Result;
use havvind_algorithms::classify::{reclassify, UNCLASSIFIED};
use havvind_core::Raster;
use std::collections::BTreeMap;
use tracing::info;

/// Cell count per zone
pub type ZoneCounts = BTreeMap<u8, usize>;

/// Classify depths into zones.
///
/// Undefined depths and depths outside every band become
/// [`UNCLASSIFIED`], the no-data value of the result.
pub fn classify_depth(bathymetry: &Raster<f64>, bands: &DepthBands) -> Result<Raster<u8>> {
    let zones = reclassify(bathymetry, &bands.to_params())?;
    let counts = zone_counts(&zones, bands);
    info!(
        "depth zones: {} of {} cells classified {:?}",
        counts.values().sum::<usize>(),
        zones.len(),
        counts
    );
    Ok(zones)
}

/// Cells per zone, with an entry for every band even when it is empty
pub fn zone_counts(zones: &Raster<u8>, bands: &DepthBands) -> ZoneCounts {
    let mut counts: ZoneCounts = bands.0.iter().map(|band| (band.class, 0)).collect();
    for &zone in zones.data().iter().filter(|&&z| z != UNCLASSIFIED) {
        *counts.entry(zone).or_insert(0) += 1;
    }
    counts
}
