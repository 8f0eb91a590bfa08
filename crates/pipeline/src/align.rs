//! Stage 2: bring every layer into the bathymetry CRS

use crate::error::Result;
use crate::ingest::{crs_label, Layers};
use havvind_core::{CoordinateTransform, Error, FeatureCollection, Raster, CRS};
use tracing::{debug, info};

/// Layers sharing one CRS.
///
/// The wind raster keeps its native grid; it is warped onto the zone grid
/// when suitability is scored.
#[derive(Debug, Clone)]
pub struct AlignedLayers {
    /// Depth in metres, positive down; defines the working CRS
    pub bathymetry: Raster<f64>,
    /// Turbine points in the working CRS
    pub turbines: FeatureCollection,
    /// Protected-area polygons in the working CRS
    pub protected_areas: FeatureCollection,
    /// Shipping-lane lines in the working CRS
    pub shipping_lanes: FeatureCollection,
    /// Wind power density on its native grid, reprojected if needed
    pub wind_power: Raster<f64>,
    /// Working CRS, taken from the bathymetry
    pub crs: CRS,
}

/// Transform the vector layers into the bathymetry CRS.
///
/// The bathymetry must carry a CRS. An empty vector layer without one is
/// adopted into the working CRS; a non-empty one is an error.
pub fn align_layers(layers: Layers) -> Result<AlignedLayers> {
    let crs = layers
        .bathymetry
        .crs()
        .cloned()
        .ok_or_else(|| Error::MissingCrs("bathymetry".into()))?;
    info!("working CRS {crs}");

    let turbines = reproject_features(layers.turbines, &crs, "turbines")?;
    let protected_areas = reproject_features(layers.protected_areas, &crs, "protected areas")?;
    let shipping_lanes = reproject_features(layers.shipping_lanes, &crs, "shipping lanes")?;

    // Fail here rather than at stage 6 when the wind CRS cannot be handled
    let wind_crs = layers
        .wind_power
        .crs()
        .ok_or_else(|| Error::MissingCrs("wind power".into()))?;
    CoordinateTransform::new(wind_crs, &crs)?;

    Ok(AlignedLayers {
        bathymetry: layers.bathymetry,
        turbines,
        protected_areas,
        shipping_lanes,
        wind_power: layers.wind_power,
        crs,
    })
}

fn reproject_features(
    features: FeatureCollection,
    target: &CRS,
    name: &str,
) -> Result<FeatureCollection> {
    let Some(source) = features.crs().cloned() else {
        if features.is_empty() {
            debug!("{name}: empty layer adopts {target}");
            return Ok(FeatureCollection::with_crs(Vec::new(), Some(target.clone())));
        }
        return Err(Error::MissingCrs(name.to_string()).into());
    };

    if source.is_equivalent(target) {
        debug!("{name}: already in {target}");
        return Ok(features);
    }

    let transform = CoordinateTransform::new(&source, target)?;
    info!("{name}: {} -> {target}", crs_label(Some(&source)));
    Ok(transform.transform_features(&features, target))
}
