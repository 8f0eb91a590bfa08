//! Stage 1: read every input layer

use crate::config::{DepthSign, InputPaths};
use crate::error::Result;
use havvind_core::io::{read_geotiff, read_shapefile, VectorPackage};
use havvind_core::{FeatureCollection, Raster, CRS};
use tracing::{debug, info, warn};

/// The five input layers in their native CRS
#[derive(Debug, Clone)]
pub struct Layers {
    /// Depth in metres, positive below the surface
    pub bathymetry: Raster<f64>,
    /// The selected layer of the turbine package
    pub turbines: FeatureCollection,
    /// Protected-area polygons
    pub protected_areas: FeatureCollection,
    /// Shipping-lane lines
    pub shipping_lanes: FeatureCollection,
    /// Wind power density, W/m²
    pub wind_power: Raster<f64>,
}

/// Read all layers named in `paths`.
///
/// Any unreadable file or missing turbine layer aborts the run.
pub fn load_layers(paths: &InputPaths, sign: DepthSign) -> Result<Layers> {
    let overrides = &paths.crs_overrides;

    let mut bathymetry = read_geotiff::<f64, _>(&paths.bathymetry, None)?;
    override_raster_crs(&mut bathymetry, overrides.bathymetry);
    let bathymetry = normalize_depth(bathymetry, sign);
    info!(
        "bathymetry: {}x{} cells, CRS {}",
        bathymetry.rows(),
        bathymetry.cols(),
        crs_label(bathymetry.crs())
    );

    let package = VectorPackage::open(&paths.turbines)?;
    debug!("turbine package layers: {:?}", package.layer_names());
    let mut turbines = package.read_layer(&paths.turbine_layer)?;
    override_features_crs(&mut turbines, overrides.turbines);
    info!("turbines: {} features from layer '{}'", turbines.len(), paths.turbine_layer);

    let mut protected_areas = read_shapefile(&paths.protected_areas)?;
    override_features_crs(&mut protected_areas, overrides.protected_areas);
    info!("protected areas: {} features", protected_areas.len());

    let mut shipping_lanes = read_shapefile(&paths.shipping_lanes)?;
    override_features_crs(&mut shipping_lanes, overrides.shipping_lanes);
    info!("shipping lanes: {} features", shipping_lanes.len());

    let mut wind_power = read_geotiff::<f64, _>(&paths.wind_power, None)?;
    override_raster_crs(&mut wind_power, overrides.wind_power);
    info!(
        "wind power: {}x{} cells, CRS {}",
        wind_power.rows(),
        wind_power.cols(),
        crs_label(wind_power.crs())
    );

    for (name, empty) in [
        ("turbines", turbines.is_empty()),
        ("protected areas", protected_areas.is_empty()),
        ("shipping lanes", shipping_lanes.is_empty()),
    ] {
        if empty {
            warn!("{name} layer is empty");
        }
    }

    Ok(Layers {
        bathymetry,
        turbines,
        protected_areas,
        shipping_lanes,
        wind_power,
    })
}

/// Bring a bathymetry raster to the positive-down convention
pub fn normalize_depth(raster: Raster<f64>, sign: DepthSign) -> Raster<f64> {
    match sign {
        DepthSign::PositiveDown => raster,
        DepthSign::NegativeDown => {
            let nodata = raster.nodata();
            let data = raster
                .data()
                .mapv(|v| if v.is_nan() || nodata == Some(v) { v } else { -v });
            let mut output = raster;
            *output.data_mut() = data;
            output
        }
    }
}

fn override_raster_crs(raster: &mut Raster<f64>, epsg: Option<u32>) {
    if let Some(code) = epsg {
        debug!("CRS override EPSG:{code} replaces {}", crs_label(raster.crs()));
        raster.set_crs(Some(CRS::from_epsg(code)));
    }
}

fn override_features_crs(features: &mut FeatureCollection, epsg: Option<u32>) {
    if let Some(code) = epsg {
        debug!("CRS override EPSG:{code} replaces {}", crs_label(features.crs()));
        features.crs = Some(CRS::from_epsg(code));
    }
}

pub(crate) fn crs_label(crs: Option<&CRS>) -> String {
    crs.map_or_else(|| "undefined".to_string(), CRS::identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use havvind_core::GeoTransform;
    use ndarray::array;

    #[test]
    fn test_negative_down_negates_defined_cells() {
        let mut raster = Raster::from_array(array![[-12.0, f64::NAN], [-9999.0, 3.0]]);
        raster.set_nodata(Some(-9999.0));
        raster.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));

        let depth = normalize_depth(raster, DepthSign::NegativeDown);
        assert_eq!(depth.get(0, 0).unwrap(), 12.0);
        assert!(depth.get(0, 1).unwrap().is_nan());
        assert_eq!(depth.get(1, 0).unwrap(), -9999.0);
        assert_eq!(depth.get(1, 1).unwrap(), -3.0);
    }

    #[test]
    fn test_positive_down_is_untouched() {
        let raster = Raster::from_array(array![[15.0, 25.0]]);
        let depth = normalize_depth(raster.clone(), DepthSign::PositiveDown);
        assert_eq!(depth.data(), raster.data());
    }

    #[test]
    fn test_missing_bathymetry_is_data_access() {
        let paths = InputPaths {
            bathymetry: "/nonexistent/bathymetry.tif".into(),
            ..InputPaths::default()
        };
        let err = load_layers(&paths, DepthSign::PositiveDown).unwrap_err();
        assert!(err.is_data_access());
    }

    #[test]
    fn test_crs_override() {
        let mut features = FeatureCollection::new();
        override_features_crs(&mut features, Some(25832));
        assert_eq!(features.crs().and_then(CRS::epsg), Some(25832));

        let mut raster: Raster<f64> = Raster::new(2, 2);
        override_raster_crs(&mut raster, None);
        assert!(raster.crs().is_none());
    }
}
