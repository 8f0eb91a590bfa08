//! Single-file multi-layer containers (GeoPackage and other OGR formats)
//! read through GDAL

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Attributes, Feature, FeatureCollection};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use std::path::Path;
use tracing::debug;

/// Names of the vector layers in a container, sorted
pub(crate) fn layer_names(path: &Path) -> Result<Vec<String>> {
    let dataset = Dataset::open(path).map_err(|e| Error::data_access(path, e))?;
    let mut names: Vec<String> = dataset.layers().map(|layer| layer.name()).collect();
    names.sort();
    Ok(names)
}

/// Read one layer with its attribute table and the layer's CRS
pub(crate) fn read_layer(path: &Path, name: &str) -> Result<FeatureCollection> {
    let dataset = Dataset::open(path).map_err(|e| Error::data_access(path, e))?;
    let mut layer = dataset.layer_by_name(name).map_err(|e| Error::data_access(path, e))?;
    let crs = layer.spatial_ref().and_then(|srs| crs_of(&srs));

    let mut features = Vec::new();
    for (index, feature) in layer.features().enumerate() {
        let geometry = match feature.geometry().map(|g| g.to_geo()) {
            Some(Ok(g)) => Some(g),
            Some(Err(e)) => {
                debug!("{}:{}: feature {} has no usable geometry ({})", path.display(), name, index, e);
                None
            }
            None => None,
        };

        let attributes: Attributes = feature
            .fields()
            .map(|(field, value)| (field, attribute_from_ogr(value)))
            .collect();

        features.push(Feature {
            geometry,
            attributes,
            fid: Some(index),
        });
    }

    debug!("{}:{}: {} feature(s)", path.display(), name, features.len());
    Ok(FeatureCollection::with_crs(features, crs))
}

/// EPSG code when the reference carries one, else its WKT
fn crs_of(srs: &SpatialRef) -> Option<CRS> {
    if let Some(code) = srs.auth_code().ok().and_then(|c| u32::try_from(c).ok()) {
        return Some(CRS::from_epsg(code));
    }
    srs.to_wkt().ok().map(|wkt| CRS::from_prj(&wkt))
}

fn attribute_from_ogr(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::IntegerValue(v)) => AttributeValue::Int(i64::from(v)),
        Some(FieldValue::Integer64Value(v)) => AttributeValue::Int(v),
        Some(FieldValue::RealValue(v)) => AttributeValue::Float(v),
        Some(FieldValue::StringValue(s)) => AttributeValue::String(s),
        // Dates and lists
        Some(other) => other.into_string().map_or(AttributeValue::Null, AttributeValue::String),
    }
}
