//! Shapefile layers and multi-layer vector packages

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Attributes, Feature, FeatureCollection};
use geo_types::Geometry;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read every shape and its dBASE record from a shapefile.
///
/// The CRS comes from the sibling `.prj` file when present. Null shapes are
/// kept as features without geometry.
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path).map_err(|e| Error::data_access(path, e))?;

    let mut features = Vec::new();
    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(|e| Error::data_access(path, e))?;

        let geometry = match Geometry::<f64>::try_from(shape) {
            Ok(g) => Some(g),
            Err(e) => {
                debug!("{}: shape {} has no geometry ({})", path.display(), index, e);
                None
            }
        };

        let attributes: Attributes = record
            .into_iter()
            .map(|(name, value)| (name, attribute_from_dbase(value)))
            .collect();

        features.push(Feature {
            geometry,
            attributes,
            fid: Some(index),
        });
    }

    let crs = read_prj(path)?;
    if crs.is_none() {
        warn!("{} has no .prj; its CRS must be configured", path.display());
    }

    Ok(FeatureCollection::with_crs(features, crs))
}

fn read_prj(shp: &Path) -> Result<Option<CRS>> {
    let prj = shp.with_extension("prj");
    if !prj.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&prj).map_err(|e| Error::data_access(&prj, e))?;
    Ok(Some(CRS::from_prj(&text)))
}

fn attribute_from_dbase(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::String(s.trim_end().to_string()),
        FieldValue::Memo(s) => AttributeValue::String(s),
        FieldValue::Numeric(Some(v)) => AttributeValue::Float(v),
        FieldValue::Float(Some(v)) => AttributeValue::Float(f64::from(v)),
        FieldValue::Double(v) | FieldValue::Currency(v) => AttributeValue::Float(v),
        FieldValue::Integer(v) => AttributeValue::Int(i64::from(v)),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        FieldValue::Date(Some(d)) => {
            AttributeValue::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        _ => AttributeValue::Null,
    }
}

/// Where a package's layers live
#[derive(Debug, Clone)]
enum Layers {
    /// One `.shp` file per layer, keyed by file stem
    Shapefiles(BTreeMap<String, PathBuf>),
    /// Sorted layer names of a single-file container
    #[cfg(feature = "gdal")]
    Container(Vec<String>),
}

/// A vector data package holding several named layers.
///
/// A directory is a package whose layers are the `*.shp` files inside it,
/// named by file stem. A single `.shp` file is a one-layer package. With the
/// `gdal` feature, any other file (typically a GeoPackage) is opened as an
/// OGR container and its layers are read through GDAL.
#[derive(Debug, Clone)]
pub struct VectorPackage {
    root: PathBuf,
    layers: Layers,
}

impl VectorPackage {
    /// Open a package and list its layers
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.exists() {
            return Err(Error::data_access(&root, "no such file or directory"));
        }

        let layers = if root.is_dir() {
            let mut layers = BTreeMap::new();
            let entries = std::fs::read_dir(&root).map_err(|e| Error::data_access(&root, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::data_access(&root, e))?;
                let file = entry.path();
                if is_shp(&file) {
                    if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                        layers.insert(stem.to_string(), file.clone());
                    }
                }
            }
            Layers::Shapefiles(layers)
        } else if is_shp(&root) {
            let mut layers = BTreeMap::new();
            if let Some(stem) = root.file_stem().and_then(|s| s.to_str()) {
                layers.insert(stem.to_string(), root.clone());
            }
            Layers::Shapefiles(layers)
        } else {
            container_layers(&root)?
        };

        let package = Self { root, layers };
        debug!("package {}: {} layer(s)", package.root.display(), package.layer_names().len());
        Ok(package)
    }

    /// Package location
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Layer names in sorted order
    pub fn layer_names(&self) -> Vec<&str> {
        match &self.layers {
            Layers::Shapefiles(files) => files.keys().map(String::as_str).collect(),
            #[cfg(feature = "gdal")]
            Layers::Container(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Read the layer called `name`
    pub fn read_layer(&self, name: &str) -> Result<FeatureCollection> {
        let not_found = || Error::LayerNotFound {
            layer: name.to_string(),
            available: self.layer_names().into_iter().map(str::to_string).collect(),
        };
        match &self.layers {
            Layers::Shapefiles(files) => read_shapefile(files.get(name).ok_or_else(not_found)?),
            #[cfg(feature = "gdal")]
            Layers::Container(names) => {
                if !names.iter().any(|n| n == name) {
                    return Err(not_found());
                }
                super::gpkg::read_layer(&self.root, name)
            }
        }
    }
}

#[cfg(feature = "gdal")]
fn container_layers(path: &Path) -> Result<Layers> {
    super::gpkg::layer_names(path).map(Layers::Container)
}

#[cfg(not(feature = "gdal"))]
fn container_layers(path: &Path) -> Result<Layers> {
    Err(Error::data_access(
        path,
        "not a shapefile or a directory of shapefiles (containers need the `gdal` feature)",
    ))
}

fn is_shp(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("shp"))
}
