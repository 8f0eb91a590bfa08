//! Features read from vector layers

use crate::crs::CRS;
use geo_types::{Geometry, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute-table value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric value, `None` for text, booleans and nulls
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// Attribute table row, ordered by field name
pub type Attributes = BTreeMap<String, AttributeValue>;

/// One record of a vector layer.
///
/// `geometry` is `None` for null shapes. `fid` is the record's position in
/// the source layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Shape in the collection's CRS
    pub geometry: Option<Geometry<f64>>,
    /// Attribute table row
    pub attributes: Attributes,
    /// Position in the source layer, `None` for features built in memory
    pub fid: Option<usize>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            attributes: Attributes::new(),
            fid: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Location of a point feature; a one-point multipoint counts
    pub fn point(&self) -> Option<Point<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Point(p) => Some(*p),
            Geometry::MultiPoint(mp) => match mp.0.as_slice() {
                [only] => Some(*only),
                _ => None,
            },
            _ => None,
        }
    }

    /// Same record with its geometry replaced by `f(geometry)`
    pub fn map_geometry<F>(&self, f: F) -> Self
    where
        F: FnOnce(&Geometry<f64>) -> Geometry<f64>,
    {
        Self {
            geometry: self.geometry.as_ref().map(f),
            attributes: self.attributes.clone(),
            fid: self.fid,
        }
    }
}

/// Features of one layer and the CRS their coordinates are in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// `None` when the source carried no CRS
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(features: Vec<Feature>, crs: Option<CRS>) -> Self {
        Self { features, crs }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Every point, with multipoints split into their members
    pub fn points(&self) -> Vec<Point<f64>> {
        self.collect_parts(|g| match g {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(mp) => mp.0.clone(),
            _ => vec![],
        })
    }

    /// Every polygon, with multipolygons split and rectangles converted
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        self.collect_parts(|g| match g {
            Geometry::Polygon(p) => vec![p.clone()],
            Geometry::MultiPolygon(mp) => mp.0.clone(),
            Geometry::Rect(r) => vec![r.to_polygon()],
            _ => vec![],
        })
    }

    /// Every line, with multilines split and bare segments converted
    pub fn lines(&self) -> Vec<LineString<f64>> {
        self.collect_parts(|g| match g {
            Geometry::LineString(ls) => vec![ls.clone()],
            Geometry::MultiLineString(mls) => mls.0.clone(),
            Geometry::Line(l) => vec![LineString::from(vec![l.start, l.end])],
            _ => vec![],
        })
    }

    fn collect_parts<T, F>(&self, parts: F) -> Vec<T>
    where
        F: Fn(&Geometry<f64>) -> Vec<T>,
    {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(parts)
            .collect()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
