//! Stage 3: keep turbines that stand over defined bathymetry

use crate::error::Result;
use geo_types::Point;
use havvind_algorithms::sampling::{sample, SampleMethod};
use havvind_algorithms::statistics::{summarize, Summary};
use havvind_core::{ensure_same_crs, AttributeValue, FeatureCollection, Raster};
use tracing::{info, warn};

/// Attribute holding the sampled depth in metres
pub const DEPTH_ATTRIBUTE: &str = "depth";

/// Turbines split by whether the bathymetry is defined beneath them.
///
/// Every feature carries a [`DEPTH_ATTRIBUTE`]: `Float` offshore, `Null` onshore.
#[derive(Debug, Clone, Default)]
pub struct OffshoreSplit {
    /// Turbines over defined bathymetry
    pub offshore: FeatureCollection,
    /// Every other turbine, with a `Null` depth
    pub onshore: FeatureCollection,
}

impl OffshoreSplit {
    /// Depth statistics of the offshore turbines
    pub fn depth_summary(&self) -> Summary {
        summarize(
            self.offshore
                .iter()
                .filter_map(|f| f.attribute(DEPTH_ATTRIBUTE))
                .filter_map(AttributeValue::as_f64),
        )
    }

    pub fn offshore_points(&self) -> Vec<Point<f64>> {
        self.offshore.points()
    }

    pub fn total(&self) -> usize {
        self.offshore.len() + self.onshore.len()
    }
}

/// Sample `bathymetry` under each turbine and split the set.
///
/// A feature without a point geometry, outside the grid, or over an
/// undefined cell is onshore.
pub fn filter_offshore(
    turbines: &FeatureCollection,
    bathymetry: &Raster<f64>,
    method: SampleMethod,
) -> Result<OffshoreSplit> {
    ensure_same_crs(turbines.crs(), bathymetry.crs(), "offshore filter")?;

    let crs = turbines.crs().cloned();
    let mut split = OffshoreSplit {
        offshore: FeatureCollection::with_crs(Vec::new(), crs.clone()),
        onshore: FeatureCollection::with_crs(Vec::new(), crs),
    };

    for feature in turbines.iter() {
        let depth = feature
            .point()
            .and_then(|p| sample(bathymetry, p.x(), p.y(), method));
        match depth {
            Some(d) => split
                .offshore
                .push(feature.clone().with_attribute(DEPTH_ATTRIBUTE, AttributeValue::Float(d))),
            None => split
                .onshore
                .push(feature.clone().with_attribute(DEPTH_ATTRIBUTE, AttributeValue::Null)),
        }
    }

    info!(
        "offshore filter: {} of {} turbines offshore",
        split.offshore.len(),
        turbines.len()
    );
    if split.offshore.is_empty() {
        warn!("no offshore turbines; wake exclusion will be empty");
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, Geometry};
    use havvind_core::{Feature, GeoTransform, CRS};
    use ndarray::array;

    fn bathymetry() -> Raster<f64> {
        let mut r = Raster::from_array(array![[20.0, f64::NAN], [35.0, 12.0]]);
        r.set_transform(GeoTransform::new(0.0, 200.0, 100.0, -100.0));
        r.set_crs(Some(CRS::from_epsg(25832)));
        r
    }

    fn turbines(coords: &[(f64, f64)]) -> FeatureCollection {
        let features = coords
            .iter()
            .map(|&(x, y)| Feature::new(Geometry::Point(point!(x: x, y: y))))
            .collect();
        FeatureCollection::with_crs(features, Some(CRS::from_epsg(25832)))
    }

    #[test]
    fn test_defined_depth_is_offshore() {
        let split = filter_offshore(&turbines(&[(50.0, 150.0), (150.0, 150.0)]), &bathymetry(), SampleMethod::Nearest)
            .unwrap();
        assert_eq!(split.offshore.len(), 1);
        assert_eq!(split.onshore.len(), 1);
        assert_eq!(
            split.offshore.features[0].attribute(DEPTH_ATTRIBUTE),
            Some(&AttributeValue::Float(20.0))
        );
        assert_eq!(split.onshore.features[0].attribute(DEPTH_ATTRIBUTE), Some(&AttributeValue::Null));
    }

    #[test]
    fn test_split_matches_defined_cells() {
        let raster = bathymetry();
        let points = [(10.0, 190.0), (190.0, 10.0), (120.0, 180.0), (-5.0, 50.0), (100.0, 100.0)];
        let split = filter_offshore(&turbines(&points), &raster, SampleMethod::Nearest).unwrap();
        for p in split.offshore_points() {
            assert!(sample(&raster, p.x(), p.y(), SampleMethod::Nearest).is_some());
        }
        for p in split.onshore.points() {
            assert!(sample(&raster, p.x(), p.y(), SampleMethod::Nearest).is_none());
        }
        assert_eq!(split.total(), points.len());
    }

    #[test]
    fn test_boundary_point_uses_lower_right_cell() {
        // (100, 100) is the shared corner; it belongs to row 1, col 1 (depth 12)
        let split = filter_offshore(&turbines(&[(100.0, 100.0)]), &bathymetry(), SampleMethod::Nearest).unwrap();
        assert_eq!(split.depth_summary().min, Some(12.0));
    }

    #[test]
    fn test_depth_summary() {
        let split = filter_offshore(
            &turbines(&[(50.0, 150.0), (50.0, 50.0), (150.0, 50.0)]),
            &bathymetry(),
            SampleMethod::Nearest,
        )
        .unwrap();
        let summary = split.depth_summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, Some(12.0));
        assert_eq!(summary.max, Some(35.0));
    }

    #[test]
    fn test_empty_turbines_give_empty_summary() {
        let split = filter_offshore(&turbines(&[]), &bathymetry(), SampleMethod::Nearest).unwrap();
        let summary = split.depth_summary();
        assert!(summary.is_empty());
        assert_eq!(summary.mean, None);
    }

    #[test]
    fn test_crs_mismatch_fails() {
        let mut points = turbines(&[(50.0, 150.0)]);
        points.crs = Some(CRS::wgs84());
        let err = filter_offshore(&points, &bathymetry(), SampleMethod::Nearest).unwrap_err();
        assert!(err.is_configuration());
    }
}
