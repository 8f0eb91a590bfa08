//! Planar measurements in CRS units

use geo::{Area, MultiPolygon};

/// Area covered by a multipolygon, holes subtracted.
///
/// Parts are assumed not to overlap, as in the output of
/// [`union_all`](super::union_all).
pub fn total_area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area()
}
