//! Polygon union
//!
//! Overlapping polygons are merged with a true boolean union so that shared
//! areas are counted once and no seam remains where two shapes overlap.

use geo::{BooleanOps, MultiPolygon, Polygon};

/// Union of two multipolygons
pub fn union_pair(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() {
        return b.clone();
    }
    if b.0.is_empty() {
        return a.clone();
    }
    a.union(b)
}

/// Union of any number of polygons.
///
/// Polygons are merged pairwise in rounds (cascaded union), which keeps each
/// boolean operation small. Polygons with an empty exterior are ignored.
pub fn union_all<I>(polygons: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = Polygon<f64>>,
{
    let mut parts: Vec<MultiPolygon<f64>> = polygons
        .into_iter()
        .filter(|p| p.exterior().0.len() >= 4)
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();

    while parts.len() > 1 {
        parts = parts
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => union_pair(a, b),
                [a] => a.clone(),
                _ => MultiPolygon::new(vec![]),
            })
            .collect();
    }

    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}
