//! Buffer operations
//!
//! Points become regular polygons that circumscribe the true disc, so a
//! buffer never covers less than the requested distance. Lines are buffered
//! as the union of one capsule per segment.

use super::union::union_all;
use geo::{ConvexHull, Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use std::f64::consts::PI;

/// Parameters for buffer operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferParams {
    /// Buffer distance in CRS units, must be positive
    pub distance: f64,
    /// Number of segments approximating a full circle (minimum 8)
    pub segments: usize,
}

impl BufferParams {
    pub fn new(distance: f64, segments: usize) -> Self {
        Self { distance, segments }
    }
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            segments: 64,
        }
    }
}

/// Vertices of a regular polygon circumscribing the circle of radius `r`
fn circle_vertices(center: Coord<f64>, params: &BufferParams) -> Vec<Coord<f64>> {
    let n = params.segments.max(8);
    let r = params.distance.abs() / (PI / n as f64).cos();
    (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            Coord {
                x: center.x + r * angle.cos(),
                y: center.y + r * angle.sin(),
            }
        })
        .collect()
}

/// Disc-shaped buffer around a point.
///
/// The polygon's edges are tangent to the circle of radius `distance`.
pub fn buffer_point(point: &Point<f64>, params: &BufferParams) -> Polygon<f64> {
    let mut ring = circle_vertices(point.0, params);
    // Close the ring
    ring.push(ring[0]);
    Polygon::new(LineString::from(ring), vec![])
}

/// Capsule covering every point within `distance` of the segment `a`-`b`
fn segment_capsule(a: Coord<f64>, b: Coord<f64>, params: &BufferParams) -> Polygon<f64> {
    if a == b {
        return buffer_point(&Point(a), params);
    }
    let mut vertices = circle_vertices(a, params);
    vertices.extend(circle_vertices(b, params));
    MultiPoint::from(vertices.into_iter().map(Point).collect::<Vec<_>>()).convex_hull()
}

/// Buffer around a line string: the union of its segment capsules.
pub fn buffer_line(line: &LineString<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    match line.0.as_slice() {
        [] => MultiPolygon::new(vec![]),
        [only] => MultiPolygon::new(vec![buffer_point(&Point(*only), params)]),
        coords => union_all(
            coords
                .windows(2)
                .map(|pair| segment_capsule(pair[0], pair[1], params)),
        ),
    }
}

/// Buffer any geometry.
///
/// Polygons grow outward by buffering their rings and adding the result to
/// the original shape. Collections are buffered member by member and merged.
pub fn buffer_geometry(geometry: &Geometry<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Point(p) => MultiPolygon::new(vec![buffer_point(p, params)]),
        Geometry::MultiPoint(mp) => union_all(mp.iter().map(|p| buffer_point(p, params))),
        Geometry::Line(l) => MultiPolygon::new(vec![segment_capsule(l.start, l.end, params)]),
        Geometry::LineString(ls) => buffer_line(ls, params),
        Geometry::MultiLineString(mls) => {
            union_all(mls.iter().flat_map(|ls| buffer_line(ls, params).0))
        }
        Geometry::Polygon(p) => grow_polygon(p, params),
        Geometry::MultiPolygon(mp) => union_all(mp.iter().flat_map(|p| grow_polygon(p, params).0)),
        Geometry::Rect(r) => grow_polygon(&r.to_polygon(), params),
        Geometry::Triangle(t) => grow_polygon(&t.to_polygon(), params),
        Geometry::GeometryCollection(gc) => {
            union_all(gc.iter().flat_map(|g| buffer_geometry(g, params).0))
        }
    }
}

fn grow_polygon(polygon: &Polygon<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    let outline = rings.flat_map(|ring| buffer_line(ring, params).0);
    union_all(std::iter::once(polygon.clone()).chain(outline))
}
