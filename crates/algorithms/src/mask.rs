//! Masking raster cells covered by polygons
//!
//! A cell is covered either when its centre lies inside or on the boundary
//! of the geometry (default), or, with `all_touched`, when any part of the
//! cell square overlaps it. Masking only ever turns cells into no-data, so
//! applying a mask twice changes nothing and several masks commute.

use crate::maybe_rayon::*;
use geo::{BoundingRect, Intersects, LineString, MultiPolygon, Point, Polygon, Rect};
use havvind_core::crs::{ensure_same_crs, CRS};
use havvind_core::raster::{GeoTransform, Raster, RasterElement};
use havvind_core::{Error, Result};
use ndarray::{Array2, Zip};

/// Rasterisation rule for masking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskParams {
    /// Cover every cell the geometry touches instead of only cells whose
    /// centre it contains
    pub all_touched: bool,
}

/// Boolean grid, aligned with `template`, that is `true` where the cell is
/// covered by `geometry`.
pub fn exclusion_mask<T: RasterElement>(
    template: &Raster<T>,
    geometry: &MultiPolygon<f64>,
    params: MaskParams,
) -> Result<Array2<bool>> {
    let (rows, cols) = template.shape();
    let gt = *template.transform();

    let polygons: Vec<(&Polygon<f64>, Rect<f64>)> = geometry
        .iter()
        .filter_map(|p| p.bounding_rect().map(|bbox| (p, bbox)))
        .collect();

    if polygons.is_empty() {
        return Ok(Array2::from_elem((rows, cols), false));
    }

    let scanline = gt.is_north_up() && gt.pixel_width > 0.0;

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut covered = vec![false; cols];
            if params.all_touched {
                touched_row(&gt, row, &polygons, &mut covered);
            } else if scanline {
                centre_row_scanline(&gt, row, &polygons, &mut covered);
            } else {
                centre_row_points(&gt, row, &polygons, &mut covered);
            }
            covered
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

/// Set every cell of `raster` covered by `geometry` to no-data.
///
/// The raster must carry a no-data value and share the geometry's CRS.
pub fn mask_out<T: RasterElement>(
    raster: &Raster<T>,
    geometry: &MultiPolygon<f64>,
    geometry_crs: Option<&CRS>,
    params: MaskParams,
) -> Result<Raster<T>> {
    let nodata = raster.nodata().ok_or(Error::NoDataNotSet)?;
    ensure_same_crs(raster.crs(), geometry_crs, "raster masking")?;

    let covered = exclusion_mask(raster, geometry, params)?;
    let mut output = raster.clone();
    Zip::from(output.data_mut())
        .and(&covered)
        .for_each(|value, &hit| {
            if hit {
                *value = nodata;
            }
        });

    Ok(output)
}

/// Centre rule on a north-up grid: even-odd spans along the row's centre line
fn centre_row_scanline(
    gt: &GeoTransform,
    row: usize,
    polygons: &[(&Polygon<f64>, Rect<f64>)],
    covered: &mut [bool],
) {
    let (_, y) = gt.apply(0.5, row as f64 + 0.5);
    let cols = covered.len();
    if cols == 0 {
        return;
    }
    let mut crossings: Vec<f64> = Vec::new();

    for (polygon, bbox) in polygons {
        if y < bbox.min().y || y > bbox.max().y {
            continue;
        }

        crossings.clear();
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for edge in ring.lines() {
                let (a, b) = (edge.start, edge.end);
                if (a.y <= y) != (b.y <= y) {
                    crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // Columns whose centre x satisfies span[0] <= x <= span[1]
            let first = ((span[0] - gt.origin_x) / gt.pixel_width - 0.5).ceil();
            let last = ((span[1] - gt.origin_x) / gt.pixel_width - 0.5).floor();
            if last < 0.0 || first > (cols - 1) as f64 || first > last {
                continue;
            }
            let first = first.max(0.0) as usize;
            let last = (last as usize).min(cols - 1);
            covered[first..=last].iter_mut().for_each(|c| *c = true);
        }
    }

    // Centres lying exactly on a horizontal edge are missed by the crossing
    // count; resolve them with an exact test.
    for (polygon, bbox) in polygons {
        if y != bbox.min().y && y != bbox.max().y {
            let on_edge = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .flat_map(|ring| ring.lines())
                .any(|edge| edge.start.y == y && edge.end.y == y);
            if !on_edge {
                continue;
            }
        }
        for (col, cell) in covered.iter_mut().enumerate() {
            if !*cell {
                let (x, cy) = gt.pixel_to_geo(col, row);
                *cell = polygon.intersects(&Point::new(x, cy));
            }
        }
    }
}

/// Centre rule on rotated grids: exact point-in-polygon per cell
fn centre_row_points(
    gt: &GeoTransform,
    row: usize,
    polygons: &[(&Polygon<f64>, Rect<f64>)],
    covered: &mut [bool],
) {
    for (col, cell) in covered.iter_mut().enumerate() {
        let (x, y) = gt.pixel_to_geo(col, row);
        let centre = Point::new(x, y);
        *cell = polygons
            .iter()
            .any(|(polygon, bbox)| bbox.intersects(&centre) && polygon.intersects(&centre));
    }
}

/// All-touched rule: any overlap between the cell square and the geometry
fn touched_row(
    gt: &GeoTransform,
    row: usize,
    polygons: &[(&Polygon<f64>, Rect<f64>)],
    covered: &mut [bool],
) {
    for (col, cell) in covered.iter_mut().enumerate() {
        let corners = gt.cell_corners(col, row);
        let square = Polygon::new(LineString::from(corners.to_vec()), vec![]);
        let Some(cell_bbox) = square.bounding_rect() else {
            continue;
        };
        *cell = polygons
            .iter()
            .any(|(polygon, bbox)| bbox.intersects(&cell_bbox) && polygon.intersects(&square));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{buffer_point, union_all, BufferParams};

    fn zones() -> Raster<u8> {
        // 10x10 grid of 100 m cells over (0..1000, 0..1000), all class 1
        let mut r: Raster<u8> = Raster::filled(10, 10, 1);
        r.set_transform(GeoTransform::new(0.0, 1000.0, 100.0, -100.0));
        r.set_crs(Some(CRS::from_epsg(25832)));
        r.set_nodata(Some(0));
        r
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new((x0, y0), (x1, y1)).to_polygon()])
    }

    fn crs() -> CRS {
        CRS::from_epsg(25832)
    }

    #[test]
    fn test_centre_rule() {
        let r = zones();
        // Covers centres 50 and 150 in x, 950 in y: cells (0,0) and (0,1)
        let masked = mask_out(&r, &rect(0.0, 920.0, 160.0, 1000.0), Some(&crs()), MaskParams::default())
            .unwrap();
        assert_eq!(masked.get(0, 0).unwrap(), 0);
        assert_eq!(masked.get(0, 1).unwrap(), 0);
        assert_eq!(masked.get(0, 2).unwrap(), 1);
        assert_eq!(masked.get(1, 0).unwrap(), 1);
        assert_eq!(masked.defined_count(), 98);
    }

    #[test]
    fn test_all_touched_rule() {
        let r = zones();
        let params = MaskParams { all_touched: true };
        let masked = mask_out(&r, &rect(0.0, 920.0, 160.0, 1000.0), Some(&crs()), params).unwrap();
        // Cell (0,1) is only partly overlapped
        assert_eq!(masked.get(0, 1).unwrap(), 0);
        assert_eq!(masked.get(0, 2).unwrap(), 1);
        // Small geometry inside a single cell misses its centre but touches it
        let tiny = rect(410.0, 410.0, 420.0, 420.0);
        assert_eq!(mask_out(&r, &tiny, Some(&crs()), MaskParams::default()).unwrap().defined_count(), 100);
        assert_eq!(mask_out(&r, &tiny, Some(&crs()), params).unwrap().defined_count(), 99);
    }

    #[test]
    fn test_polygon_with_hole() {
        let r = zones();
        let outer = Rect::new((0.0, 0.0), (1000.0, 1000.0)).to_polygon();
        let hole = Rect::new((200.0, 200.0), (800.0, 800.0)).to_polygon();
        let donut = MultiPolygon::new(vec![Polygon::new(
            outer.exterior().clone(),
            vec![hole.exterior().clone()],
        )]);
        let masked = mask_out(&r, &donut, Some(&crs()), MaskParams::default()).unwrap();
        // Only the 6x6 block of centres inside the hole survives
        assert_eq!(masked.defined_count(), 36);
        assert_eq!(masked.get(5, 5).unwrap(), 1);
        assert_eq!(masked.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_centres_on_boundary_are_covered() {
        let r = zones();
        // Rectangle whose edges pass exactly through cell centres
        let masked = mask_out(&r, &rect(50.0, 850.0, 250.0, 950.0), Some(&crs()), MaskParams::default())
            .unwrap();
        for row in 0..2 {
            for col in 0..3 {
                assert_eq!(masked.get(row, col).unwrap(), 0, "cell ({row}, {col})");
            }
        }
        assert_eq!(masked.defined_count(), 94);
    }

    #[test]
    fn test_idempotent() {
        let r = zones();
        let disc = MultiPolygon::new(vec![buffer_point(
            &Point::new(430.0, 570.0),
            &BufferParams::new(260.0, 64),
        )]);
        let once = mask_out(&r, &disc, Some(&crs()), MaskParams::default()).unwrap();
        let twice = mask_out(&once, &disc, Some(&crs()), MaskParams::default()).unwrap();
        assert_eq!(once, twice);
        assert!(once.defined_count() < 100);
    }

    #[test]
    fn test_order_independent() {
        let r = zones();
        let a = rect(0.0, 0.0, 420.0, 380.0);
        let b = MultiPolygon::new(vec![buffer_point(&Point::new(500.0, 500.0), &BufferParams::new(300.0, 48))]);
        let c = rect(720.0, 0.0, 1000.0, 1000.0);
        let p = MaskParams::default();

        let apply = |order: [&MultiPolygon<f64>; 3]| {
            order.iter().fold(r.clone(), |acc, g| mask_out(&acc, g, Some(&crs()), p).unwrap())
        };
        let abc = apply([&a, &b, &c]);
        assert_eq!(abc, apply([&c, &b, &a]));
        assert_eq!(abc, apply([&b, &a, &c]));
        assert_eq!(abc, apply([&c, &a, &b]));
    }

    #[test]
    fn test_union_then_mask_equals_sequential_masks() {
        let r = zones();
        let d1 = buffer_point(&Point::new(300.0, 500.0), &BufferParams::new(250.0, 64));
        let d2 = buffer_point(&Point::new(600.0, 500.0), &BufferParams::new(250.0, 64));
        let merged = union_all(vec![d1.clone(), d2.clone()]);
        assert_eq!(merged.0.len(), 1);

        let p = MaskParams::default();
        let via_union = mask_out(&r, &merged, Some(&crs()), p).unwrap();
        let one = mask_out(&r, &MultiPolygon::new(vec![d1]), Some(&crs()), p).unwrap();
        let both = mask_out(&one, &MultiPolygon::new(vec![d2]), Some(&crs()), p).unwrap();
        assert_eq!(via_union, both);
    }

    #[test]
    fn test_requires_nodata_and_matching_crs() {
        let mut r = zones();
        let geom = rect(0.0, 0.0, 100.0, 100.0);
        assert!(matches!(
            mask_out(&r, &geom, Some(&CRS::from_epsg(4326)), MaskParams::default()),
            Err(Error::CrsMismatch { .. })
        ));
        assert!(matches!(
            mask_out(&r, &geom, None, MaskParams::default()),
            Err(Error::MissingCrs(_))
        ));
        r.set_nodata(None);
        assert!(matches!(
            mask_out(&r, &geom, Some(&crs()), MaskParams::default()),
            Err(Error::NoDataNotSet)
        ));
    }

    #[test]
    fn test_empty_geometry_masks_nothing() {
        let r = zones();
        let masked = mask_out(&r, &MultiPolygon::new(vec![]), Some(&crs()), MaskParams::default()).unwrap();
        assert_eq!(masked, r);
    }

    #[test]
    fn test_rotated_grid_uses_point_rule() {
        let mut r = zones();
        let mut gt = *r.transform();
        gt.row_rotation = 1e-3;
        r.set_transform(gt);
        let masked = mask_out(&r, &rect(0.0, 900.0, 100.0, 1000.0), Some(&crs()), MaskParams::default())
            .unwrap();
        assert_eq!(masked.get(0, 0).unwrap(), 0);
        assert_eq!(masked.defined_count(), 99);
    }
}
