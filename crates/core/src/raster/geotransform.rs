//! Affine placement of a grid in map coordinates

use serde::{Deserialize, Serialize};

/// GDAL-style six-coefficient affine transform.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `(col, row)` are fractional pixel coordinates with `(0, 0)` at the
/// upper-left corner of the grid. A north-up grid has no rotation and a
/// negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X of the upper-left corner
    pub origin_x: f64,
    /// Y of the upper-left corner
    pub origin_y: f64,
    /// Cell size along x
    pub pixel_width: f64,
    /// Cell size along y, negative for north-up grids
    pub pixel_height: f64,
    /// X shift per row
    pub row_rotation: f64,
    /// Y shift per column
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Unrotated transform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// From coefficients in GDAL order:
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(c: [f64; 6]) -> Self {
        let [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height] = c;
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation,
            col_rotation,
        }
    }

    /// Map coordinates of fractional pixel coordinates
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Centre of cell `(col, row)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Upper-left corner of cell `(col, row)`
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Fractional `(col, row)` of a map point; NaN for a degenerate transform
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }
        let (dx, dy) = (x - self.origin_x, y - self.origin_y);
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (self.pixel_width * dy - self.col_rotation * dx) / det,
        )
    }

    /// `(row, col)` of the cell containing a map point in a `rows` x `cols` grid.
    ///
    /// Cells are half-open, so a point on an edge shared by two cells belongs
    /// to the one with the larger index.
    pub fn cell_containing(&self, x: f64, y: f64, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (c, r) = (col.floor() as usize, row.floor() as usize);
        (r < rows && c < cols).then_some((r, c))
    }

    /// Cell corners, clockwise from the upper left
    pub fn cell_corners(&self, col: usize, row: usize) -> [(f64, f64); 4] {
        [
            self.pixel_to_geo_corner(col, row),
            self.pixel_to_geo_corner(col + 1, row),
            self.pixel_to_geo_corner(col + 1, row + 1),
            self.pixel_to_geo_corner(col, row + 1),
        ]
    }

    /// Mean of the absolute cell width and height
    pub fn cell_size(&self) -> f64 {
        (self.pixel_width.abs() + self.pixel_height.abs()) / 2.0
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10 && self.col_rotation.abs() < 1e-10 && self.pixel_height < 0.0
    }

    /// `(min_x, min_y, max_x, max_y)` of a `cols` x `rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(cols, 0),
            self.pixel_to_geo_corner(0, rows),
            self.pixel_to_geo_corner(cols, rows),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)),
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centre_round_trip() {
        let gt = GeoTransform::new(600_000.0, 6_250_000.0, 250.0, -250.0);
        let (x, y) = gt.pixel_to_geo(7, 3);
        assert_eq!((x, y), (601_875.0, 6_249_125.0));
        let (col, row) = gt.geo_to_pixel(x, y);
        assert_relative_eq!(col, 7.5, epsilon = 1e-10);
        assert_relative_eq!(row, 3.5, epsilon = 1e-10);
    }

    #[test]
    fn test_rotated_round_trip() {
        let gt = GeoTransform::from_gdal([1000.0, 8.0, 6.0, 2000.0, 6.0, -8.0]);
        let (x, y) = gt.apply(3.25, 9.75);
        let (col, row) = gt.geo_to_pixel(x, y);
        assert_relative_eq!(col, 3.25, epsilon = 1e-9);
        assert_relative_eq!(row, 9.75, epsilon = 1e-9);
        assert!(!gt.is_north_up());
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 2.0, -1.0);
        assert_eq!(gt.bounds(50, 100), (0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_cell_containing_edges() {
        let gt = GeoTransform::new(0.0, 100.0, 10.0, -10.0);

        assert_eq!(gt.cell_containing(5.0, 95.0, 10, 10), Some((0, 0)));
        // x = 10 belongs to the next column, y = 90 to the next row
        assert_eq!(gt.cell_containing(10.0, 95.0, 10, 10), Some((0, 1)));
        assert_eq!(gt.cell_containing(5.0, 90.0, 10, 10), Some((1, 0)));
        // Upper-left corner inside, far edges outside
        assert_eq!(gt.cell_containing(0.0, 100.0, 10, 10), Some((0, 0)));
        assert_eq!(gt.cell_containing(100.0, 50.0, 10, 10), None);
        assert_eq!(gt.cell_containing(50.0, 0.0, 10, 10), None);
        assert_eq!(gt.cell_containing(-0.1, 50.0, 10, 10), None);
        assert_eq!(gt.cell_containing(f64::NAN, 50.0, 10, 10), None);
    }

    #[test]
    fn test_cell_corners() {
        let corners = GeoTransform::new(0.0, 100.0, 10.0, -10.0).cell_corners(1, 2);
        assert_eq!(corners[0], (10.0, 80.0));
        assert_eq!(corners[2], (20.0, 70.0));
    }

    #[test]
    fn test_degenerate_transform() {
        let (col, row) = GeoTransform::new(0.0, 0.0, 0.0, -1.0).geo_to_pixel(1.0, 1.0);
        assert!(col.is_nan() && row.is_nan());
    }
}
