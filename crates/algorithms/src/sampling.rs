//! Point sampling of raster values

use havvind_core::raster::{Raster, RasterElement};
use serde::{Deserialize, Serialize};

/// How a raster value is read at an arbitrary map location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMethod {
    /// Value of the cell containing the point.
    ///
    /// Cells are half-open: a point on an edge shared by two cells takes the
    /// cell with the larger row/column index (right of or below the edge in
    /// a north-up grid).
    #[default]
    Nearest,
    /// Bilinear interpolation between the four surrounding cell centres.
    /// Undefined neighbours are dropped and the weights renormalised.
    Bilinear,
}

/// Sample `raster` at map coordinates `(x, y)`.
///
/// Returns `None` outside the grid or where no defined value is available.
pub fn sample<T: RasterElement>(raster: &Raster<T>, x: f64, y: f64, method: SampleMethod) -> Option<T> {
    let (row, col) = raster.cell_at(x, y)?;
    match method {
        SampleMethod::Nearest => {
            let value = raster.get(row, col).ok()?;
            (!raster.is_nodata(value)).then_some(value)
        }
        SampleMethod::Bilinear => bilinear(raster, x, y),
    }
}

fn bilinear<T: RasterElement>(raster: &Raster<T>, x: f64, y: f64) -> Option<T> {
    let (rows, cols) = raster.shape();
    let (c, r) = raster.geo_to_pixel(x, y);

    // Fractional position relative to cell centres
    let u = c - 0.5;
    let v = r - 0.5;
    let c0 = u.floor();
    let r0 = v.floor();
    let fx = u - c0;
    let fy = v - r0;

    let neighbours = [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (0, 1, fx * (1.0 - fy)),
        (1, 0, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (dr, dc, w) in neighbours {
        if w <= 0.0 {
            continue;
        }
        let rr = r0 as i64 + dr;
        let cc = c0 as i64 + dc;
        if rr < 0 || cc < 0 || rr >= rows as i64 || cc >= cols as i64 {
            continue;
        }
        let Ok(value) = raster.get(rr as usize, cc as usize) else {
            continue;
        };
        if raster.is_nodata(value) {
            continue;
        }
        if let Some(v) = value.to_f64() {
            sum += w * v;
            weight += w;
        }
    }

    if weight > 0.0 {
        T::from_f64(sum / weight)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use havvind_core::GeoTransform;

    /// 3x3 grid of 10 m cells with origin (0, 30); values 1..=9, centre undefined
    fn grid() -> Raster<f64> {
        let mut r = Raster::from_vec(
            vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0, 7.0, 8.0, 9.0],
            3,
            3,
        )
        .unwrap();
        r.set_transform(GeoTransform::new(0.0, 30.0, 10.0, -10.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_nearest_cell_lookup() {
        let r = grid();
        assert_eq!(sample(&r, 5.0, 25.0, SampleMethod::Nearest), Some(1.0));
        assert_eq!(sample(&r, 29.0, 1.0, SampleMethod::Nearest), Some(9.0));
        assert_eq!(sample(&r, 15.0, 15.0, SampleMethod::Nearest), None);
    }

    #[test]
    fn test_nearest_shared_edge_takes_higher_index() {
        let r = grid();
        // x = 10 is the edge between columns 0 and 1
        assert_eq!(sample(&r, 10.0, 25.0, SampleMethod::Nearest), Some(2.0));
        // y = 20 is the edge between rows 0 and 1
        assert_eq!(sample(&r, 5.0, 20.0, SampleMethod::Nearest), Some(4.0));
        // Origin corner is inside, far corner is not
        assert_eq!(sample(&r, 0.0, 30.0, SampleMethod::Nearest), Some(1.0));
        assert_eq!(sample(&r, 30.0, 0.0, SampleMethod::Nearest), None);
    }

    #[test]
    fn test_outside_grid() {
        let r = grid();
        assert_eq!(sample(&r, -1.0, 15.0, SampleMethod::Nearest), None);
        assert_eq!(sample(&r, 15.0, 31.0, SampleMethod::Bilinear), None);
    }

    #[test]
    fn test_bilinear_at_centre_matches_cell() {
        let r = grid();
        let v = sample(&r, 5.0, 25.0, SampleMethod::Bilinear).unwrap();
        assert_relative_eq!(v, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bilinear_between_centres() {
        let r = grid();
        // Halfway between centres of cells (0,1)=2 and (0,2)=3
        let v = sample(&r, 20.0, 25.0, SampleMethod::Bilinear).unwrap();
        assert_relative_eq!(v, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_bilinear_skips_undefined_neighbours() {
        let r = grid();
        // Between (0,0)=1, (0,1)=2, (1,0)=4 and the undefined centre cell
        let v = sample(&r, 10.0, 20.0, SampleMethod::Bilinear).unwrap();
        assert_relative_eq!(v, 7.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integer_raster() {
        let mut r: Raster<u8> = Raster::from_vec(vec![1, 2, 0, 4], 2, 2).unwrap();
        r.set_nodata(Some(0));
        r.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        assert_eq!(sample(&r, 1.5, 1.5, SampleMethod::Nearest), Some(2));
        assert_eq!(sample(&r, 0.5, 0.5, SampleMethod::Nearest), None);
    }
}
