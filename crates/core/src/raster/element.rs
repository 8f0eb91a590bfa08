//! Numeric cell types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// A value that can live in a raster cell.
///
/// A cell is no-data when it equals the raster's no-data value. Float cells
/// holding NaN are no-data whether or not a value is set.
pub trait RasterElement:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    /// Fill value for cells that cannot be represented
    fn default_nodata() -> Self;

    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// `None` when the value does not fit the type
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! raster_element {
    (int: $($t:ty),+) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )+};
    (float: $($t:ty),+) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata == Some(*self)
            }
        }
    )+};
}

raster_element!(int: u8, u16, i16, i32);
raster_element!(float: f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f32::NAN.is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_explicit_nodata_matches_exactly() {
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
        assert!(!(-9998.5f64).is_nodata(Some(-9999.0)));
        assert!(0u8.is_nodata(Some(0)));
        assert!(!3u8.is_nodata(Some(0)));
        assert!(!0u8.is_nodata(None));
    }

    #[test]
    fn test_out_of_range_conversion() {
        assert_eq!(u8::from_f64(300.0), None);
        assert_eq!(u8::from_f64(4.0), Some(4));
        assert_eq!(i16::default_nodata(), i16::MIN);
    }
}
