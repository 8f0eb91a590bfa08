//! Pure-Rust coordinate transforms between the CRSs used for Danish and
//! European marine data.
//!
//! Supported:
//! - EPSG:4326 / EPSG:4258 geographic (x = longitude, y = latitude, degrees)
//! - EPSG:3857 Web Mercator
//! - EPSG:326NN / EPSG:327NN WGS 84 UTM and EPSG:258NN ETRS89 UTM
//! - EPSG:3035 ETRS89-LAEA Europe
//!
//! Projection formulas follow Snyder (1987), USGS Prof. Paper 1395. ETRS89 and
//! WGS 84 are treated as the same datum, which is accurate to well under a
//! metre at raster resolutions used here.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::FeatureCollection;
use geo::MapCoords;
use geo_types::{Coord, Geometry};
use std::f64::consts::FRAC_PI_2;

// ── Ellipsoid constants (GRS80 / WGS84 share the semi-major axis) ───────

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);

// UTM
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// ETRS89-LAEA Europe
const LAEA_LAT0: f64 = 52.0;
const LAEA_LON0: f64 = 10.0;
const LAEA_FALSE_EASTING: f64 = 4_321_000.0;
const LAEA_FALSE_NORTHING: f64 = 3_210_000.0;

/// A map projection, with geographic coordinates as the common pivot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees
    Geographic,
    /// Spherical Web Mercator
    WebMercator,
    /// UTM zone on the WGS84/GRS80 ellipsoid
    TransverseMercator { zone: u32, north: bool },
    /// ETRS89-LAEA Europe (EPSG:3035)
    LambertAzimuthalEqualArea,
}

impl Projection {
    /// Projection for an EPSG code, `None` when unsupported
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 | 4258 => Some(Self::Geographic),
            3857 | 900913 => Some(Self::WebMercator),
            3035 => Some(Self::LambertAzimuthalEqualArea),
            32601..=32660 => Some(Self::TransverseMercator {
                zone: code - 32600,
                north: true,
            }),
            32701..=32760 => Some(Self::TransverseMercator {
                zone: code - 32700,
                north: false,
            }),
            25828..=25838 => Some(Self::TransverseMercator {
                zone: code - 25800,
                north: true,
            }),
            _ => None,
        }
    }

    /// Projection for a CRS
    pub fn from_crs(crs: &CRS) -> Result<Self> {
        crs.epsg()
            .and_then(Self::from_epsg)
            .ok_or_else(|| Error::UnsupportedCrs(crs.identifier()))
    }

    /// Project (lon, lat) in degrees
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            Self::Geographic => (lon, lat),
            Self::WebMercator => mercator_forward(lon, lat),
            Self::TransverseMercator { zone, north } => utm_forward(lon, lat, zone, north),
            Self::LambertAzimuthalEqualArea => laea_forward(lon, lat),
        }
    }

    /// Unproject (x, y) to (lon, lat) in degrees
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Self::Geographic => (x, y),
            Self::WebMercator => mercator_inverse(x, y),
            Self::TransverseMercator { zone, north } => utm_inverse(x, y, zone, north),
            Self::LambertAzimuthalEqualArea => laea_inverse(x, y),
        }
    }
}

/// Transform between two supported CRSs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    from: Projection,
    to: Projection,
}

impl CoordinateTransform {
    /// Build a transform from `from` to `to`
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        Ok(Self {
            from: Projection::from_crs(from)?,
            to: Projection::from_crs(to)?,
        })
    }

    /// Whether source and target projections coincide
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// The transform running the opposite way
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    /// Transform a single coordinate pair
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        if self.is_identity() {
            return (x, y);
        }
        let (lon, lat) = self.from.inverse(x, y);
        self.to.forward(lon, lat)
    }

    /// Transform every vertex of a geometry
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        if self.is_identity() {
            return geometry.clone();
        }
        geometry.map_coords(|c| {
            let (x, y) = self.transform(c.x, c.y);
            Coord { x, y }
        })
    }

    /// Transform a feature collection, tagging the result with `target`
    pub fn transform_features(
        &self,
        features: &FeatureCollection,
        target: &CRS,
    ) -> FeatureCollection {
        let transformed = features
            .iter()
            .map(|f| f.map_geometry(|g| self.transform_geometry(g)))
            .collect();
        FeatureCollection::with_crs(transformed, Some(target.clone()))
    }
}

// ── Web Mercator ────────────────────────────────────────────────────────

fn mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let x = A * lon.to_radians();
    let y = A * (FRAC_PI_2 / 2.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

// ── Transverse Mercator (Snyder pp. 61-64) ──────────────────────────────

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

fn utm_forward(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

fn utm_inverse(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1e2) / (1.0 + sqrt_1e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude (Snyder eq. 3-26)
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();
    let c1 = E_PRIME2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let denom = 1.0 - E2 * sin1 * sin1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians), Snyder eq. 3-21
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Lambert Azimuthal Equal Area, oblique ellipsoidal (Snyder pp. 187-190)

/// Snyder eq. 3-12
fn authalic_q(sin_phi: f64) -> f64 {
    let e = E2.sqrt();
    let es = e * sin_phi;
    (1.0 - E2) * (sin_phi / (1.0 - E2 * sin_phi * sin_phi) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

struct LaeaConstants {
    qp: f64,
    rq: f64,
    d: f64,
    sin_b1: f64,
    cos_b1: f64,
}

fn laea_constants() -> LaeaConstants {
    let phi1 = LAEA_LAT0.to_radians();
    let qp = authalic_q(1.0);
    let q1 = authalic_q(phi1.sin());
    let beta1 = (q1 / qp).asin();
    let rq = A * (qp / 2.0).sqrt();
    let m1 = phi1.cos() / (1.0 - E2 * phi1.sin().powi(2)).sqrt();
    let d = A * m1 / (rq * beta1.cos());
    LaeaConstants {
        qp,
        rq,
        d,
        sin_b1: beta1.sin(),
        cos_b1: beta1.cos(),
    }
}

fn laea_forward(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let k = laea_constants();
    let q = authalic_q(lat_deg.to_radians().sin());
    let beta = (q / k.qp).clamp(-1.0, 1.0).asin();
    let dlon = (lon_deg - LAEA_LON0).to_radians();

    let b = k.rq * (2.0 / (1.0 + k.sin_b1 * beta.sin() + k.cos_b1 * beta.cos() * dlon.cos())).sqrt();
    let x = b * k.d * beta.cos() * dlon.sin();
    let y = (b / k.d) * (k.cos_b1 * beta.sin() - k.sin_b1 * beta.cos() * dlon.cos());

    (x + LAEA_FALSE_EASTING, y + LAEA_FALSE_NORTHING)
}

fn laea_inverse(easting: f64, northing: f64) -> (f64, f64) {
    let k = laea_constants();
    let x = easting - LAEA_FALSE_EASTING;
    let y = northing - LAEA_FALSE_NORTHING;

    let rho = ((x / k.d).powi(2) + (k.d * y).powi(2)).sqrt();
    if rho < 1e-9 {
        return (LAEA_LON0, LAEA_LAT0);
    }
    let ce = 2.0 * (rho / (2.0 * k.rq)).clamp(-1.0, 1.0).asin();
    let (sin_ce, cos_ce) = ce.sin_cos();

    let beta = (cos_ce * k.sin_b1 + k.d * y * sin_ce * k.cos_b1 / rho).clamp(-1.0, 1.0).asin();
    let lon = LAEA_LON0.to_radians()
        + (x * sin_ce).atan2(k.d * rho * k.cos_b1 * cos_ce - k.d * k.d * y * k.sin_b1 * sin_ce);

    // Authalic to geodetic latitude, Snyder eq. 3-18
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let lat = beta
        + (E2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
        + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
        + (761.0 * e6 / 45360.0) * (6.0 * beta).sin();

    (lon.to_degrees(), lat.to_degrees())
}
