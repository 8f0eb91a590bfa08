//! Color schemes for depth, wind and zone maps

use serde::{Deserialize, Serialize};

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Fill for cells outside the sea
    pub const LAND: Self = Self::new(222, 214, 196);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend, `t = 0` gives `self`
    fn mix(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(channel(self.r, other.r), channel(self.g, other.g), channel(self.b, other.b))
    }
}

/// Position in `[0, 1]` and the color at that position
type ColorStop = (f64, Rgb);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    /// Pale to deep blue
    Bathymetry,
    /// Viridis-like ramp for wind power density
    Wind,
    /// One flat color per depth zone, shallow first
    DepthZones,
    /// Red through yellow to green
    Suitability,
}

impl ColorScheme {
    /// Class count of a categorical scheme
    pub fn classes(&self) -> Option<usize> {
        match self {
            Self::DepthZones => Some(DEPTH_ZONES.len()),
            _ => None,
        }
    }

    /// Value range that puts class `k` (1-based) in the middle of its swatch
    pub fn fixed_range(&self) -> Option<(f64, f64)> {
        self.classes().map(|n| (0.5, n as f64 + 0.5))
    }

    fn stops(&self) -> &'static [ColorStop] {
        match self {
            Self::Bathymetry => BATHYMETRY,
            Self::Wind => WIND,
            Self::Suitability => SUITABILITY,
            Self::DepthZones => &[],
        }
    }
}

const BATHYMETRY: &[ColorStop] = &[
    (0.00, Rgb::new(240, 249, 255)),
    (0.25, Rgb::new(186, 228, 250)),
    (0.50, Rgb::new(80, 180, 230)),
    (0.75, Rgb::new(30, 120, 200)),
    (1.00, Rgb::new(8, 48, 107)),
];

const WIND: &[ColorStop] = &[
    (0.00, Rgb::new(68, 1, 84)),
    (0.25, Rgb::new(59, 82, 139)),
    (0.50, Rgb::new(33, 145, 140)),
    (0.75, Rgb::new(94, 201, 98)),
    (1.00, Rgb::new(253, 231, 37)),
];

const SUITABILITY: &[ColorStop] = &[
    (0.00, Rgb::new(215, 48, 39)),
    (0.25, Rgb::new(252, 141, 89)),
    (0.50, Rgb::new(254, 224, 139)),
    (0.75, Rgb::new(145, 207, 96)),
    (1.00, Rgb::new(26, 152, 80)),
];

const DEPTH_ZONES: &[Rgb] = &[
    Rgb::new(199, 233, 180),
    Rgb::new(127, 205, 187),
    Rgb::new(44, 127, 184),
    Rgb::new(37, 52, 148),
];

fn ramp(stops: &[ColorStop], t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    stops
        .windows(2)
        .find(|pair| t <= pair[1].0)
        .map(|pair| {
            let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
            c0.mix(c1, (t - t0) / (t1 - t0))
        })
        .unwrap_or(stops[stops.len() - 1].1)
}

/// Color of `scheme` at position `t`, clamped to `[0, 1]`.
///
/// `DepthZones` splits the unit range into equal swatches.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    match scheme {
        ColorScheme::DepthZones => {
            let n = DEPTH_ZONES.len();
            let idx = (t.clamp(0.0, 1.0) * n as f64) as usize;
            DEPTH_ZONES[idx.min(n - 1)]
        }
        continuous => ramp(continuous.stops(), t),
    }
}
