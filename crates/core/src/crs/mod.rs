//! Coordinate Reference System handling

mod transform;

pub use transform::{CoordinateTransform, Projection};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate reference system, known by EPSG code, WKT text or both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// CRS known only by its WKT text
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// CRS from the contents of a `.prj` sidecar file.
    ///
    /// The EPSG code comes from an `AUTHORITY`/`ID` clause, or from the
    /// names ESRI and OGC writers use for the CRSs of Danish and European
    /// marine data. The text is kept as WKT either way.
    pub fn from_prj(text: &str) -> Self {
        let wkt = text.trim();
        Self {
            epsg: epsg_from_authority(wkt).or_else(|| epsg_from_name(wkt)),
            wkt: Some(wkt.to_string()),
        }
    }

    /// EPSG:4326
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Same EPSG code, or failing that identical WKT text.
    ///
    /// Two CRSs without a common representation are never equivalent.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg, &self.wkt, &other.wkt) {
            (Some(a), Some(b), _, _) => a == b,
            (_, _, Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// `EPSG:n`, or the start of the WKT text
    pub fn identifier(&self) -> String {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => format!("EPSG:{code}"),
            (None, Some(wkt)) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// Fail unless both layers carry a CRS and the two are equivalent.
///
/// Called before every operation that combines two layers geometrically.
pub fn ensure_same_crs(left: Option<&CRS>, right: Option<&CRS>, context: &str) -> Result<()> {
    match (left, right) {
        (Some(a), Some(b)) if a.is_equivalent(b) => Ok(()),
        (Some(a), Some(b)) => Err(Error::CrsMismatch {
            context: context.to_string(),
            left: a.identifier(),
            right: b.identifier(),
        }),
        _ => Err(Error::MissingCrs(context.to_string())),
    }
}

/// EPSG code of the top-level `AUTHORITY["EPSG","n"]` (WKT1) or `ID["EPSG",n]` (WKT2).
///
/// Only clauses directly inside the outermost keyword count; authorities of
/// nested GEOGCS, DATUM or UNIT clauses do not name the CRS itself.
fn epsg_from_authority(wkt: &str) -> Option<u32> {
    const MARKERS: [&str; 2] = ["AUTHORITY[\"EPSG\",", "ID[\"EPSG\","];
    let upper = wkt.to_ascii_uppercase();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut prev = ' ';
    for (i, c) in upper.char_indices() {
        match c {
            '"' => quoted = !quoted,
            _ if quoted => {}
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 1 && matches!(prev, ',' | '[' | '(') => {
                if let Some(rest) = MARKERS.iter().find_map(|m| upper[i..].strip_prefix(m)) {
                    let digits: String = rest
                        .chars()
                        .skip_while(|c| *c == '"' || c.is_whitespace())
                        .take_while(|c| c.is_ascii_digit())
                        .collect();
                    return digits.parse().ok();
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            prev = c;
        }
    }
    None
}

fn epsg_from_name(wkt: &str) -> Option<u32> {
    let name = wkt.to_ascii_uppercase().replace([' ', '-'], "_");
    let etrs = name.contains("ETRS");

    if name.contains("LAEA") || (etrs && name.contains("LAMBERT_AZIMUTHAL_EQUAL_AREA")) {
        return Some(3035);
    }
    if name.contains("PSEUDO_MERCATOR")
        || name.contains("WEB_MERCATOR")
        || name.contains("MERCATOR_AUXILIARY_SPHERE")
    {
        return Some(3857);
    }
    if let Some(pos) = name.find("UTM_ZONE_") {
        let rest = &name[pos + "UTM_ZONE_".len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let zone: u32 = digits.parse().ok().filter(|z| (1..=60).contains(z))?;
        let south = rest[digits.len()..].starts_with('S');
        return Some(match (etrs, south) {
            (true, _) => 25800 + zone,
            (false, false) => 32600 + zone,
            (false, true) => 32700 + zone,
        });
    }
    if name.starts_with("GEOGCS") || name.starts_with("GEOGCRS") {
        if etrs {
            return Some(4258);
        }
        if name.contains("WGS_1984") || name.contains("WGS_84") {
            return Some(4326);
        }
    }
    None
}
