//! Stage 5: remove protected areas, turbine wakes and shipping lanes
//!
//! Each exclusion is a single dissolved polygon set. Overlapping buffers are
//! merged by polygon union before any cell is masked, so shared areas are
//! neither counted twice nor split by a seam.

use crate::config::AnalysisParams;
use crate::error::Result;
use geo_types::MultiPolygon;
use havvind_algorithms::mask::{mask_out, MaskParams};
use havvind_algorithms::vector::{buffer_geometry, buffer_point, total_area, union_all, BufferParams};
use havvind_core::crs::Projection;
use havvind_core::{Error, FeatureCollection, Raster, CRS};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// What an exclusion zone stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionKind {
    ProtectedAreas,
    WakeBuffers,
    ShippingLanes,
}

impl ExclusionKind {
    /// Order in which exclusions are applied
    pub const ALL: [ExclusionKind; 3] = [
        ExclusionKind::ProtectedAreas,
        ExclusionKind::WakeBuffers,
        ExclusionKind::ShippingLanes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExclusionKind::ProtectedAreas => "protected_areas",
            ExclusionKind::WakeBuffers => "wake_buffers",
            ExclusionKind::ShippingLanes => "shipping_lanes",
        }
    }
}

impl fmt::Display for ExclusionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dissolved exclusion geometry in a known CRS
#[derive(Debug, Clone)]
pub struct ExclusionZone {
    pub kind: ExclusionKind,
    /// Union of the source polygons or buffers; empty when the layer is
    pub geometry: MultiPolygon<f64>,
    /// CRS of the layer the zone was built from
    pub crs: Option<CRS>,
}

impl ExclusionZone {
    pub fn area_km2(&self) -> f64 {
        total_area(&self.geometry) / 1.0e6
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

/// Build the three exclusion zones, in application order.
///
/// `offshore` holds the turbines whose wakes are excluded. Buffer distances
/// are metres, so the vector layers must be in a projected CRS.
pub fn build_exclusions(
    protected_areas: &FeatureCollection,
    offshore: &FeatureCollection,
    shipping_lanes: &FeatureCollection,
    params: &AnalysisParams,
) -> Result<Vec<ExclusionZone>> {
    let protected = ExclusionZone {
        kind: ExclusionKind::ProtectedAreas,
        geometry: union_all(protected_areas.polygons()),
        crs: protected_areas.crs().cloned(),
    };

    ensure_metric(offshore.crs(), "wake buffers")?;
    let wake = BufferParams::new(params.wake_radius_m, params.buffer_segments);
    let wakes = ExclusionZone {
        kind: ExclusionKind::WakeBuffers,
        geometry: union_all(offshore.points().iter().map(|p| buffer_point(p, &wake))),
        crs: offshore.crs().cloned(),
    };

    ensure_metric(shipping_lanes.crs(), "shipping buffers")?;
    let lane = BufferParams::new(params.shipping_buffer_m, params.buffer_segments);
    let lanes = ExclusionZone {
        kind: ExclusionKind::ShippingLanes,
        geometry: union_all(
            shipping_lanes
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .flat_map(|g| buffer_geometry(g, &lane).0),
        ),
        crs: shipping_lanes.crs().cloned(),
    };

    let zones = vec![protected, wakes, lanes];
    for zone in &zones {
        info!(
            "{}: {} polygons, {:.1} km²",
            zone.kind,
            zone.geometry.0.len(),
            zone.area_km2()
        );
    }
    Ok(zones)
}

/// Reject geographic coordinates where distances are metres
fn ensure_metric(crs: Option<&CRS>, context: &str) -> Result<()> {
    let crs = crs.ok_or_else(|| Error::MissingCrs(context.to_string()))?;
    match Projection::from_crs(crs) {
        Ok(Projection::Geographic) => Err(Error::UnsupportedCrs(format!(
            "{context} need a projected CRS, got {crs}"
        ))
        .into()),
        _ => Ok(()),
    }
}

/// Zones left after one exclusion
#[derive(Debug, Clone)]
pub struct ExclusionStep {
    /// Exclusion applied in this step
    pub kind: ExclusionKind,
    /// Zone raster with the excluded cells set to no-data
    pub remaining: Raster<u8>,
    /// Zone cells going into the step
    pub cells_before: usize,
    /// Zone cells left after it
    pub cells_after: usize,
}

impl ExclusionStep {
    pub fn cells_removed(&self) -> usize {
        self.cells_before - self.cells_after
    }
}

/// Zone rasters before and after each exclusion
#[derive(Debug, Clone)]
pub struct ExclusionOutcome {
    /// Zones straight from depth classification
    pub base: Raster<u8>,
    /// One step per exclusion, in application order
    pub steps: Vec<ExclusionStep>,
}

impl ExclusionOutcome {
    /// Zones after every exclusion
    pub fn final_zones(&self) -> &Raster<u8> {
        self.steps.last().map_or(&self.base, |step| &step.remaining)
    }

    /// Zones right after the exclusion of `kind`
    pub fn after(&self, kind: ExclusionKind) -> Option<&Raster<u8>> {
        self.steps
            .iter()
            .find(|step| step.kind == kind)
            .map(|step| &step.remaining)
    }
}

/// Mask `zones` with each exclusion in turn.
///
/// Every step masks the previous step's result; the inputs are left
/// untouched.
pub fn apply_exclusions(
    zones: &Raster<u8>,
    exclusions: &[ExclusionZone],
    params: MaskParams,
) -> Result<ExclusionOutcome> {
    let mut steps: Vec<ExclusionStep> = Vec::with_capacity(exclusions.len());

    for exclusion in exclusions {
        let current = steps.last().map_or(zones, |step| &step.remaining);
        let cells_before = current.defined_count();
        let remaining = mask_out(current, &exclusion.geometry, exclusion.crs.as_ref(), params)?;
        let cells_after = remaining.defined_count();

        info!(
            "excluded {}: {} -> {} zone cells",
            exclusion.kind, cells_before, cells_after
        );
        if exclusion.is_empty() {
            debug!("{} geometry is empty", exclusion.kind);
        }
        if cells_after == 0 && cells_before > 0 {
            warn!("no zone cells remain after excluding {}", exclusion.kind);
        }

        steps.push(ExclusionStep {
            kind: exclusion.kind,
            remaining,
            cells_before,
            cells_after,
        });
    }

    Ok(ExclusionOutcome {
        base: zones.clone(),
        steps,
    })
}
