//! Run report written next to the figures

use crate::config::DepthBands;
use crate::exclusion::ExclusionKind;
use crate::zones::{zone_counts, ZoneCounts};
use crate::Analysis;
use havvind_algorithms::statistics::{Summary, ZonalResult};
use havvind_colormap::{ColorScheme, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a run produced, in plain numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitingReport {
    /// Working CRS
    pub crs: String,
    /// Turbines read and how they split
    pub turbines: TurbineCounts,
    /// Sampled depth under offshore turbines, metres
    pub offshore_depth: Summary,
    /// Zone cells after classification and after each exclusion
    pub zones: Vec<ZoneStage>,
    /// One entry per exclusion, in application order
    pub exclusions: Vec<ExclusionSummary>,
    /// Wind power density over the remaining zones, W/m²
    pub suitability: Summary,
    /// Remaining zone cells without wind coverage
    pub uncovered_cells: usize,
    /// Wind power statistics per remaining zone
    pub wind_by_zone: BTreeMap<u8, ZonalResult>,
    /// PNG figures written by the run
    pub figures: Vec<FigureRecord>,
    /// Every file written by the run
    pub files: Vec<PathBuf>,
}

/// Turbine totals; `offshore + onshore == total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurbineCounts {
    /// Features in the selected layer
    pub total: usize,
    /// Over defined bathymetry
    pub offshore: usize,
    /// Outside the grid or over undefined bathymetry
    pub onshore: usize,
}

/// Zone cell counts at one stage of the exclusion sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStage {
    /// `classified`, or the exclusion applied last
    pub stage: String,
    /// Cells with any zone
    pub cells: usize,
    /// Cells per zone number
    pub per_zone: ZoneCounts,
}

/// Size and effect of one exclusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionSummary {
    pub kind: ExclusionKind,
    /// Polygons after dissolving
    pub polygons: usize,
    /// Planar area of the dissolved geometry
    pub area_km2: f64,
    /// Zone cells this exclusion removed
    pub cells_removed: usize,
}

/// A written figure with the value range its colors stand for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureRecord {
    /// Path of the PNG
    pub file: PathBuf,
    /// Title drawn above the plot
    pub title: String,
    /// Scheme of the raster layer
    pub scheme: ColorScheme,
    /// Value at the bottom of the colorbar
    pub min: f64,
    /// Value at the top of the colorbar
    pub max: f64,
    /// Class colors of categorical figures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legend: Vec<LegendEntry>,
}

/// One labelled class of a categorical colorbar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    /// Zone number
    pub class: u8,
    /// Depth band, e.g. "10-20 m"
    pub label: String,
    /// Swatch color in the figure
    pub color: Rgb,
}

impl SitingReport {
    /// Summarise an analysis; figure and file lists start empty
    pub fn from_analysis(analysis: &Analysis, bands: &DepthBands) -> Self {
        let outcome = &analysis.zones;

        let mut zones = vec![ZoneStage {
            stage: "classified".to_string(),
            cells: outcome.base.defined_count(),
            per_zone: zone_counts(&outcome.base, bands),
        }];
        zones.extend(outcome.steps.iter().map(|step| ZoneStage {
            stage: step.kind.name().to_string(),
            cells: step.cells_after,
            per_zone: zone_counts(&step.remaining, bands),
        }));

        let exclusions = analysis
            .exclusions
            .iter()
            .map(|zone| ExclusionSummary {
                kind: zone.kind,
                polygons: zone.geometry.0.len(),
                area_km2: zone.area_km2(),
                cells_removed: outcome
                    .steps
                    .iter()
                    .find(|step| step.kind == zone.kind)
                    .map_or(0, |step| step.cells_removed()),
            })
            .collect();

        Self {
            crs: analysis.crs.identifier(),
            turbines: TurbineCounts {
                total: analysis.turbines.total(),
                offshore: analysis.turbines.offshore.len(),
                onshore: analysis.turbines.onshore.len(),
            },
            offshore_depth: analysis.turbines.depth_summary(),
            zones,
            exclusions,
            suitability: analysis.suitability.summary,
            uncovered_cells: analysis.suitability.uncovered_cells,
            wind_by_zone: analysis.suitability.per_zone.clone(),
            figures: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Remaining zone cells after every exclusion
    pub fn final_cells(&self) -> usize {
        self.zones.last().map_or(0, |stage| stage.cells)
    }
}
