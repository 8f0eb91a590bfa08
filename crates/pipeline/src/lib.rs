//! # Havvind Pipeline
//!
//! Offshore wind siting as six stages, each a function from immutable
//! inputs to a new value:
//!
//! 1. [`ingest::load_layers`]: bathymetry, turbines, protected areas,
//!    shipping lanes and wind power
//! 2. [`align::align_layers`]: every vector layer into the bathymetry CRS
//! 3. [`offshore::filter_offshore`]: turbines over defined depth
//! 4. [`zones::classify_depth`]: depth bands to zones 1..=4
//! 5. [`exclusion::apply_exclusions`]: protected areas, wake buffers and
//!    shipping buffers removed from the zones
//! 6. [`suitability::score`]: wind power on the remaining zone cells
//!
//! [`run`] chains the stages and writes the figures and report.

pub mod align;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod export;
pub mod ingest;
pub mod offshore;
pub mod report;
pub mod suitability;
pub mod zones;

pub use config::{AnalysisParams, DepthBands, DepthSign, InputPaths, OutputSettings, SitingConfig};
pub use error::{Result, SitingError};
pub use ingest::Layers;
pub use report::SitingReport;

use exclusion::{ExclusionKind, ExclusionOutcome, ExclusionZone};
use havvind_core::{FeatureCollection, Raster, CRS};
use offshore::OffshoreSplit;
use suitability::Suitability;
use tracing::info;

/// Results of stages 2 to 6
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Working CRS shared by every layer below
    pub crs: CRS,
    /// Depth, positive down, in the working CRS
    pub bathymetry: Raster<f64>,
    /// Turbines with their sampled depth, split offshore/onshore
    pub turbines: OffshoreSplit,
    /// Lanes in the working CRS, drawn on the suitability figure
    pub shipping_lanes: FeatureCollection,
    /// Dissolved exclusion geometry, in application order
    pub exclusions: Vec<ExclusionZone>,
    /// Depth zones before and after each exclusion
    pub zones: ExclusionOutcome,
    /// Wind power over the remaining zones
    pub suitability: Suitability,
}

impl Analysis {
    pub fn exclusion(&self, kind: ExclusionKind) -> Option<&ExclusionZone> {
        self.exclusions.iter().find(|zone| zone.kind == kind)
    }
}

/// Run stages 2 to 6 on loaded layers.
///
/// The bathymetry must already follow the positive-down convention, as
/// [`ingest::load_layers`] leaves it.
pub fn analyze(layers: Layers, params: &AnalysisParams) -> Result<Analysis> {
    let aligned = align::align_layers(layers)?;

    let turbines = offshore::filter_offshore(&aligned.turbines, &aligned.bathymetry, params.sample_method)?;
    let depth = turbines.depth_summary();
    info!(
        "offshore depth: {:?}..{:?} m, mean {:?}",
        depth.min, depth.max, depth.mean
    );

    let zones = zones::classify_depth(&aligned.bathymetry, &params.depth_bands)?;

    let exclusions = exclusion::build_exclusions(
        &aligned.protected_areas,
        &turbines.offshore,
        &aligned.shipping_lanes,
        params,
    )?;
    let outcome = exclusion::apply_exclusions(&zones, &exclusions, params.mask_params())?;

    let suitability = suitability::score(&aligned.wind_power, outcome.final_zones(), params.resampling)?;

    Ok(Analysis {
        crs: aligned.crs,
        bathymetry: aligned.bathymetry,
        turbines,
        shipping_lanes: aligned.shipping_lanes,
        exclusions,
        zones: outcome,
        suitability,
    })
}

/// Write figures, optional GeoTIFFs and the report for `analysis`
pub fn publish(analysis: &Analysis, config: &SitingConfig) -> Result<SitingReport> {
    let bands = &config.analysis.depth_bands;
    let output = &config.output;

    let mut report = SitingReport::from_analysis(analysis, bands);
    report.figures = export::export_figures(analysis, bands, output)?;
    report.files = report.figures.iter().map(|f| f.file.clone()).collect();

    if output.geotiff {
        let rasters = export::export_geotiffs(analysis, &output.directory)?;
        report.files.extend(rasters);
    }
    if output.report {
        report.files.push(output.directory.join(export::REPORT_JSON));
        export::write_report(&report, &output.directory)?;
    }

    info!(
        "{} of {} zone cells remain suitable",
        report.final_cells(),
        analysis.zones.base.defined_count()
    );
    Ok(report)
}

/// Run stages 2 to 6 on in-memory layers and publish the results
pub fn run_layers(layers: Layers, config: &SitingConfig) -> Result<SitingReport> {
    config.validate()?;
    let analysis = analyze(layers, &config.analysis)?;
    publish(&analysis, config)
}

/// Run the whole pipeline described by `config`
pub fn run(config: &SitingConfig) -> Result<SitingReport> {
    config.validate()?;
    let layers = ingest::load_layers(&config.inputs, config.analysis.depth_sign)?;
    run_layers(layers, config)
}
