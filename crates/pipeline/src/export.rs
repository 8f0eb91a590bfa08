//! Figures, GeoTIFFs and the JSON report
//!
//! All figures share the bathymetry extent so they overlay one another.
//! Each PNG carries its title and a labelled colorbar; the report repeats
//! the value ranges and class colors.

use crate::config::{DepthBands, OutputSettings};
use crate::error::Result;
use crate::exclusion::ExclusionKind;
use crate::report::{FigureRecord, LegendEntry, SitingReport};
use crate::Analysis;
use havvind_colormap::{auto_params, evaluate, ColorScheme, ColormapParams, Extent, Figure, Rgb};
use havvind_core::io::write_geotiff;
use havvind_core::{Raster, RasterElement};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const WIND_POWER_PNG: &str = "wind_power.png";
pub const DEPTH_ZONES_PNG: &str = "depth_zones.png";
pub const DEPTH_ZONES_EXCL_PROTECTED_PNG: &str = "depth_zones_excl_protected.png";
pub const SUITABILITY_PNG: &str = "suitability.png";
pub const REPORT_JSON: &str = "report.json";

const TURBINE: Rgb = Rgb::new(230, 57, 70);
const PROTECTED: Rgb = Rgb::new(46, 139, 87);
const WAKE: Rgb = Rgb::new(255, 140, 0);
const SHIPPING: Rgb = Rgb::new(90, 90, 90);
const TURBINE_RADIUS_PX: f64 = 3.0;

/// Render the map figures into `output.directory`
pub fn export_figures(
    analysis: &Analysis,
    bands: &DepthBands,
    output: &OutputSettings,
) -> Result<Vec<FigureRecord>> {
    fs::create_dir_all(&output.directory)?;
    let extent = Extent::from(analysis.bathymetry.bounds());
    let turbines = analysis.turbines.offshore_points();
    let mut records = Vec::with_capacity(4);

    let wind = &analysis.suitability.wind_aligned;
    let params = auto_params(wind, ColorScheme::Wind);
    let mut fig = base_figure(output, extent)?;
    fig.draw_raster(wind, &params);
    fig.draw_points(&turbines, TURBINE_RADIUS_PX, TURBINE);
    records.push(finish(fig, &params, output, WIND_POWER_PNG, "Wind power density (W/m²)", Vec::new())?);

    let zone_params = ColormapParams::with_range(ColorScheme::DepthZones, 0.5, bands.0.len() as f64 + 0.5);
    let legend = legend(bands, &zone_params);

    let mut fig = base_figure(output, extent)?;
    fig.draw_raster(&analysis.zones.base, &zone_params);
    fig.draw_points(&turbines, TURBINE_RADIUS_PX, TURBINE);
    records.push(finish(fig, &zone_params, output, DEPTH_ZONES_PNG, "Depth zones", legend.clone())?);

    let excl_protected = analysis.zones.after(ExclusionKind::ProtectedAreas);
    let mut fig = base_figure(output, extent)?;
    fig.draw_raster(excl_protected.unwrap_or(&analysis.zones.base), &zone_params);
    if let Some(protected) = analysis.exclusion(ExclusionKind::ProtectedAreas) {
        fig.draw_outline(&protected.geometry, PROTECTED);
    }
    fig.draw_points(&turbines, TURBINE_RADIUS_PX, TURBINE);
    records.push(finish(
        fig,
        &zone_params,
        output,
        DEPTH_ZONES_EXCL_PROTECTED_PNG,
        "Depth zones excluding protected areas",
        legend,
    )?);

    let suitability = &analysis.suitability.suitability;
    let params = auto_params(suitability, ColorScheme::Suitability);
    let mut fig = base_figure(output, extent)?;
    fig.draw_raster(suitability, &params);
    for zone in &analysis.exclusions {
        let color = match zone.kind {
            ExclusionKind::ProtectedAreas => PROTECTED,
            ExclusionKind::WakeBuffers => WAKE,
            ExclusionKind::ShippingLanes => SHIPPING,
        };
        fig.draw_outline(&zone.geometry, color);
    }
    fig.draw_lines(&analysis.shipping_lanes.lines(), SHIPPING);
    fig.draw_points(&turbines, TURBINE_RADIUS_PX, TURBINE);
    records.push(finish(fig, &params, output, SUITABILITY_PNG, "Wind power over suitable zones (W/m²)", Vec::new())?);

    Ok(records)
}

fn base_figure(output: &OutputSettings, extent: Extent) -> Result<Figure> {
    let mut fig = Figure::new(output.width, output.height, extent)?;
    fig.fill_plot(Rgb::LAND);
    Ok(fig)
}

fn finish(
    mut fig: Figure,
    params: &ColormapParams,
    output: &OutputSettings,
    name: &str,
    title: &str,
    legend: Vec<LegendEntry>,
) -> Result<FigureRecord> {
    fig.draw_frame();
    fig.draw_title(title);
    fig.draw_colorbar(params);
    let mut classes: Vec<&LegendEntry> = legend.iter().collect();
    classes.sort_by_key(|entry| entry.class);
    let labels: Vec<&str> = classes.iter().map(|entry| entry.label.as_str()).collect();
    fig.label_classes(&labels);
    let file = output.directory.join(name);
    fig.save(&file, output.dpi)?;
    info!("saved {}", file.display());
    Ok(FigureRecord {
        file,
        title: title.to_string(),
        scheme: params.scheme,
        min: params.min,
        max: params.max,
        legend,
    })
}

fn legend(bands: &DepthBands, params: &ColormapParams) -> Vec<LegendEntry> {
    let span = params.max - params.min;
    bands
        .0
        .iter()
        .map(|band| LegendEntry {
            class: band.class,
            label: format!("{}-{} m", band.min, band.max),
            color: evaluate(params.scheme, (band.class as f64 - params.min) / span),
        })
        .collect()
}

/// Write the classified, excluded and suitability rasters as GeoTIFF
pub fn export_geotiffs(analysis: &Analysis, directory: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(directory)?;
    let mut files = Vec::with_capacity(3);
    files.push(geotiff(&analysis.zones.base, directory, "depth_zones.tif")?);
    files.push(geotiff(analysis.zones.final_zones(), directory, "depth_zones_excluded.tif")?);
    files.push(geotiff(&analysis.suitability.suitability, directory, "suitability.tif")?);
    Ok(files)
}

fn geotiff<T: RasterElement>(raster: &Raster<T>, directory: &Path, name: &str) -> Result<PathBuf> {
    let path = directory.join(name);
    write_geotiff(raster, &path)?;
    debug!("wrote {}", path.display());
    Ok(path)
}

/// Write `report` as pretty-printed JSON
pub fn write_report(report: &SitingReport, directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = directory.join(REPORT_JSON);
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    info!("saved {}", path.display());
    Ok(path)
}
