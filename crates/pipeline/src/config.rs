//! Run configuration
//!
//! A [`SitingConfig`] is read from JSON. Every field has a default, so a
//! file only needs the values it changes.

use crate::error::{Result, SitingError};
use havvind_algorithms::classify::{ReclassEntry, ReclassifyParams};
use havvind_algorithms::mask::MaskParams;
use havvind_algorithms::resample::Resampling;
use havvind_algorithms::sampling::SampleMethod;
use havvind_core::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitingConfig {
    /// Where the five input layers are read from
    pub inputs: InputPaths,
    /// Depth bands, buffer distances and sampling choices
    pub analysis: AnalysisParams,
    /// Figure size, resolution and output directory
    pub output: OutputSettings,
}

/// Input datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    /// Bathymetry raster (GeoTIFF)
    pub bathymetry: PathBuf,
    /// Turbine package: a directory of shapefiles, a single `.shp`, or a
    /// GeoPackage when built with the `gdal` feature
    pub turbines: PathBuf,
    /// Layer of the turbine package holding turbine points
    pub turbine_layer: String,
    /// Protected-area polygons (shapefile)
    pub protected_areas: PathBuf,
    /// Shipping-lane lines (shapefile)
    pub shipping_lanes: PathBuf,
    /// Wind power density raster (GeoTIFF)
    pub wind_power: PathBuf,
    /// EPSG codes replacing the CRS read from each file
    pub crs_overrides: CrsOverrides,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            bathymetry: PathBuf::from("data/bathymetry.tif"),
            turbines: PathBuf::from("data/turbines"),
            turbine_layer: "turbines".to_string(),
            protected_areas: PathBuf::from("data/protected_areas.shp"),
            shipping_lanes: PathBuf::from("data/shipping_lanes.shp"),
            wind_power: PathBuf::from("data/wind_power_density.tif"),
            crs_overrides: CrsOverrides::default(),
        }
    }
}

/// Per-layer EPSG overrides, for files with a missing or wrong CRS
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrsOverrides {
    /// EPSG code for the bathymetry raster
    pub bathymetry: Option<u32>,
    /// EPSG code for the turbine layer
    pub turbines: Option<u32>,
    /// EPSG code for the protected areas
    pub protected_areas: Option<u32>,
    /// EPSG code for the shipping lanes
    pub shipping_lanes: Option<u32>,
    /// EPSG code for the wind power raster
    pub wind_power: Option<u32>,
}

/// Sign convention of the bathymetry raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthSign {
    /// Depth below the surface is positive (used as is)
    #[default]
    PositiveDown,
    /// Elevation-style values, negative below the surface; negated on load
    NegativeDown,
}

/// Ordered depth bins, each `[min, max)` metres mapped to a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepthBands(pub Vec<ReclassEntry>);

impl Default for DepthBands {
    fn default() -> Self {
        Self(vec![
            ReclassEntry::new(10.0, 20.0, 1),
            ReclassEntry::new(20.0, 30.0, 2),
            ReclassEntry::new(30.0, 40.0, 3),
            ReclassEntry::new(40.0, 50.0, 4),
        ])
    }
}

impl DepthBands {
    pub fn to_params(&self) -> ReclassifyParams {
        ReclassifyParams::new(self.0.clone())
    }

    /// Band of a zone, for labelling
    pub fn band(&self, zone: u8) -> Option<&ReclassEntry> {
        self.0.iter().find(|entry| entry.class == zone)
    }
}

/// Analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// How bathymetry values map to depth
    pub depth_sign: DepthSign,
    /// Depth bins and their zone numbers
    pub depth_bands: DepthBands,
    /// Wake buffer radius around each offshore turbine, metres
    pub wake_radius_m: f64,
    /// Buffer distance around shipping lanes, metres
    pub shipping_buffer_m: f64,
    /// Segments approximating a full buffer circle
    pub buffer_segments: usize,
    /// Point sampling for turbine depths
    pub sample_method: SampleMethod,
    /// Interpolation for aligning the wind raster
    pub resampling: Resampling,
    /// Exclude every touched cell instead of cells whose centre is covered
    pub all_touched: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            depth_sign: DepthSign::default(),
            depth_bands: DepthBands::default(),
            wake_radius_m: 5500.0,
            shipping_buffer_m: 4600.0,
            buffer_segments: 64,
            sample_method: SampleMethod::Nearest,
            resampling: Resampling::Bilinear,
            all_touched: false,
        }
    }
}

impl AnalysisParams {
    pub fn mask_params(&self) -> MaskParams {
        MaskParams {
            all_touched: self.all_touched,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Created if missing
    pub directory: PathBuf,
    /// Figure width in pixels
    pub width: usize,
    /// Figure height in pixels
    pub height: usize,
    /// Print resolution stored in the PNG files
    pub dpi: u32,
    /// Also write zone and suitability rasters as GeoTIFF
    pub geotiff: bool,
    /// Write `report.json`
    pub report: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            width: 1600,
            height: 1200,
            dpi: 200,
            geotiff: false,
            report: true,
        }
    }
}

impl SitingConfig {
    /// Read and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::data_access(path, e))?;
        let config: SitingConfig = serde_json::from_str(&text).map_err(|source| SitingError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        let output = &self.output;

        if self.inputs.turbine_layer.trim().is_empty() {
            return Err(SitingError::Config("turbine_layer must name a layer".into()));
        }
        if analysis.depth_bands.0.is_empty() {
            return Err(SitingError::Config("depth_bands must not be empty".into()));
        }
        analysis
            .depth_bands
            .to_params()
            .validate()
            .map_err(|e| SitingError::Config(format!("depth_bands: {e}")))?;

        for (name, value) in [
            ("wake_radius_m", analysis.wake_radius_m),
            ("shipping_buffer_m", analysis.shipping_buffer_m),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SitingError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if analysis.buffer_segments < 8 {
            return Err(SitingError::Config(format!(
                "buffer_segments must be at least 8, got {}",
                analysis.buffer_segments
            )));
        }
        if output.width < 16 || output.height < 16 {
            return Err(SitingError::Config(format!(
                "figure size {}x{} is too small",
                output.width, output.height
            )));
        }
        if output.dpi == 0 {
            return Err(SitingError::Config("dpi must be positive".into()));
        }
        Ok(())
    }
}
