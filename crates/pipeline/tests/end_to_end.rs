//! Whole-pipeline scenarios over synthetic Danish-waters layers

use approx::assert_relative_eq;
use geo_types::{line_string, point, polygon, Geometry};
use havvind_algorithms::classify::UNCLASSIFIED;
use havvind_core::io::write_geotiff;
use havvind_core::{Feature, FeatureCollection, GeoTransform, Raster, CRS};
use havvind_pipeline::exclusion::ExclusionKind;
use havvind_pipeline::export::{
    DEPTH_ZONES_EXCL_PROTECTED_PNG, DEPTH_ZONES_PNG, REPORT_JSON, SUITABILITY_PNG, WIND_POWER_PNG,
};
use havvind_pipeline::{analyze, run, run_layers, DepthSign, Layers, SitingConfig, SitingReport};
use ndarray::Array2;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use std::path::Path;
use tempfile::tempdir;

const UTM32: u32 = 25832;
const ORIGIN_X: f64 = 600_000.0;
const ORIGIN_Y: f64 = 6_220_000.0;
const CELL: f64 = 500.0;

/// 40x40 grid; columns 0-3 are land, then depth grows 1.25 m per column
fn bathymetry() -> Raster<f64> {
    let data = Array2::from_shape_fn((40, 40), |(_, c)| {
        if c < 4 {
            f64::NAN
        } else {
            5.0 + c as f64 * 1.25
        }
    });
    let mut r = Raster::from_array(data);
    r.set_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, CELL, -CELL));
    r.set_crs(Some(CRS::from_epsg(UTM32)));
    r.set_nodata(Some(f64::NAN));
    r
}

/// Geographic wind field covering the bathymetry with margin
fn wind() -> Raster<f64> {
    let data = Array2::from_shape_fn((20, 40), |(_, c)| 300.0 + 10.0 * c as f64);
    let mut r = Raster::from_array(data);
    r.set_transform(GeoTransform::new(10.0, 56.5, 0.05, -0.05));
    r.set_crs(Some(CRS::wgs84()));
    r.set_nodata(Some(f64::NAN));
    r
}

fn utm(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection::with_crs(features, Some(CRS::from_epsg(UTM32)))
}

/// Centre of cell (row, col)
fn centre(row: usize, col: usize) -> (f64, f64) {
    (
        ORIGIN_X + (col as f64 + 0.5) * CELL,
        ORIGIN_Y - (row as f64 + 0.5) * CELL,
    )
}

fn layers() -> Layers {
    let (ox, oy) = centre(20, 12);
    let (lx, ly) = centre(20, 1);
    Layers {
        bathymetry: bathymetry(),
        turbines: utm(vec![
            Feature::new(Geometry::Point(point!(x: ox, y: oy))),
            Feature::new(Geometry::Point(point!(x: lx, y: ly))),
        ]),
        protected_areas: utm(vec![Feature::new(Geometry::Polygon(polygon![
            (x: 612_000.0, y: 6_218_000.0),
            (x: 616_000.0, y: 6_218_000.0),
            (x: 616_000.0, y: 6_214_000.0),
            (x: 612_000.0, y: 6_214_000.0),
        ]))]),
        shipping_lanes: utm(vec![Feature::new(Geometry::LineString(line_string![
            (x: 600_000.0, y: 6_203_000.0),
            (x: 620_000.0, y: 6_203_000.0),
        ]))]),
        wind_power: wind(),
    }
}

fn config(output: &Path) -> SitingConfig {
    let mut config = SitingConfig::default();
    config.output.directory = output.to_path_buf();
    config
}

fn png_header(path: &Path) -> (u32, u32, u32) {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let be = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let phys = bytes.windows(4).position(|w| w == b"pHYs").unwrap();
    (be(16), be(20), be(phys + 4))
}

#[test]
fn test_two_turbines_one_offshore_at_depth_20() {
    let analysis = analyze(layers(), &SitingConfig::default().analysis).unwrap();
    assert_eq!(analysis.turbines.offshore.len(), 1);
    assert_eq!(analysis.turbines.onshore.len(), 1);

    let depth = analysis.turbines.depth_summary();
    assert_eq!(depth.count, 1);
    assert_eq!(depth.min, Some(20.0));
    assert_eq!(depth.max, Some(20.0));
}

#[test]
fn test_exclusions_shrink_zones_and_clear_turbine_wake() {
    let analysis = analyze(layers(), &SitingConfig::default().analysis).unwrap();
    let zones = &analysis.zones;

    // Columns 4..=35 hold depths in [10, 50)
    assert_eq!(zones.base.defined_count(), 40 * 32);
    let mut before = zones.base.defined_count();
    for step in &zones.steps {
        assert_eq!(step.cells_before, before);
        assert!(step.cells_after <= step.cells_before);
        before = step.cells_after;
    }
    for kind in ExclusionKind::ALL {
        assert!(zones.after(kind).unwrap().defined_count() > 0, "{kind} removed everything");
    }

    let remaining = zones.final_zones();
    // Turbine cell and a cell 5 km east of it lie inside the wake
    assert_eq!(remaining.get(20, 12).unwrap(), UNCLASSIFIED);
    assert_eq!(remaining.get(20, 22).unwrap(), UNCLASSIFIED);
    // 6 km north of the turbine is outside every exclusion
    assert_eq!(remaining.get(8, 12).unwrap(), 2);
    // Protected square covers columns 24..=31, rows 4..=11
    let protected = zones.after(ExclusionKind::ProtectedAreas).unwrap();
    assert_eq!(protected.get(6, 26).unwrap(), UNCLASSIFIED);
    assert_ne!(zones.base.get(6, 26).unwrap(), UNCLASSIFIED);
}

#[test]
fn test_suitability_follows_remaining_zones() {
    let analysis = analyze(layers(), &SitingConfig::default().analysis).unwrap();
    let zones = analysis.zones.final_zones();
    let suitability = &analysis.suitability;

    assert!(suitability.suitability.same_grid(zones));
    assert_eq!(suitability.uncovered_cells, 0);
    for (&zone, &value) in zones.data().iter().zip(suitability.suitability.data().iter()) {
        assert_eq!(zone != UNCLASSIFIED, value.is_finite());
    }
    assert_eq!(suitability.summary.count, zones.defined_count());
    let mean = suitability.summary.mean.unwrap();
    assert!((300.0..700.0).contains(&mean));
}

#[test]
fn test_run_layers_writes_figures_and_report() {
    let dir = tempdir().unwrap();
    let report = run_layers(layers(), &config(dir.path())).unwrap();

    for name in [WIND_POWER_PNG, DEPTH_ZONES_PNG, DEPTH_ZONES_EXCL_PROTECTED_PNG, SUITABILITY_PNG] {
        let path = dir.path().join(name);
        assert!(report.files.contains(&path), "{name} missing from report");
        let (width, height, ppm) = png_header(&path);
        assert_eq!((width, height), (1600, 1200));
        assert_eq!(ppm, 7874);
    }

    let json = std::fs::read_to_string(dir.path().join(REPORT_JSON)).unwrap();
    let parsed: SitingReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.turbines, report.turbines);
    assert_eq!(parsed.zones, report.zones);
    assert_eq!(parsed.files, report.files);
    assert_eq!(report.crs, "EPSG:25832");
    assert_eq!(report.turbines.total, 2);
    assert_eq!(report.zones.len(), 4);
    assert_eq!(report.zones[0].stage, "classified");
    assert_eq!(report.exclusions.len(), 3);
    assert_relative_eq!(report.exclusions[0].area_km2, 16.0, epsilon = 1e-9);
    assert_eq!(report.figures[1].legend.len(), 4);
}

#[test]
fn test_empty_results_propagate() {
    let mut input = layers();
    // Everything deeper than the last band and every turbine on land
    input.bathymetry = bathymetry().with_data(Array2::from_elem((40, 40), 60.0)).unwrap();
    input.turbines = utm(vec![Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0)))]);
    input.protected_areas = FeatureCollection::new();

    let dir = tempdir().unwrap();
    let report = run_layers(input, &config(dir.path())).unwrap();

    assert_eq!(report.turbines.offshore, 0);
    assert_eq!(report.offshore_depth.mean, None);
    assert_eq!(report.final_cells(), 0);
    assert!(report.suitability.is_empty());
    assert_eq!(report.suitability.max, None);
    assert!(report.wind_by_zone.is_empty());
    assert!(dir.path().join(SUITABILITY_PNG).exists());
}

#[test]
fn test_crs_problems_are_configuration_errors() {
    let mut input = layers();
    input.bathymetry.set_crs(None);
    let err = analyze(input, &SitingConfig::default().analysis).unwrap_err();
    assert!(err.is_configuration());

    let mut input = layers();
    input.protected_areas.crs = Some(CRS::from_epsg(2154));
    let err = analyze(input, &SitingConfig::default().analysis).unwrap_err();
    assert!(err.is_configuration());
}

fn write_shapes<S: shapefile::record::EsriShape>(path: &Path, shapes: &[S], prj_name: &str) {
    let table = TableWriterBuilder::new().add_character_field(FieldName::try_from("name").unwrap(), 16);
    let mut writer = shapefile::Writer::from_path(path, table).unwrap();
    for (i, shape) in shapes.iter().enumerate() {
        let mut record = Record::default();
        record.insert("name".to_string(), FieldValue::Character(Some(format!("f{i}"))));
        writer.write_shape_and_record(shape, &record).unwrap();
    }
    std::fs::write(
        path.with_extension("prj"),
        format!(r#"PROJCS["{prj_name}",GEOGCS["GCS_ETRS_1989"]]"#),
    )
    .unwrap();
}

#[test]
fn test_run_from_files() {
    let data = tempdir().unwrap();
    let root = data.path();

    // Elevation-style bathymetry: negative below the surface
    let mut elevation = bathymetry();
    *elevation.data_mut() = bathymetry().data().mapv(|v| -v);
    write_geotiff(&elevation, root.join("bathymetry.tif")).unwrap();
    write_geotiff(&wind(), root.join("wind.tif")).unwrap();

    let package = root.join("turbines");
    std::fs::create_dir(&package).unwrap();
    let (ox, oy) = centre(20, 12);
    let (lx, ly) = centre(20, 1);
    write_shapes(
        &package.join("turbines.shp"),
        &[shapefile::Point::new(ox, oy), shapefile::Point::new(lx, ly)],
        "ETRS_1989_UTM_Zone_32N",
    );
    write_shapes(&package.join("substations.shp"), &[shapefile::Point::new(ox, oy)], "ETRS_1989_UTM_Zone_32N");

    let ring = vec![
        shapefile::Point::new(612_000.0, 6_214_000.0),
        shapefile::Point::new(612_000.0, 6_218_000.0),
        shapefile::Point::new(616_000.0, 6_218_000.0),
        shapefile::Point::new(616_000.0, 6_214_000.0),
        shapefile::Point::new(612_000.0, 6_214_000.0),
    ];
    write_shapes(
        &root.join("protected.shp"),
        &[shapefile::Polygon::new(shapefile::PolygonRing::Outer(ring))],
        "ETRS_1989_UTM_Zone_32N",
    );
    write_shapes(
        &root.join("lanes.shp"),
        &[shapefile::Polyline::new(vec![
            shapefile::Point::new(600_000.0, 6_203_000.0),
            shapefile::Point::new(620_000.0, 6_203_000.0),
        ])],
        "ETRS_1989_UTM_Zone_32N",
    );

    let output = tempdir().unwrap();
    let mut config = config(output.path());
    config.inputs.bathymetry = root.join("bathymetry.tif");
    config.inputs.turbines = package.clone();
    config.inputs.protected_areas = root.join("protected.shp");
    config.inputs.shipping_lanes = root.join("lanes.shp");
    config.inputs.wind_power = root.join("wind.tif");
    config.analysis.depth_sign = DepthSign::NegativeDown;
    config.output.geotiff = true;

    let report = run(&config).unwrap();
    assert_eq!(report.turbines.offshore, 1);
    assert_eq!(report.offshore_depth.min, Some(20.0));
    assert_relative_eq!(report.exclusions[0].area_km2, 16.0, epsilon = 1e-6);
    assert!(output.path().join("depth_zones.tif").exists());
    assert!(output.path().join("suitability.tif").exists());
    assert_eq!(report.files.len(), 8);

    // Same data from memory gives the same numbers
    let memory = run_layers(layers(), &config).unwrap();
    assert_eq!(memory.zones, report.zones);

    config.inputs.turbine_layer = "foundations".to_string();
    let err = run(&config).unwrap_err();
    assert!(err.is_data_access());
}
