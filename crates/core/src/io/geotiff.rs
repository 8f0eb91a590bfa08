//! Native GeoTIFF reading and writing on top of the `tiff` crate.
//!
//! Georeferencing is read from ModelPixelScale + ModelTiepoint (or
//! ModelTransformation), the CRS from the GeoKey directory, and the no-data
//! value from the GDAL_NODATA tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

// GeoKey identifiers
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Read one band of a GeoTIFF file into a Raster
///
/// # Arguments
/// * `path` - Path to the GeoTIFF file
/// * `band` - Band number (1-indexed), defaults to 1
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::data_access(path, e))?;
    let raster = decode_geotiff(BufReader::new(file), band.unwrap_or(1))
        .map_err(|e| Error::data_access(path, e))?;
    debug!(
        "read {}: {}x{}, crs {:?}",
        path.display(),
        raster.cols(),
        raster.rows(),
        raster.crs().map(|c| c.identifier())
    );
    Ok(raster)
}

fn decode_geotiff<T, R>(reader: R, band: usize) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let samples: Vec<f64> = match result {
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let cells = rows * cols;
    if cells == 0 || samples.len() % cells != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    // Chunky (interleaved) layout: band b is every `bands`-th sample
    let bands = samples.len() / cells;
    if band == 0 || band > bands {
        return Err(Error::InvalidParameter {
            name: "band",
            value: band.to_string(),
            reason: format!("file has {} band(s)", bands),
        });
    }

    let data: Vec<T> = samples
        .iter()
        .skip(band - 1)
        .step_by(bands)
        .map(|&v| T::from_f64(v).unwrap_or_else(T::default_nodata))
        .collect();

    let mut raster = Raster::from_vec(data, rows, cols)?;

    let geokeys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok();
    let pixel_is_point = geokeys
        .as_deref()
        .and_then(|keys| geokey_value(keys, GT_RASTER_TYPE))
        == Some(RASTER_PIXEL_IS_POINT);

    if let Ok(transform) = read_geotransform(&mut decoder, pixel_is_point) {
        raster.set_transform(transform);
    }

    if let Some(epsg) = geokeys.as_deref().and_then(epsg_from_geokeys) {
        raster.set_crs(Some(CRS::from_epsg(epsg)));
    }

    if let Ok(text) = decoder.get_tag_ascii_string(Tag::GdalNodata) {
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if let Some(nd) = text.parse::<f64>().ok().and_then(T::from_f64) {
            raster.set_nodata(Some(nd));
        }
    }

    Ok(raster)
}

fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    pixel_is_point: bool,
) -> Result<GeoTransform> {
    let mut transform = match decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        Ok(m) if m.len() >= 8 => GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]),
        _ => {
            let scale = decoder
                .get_tag_f64_vec(Tag::ModelPixelScaleTag)
                .map_err(|_| Error::Other("No pixel scale tag".into()))?;
            let tiepoint = decoder
                .get_tag_f64_vec(Tag::ModelTiepointTag)
                .map_err(|_| Error::Other("No tiepoint tag".into()))?;

            if scale.len() < 2 || tiepoint.len() < 6 {
                return Err(Error::Other("Cannot determine geotransform".into()));
            }

            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])
        }
    };

    if pixel_is_point {
        transform.origin_x -= 0.5 * transform.pixel_width;
        transform.origin_y -= 0.5 * transform.pixel_height;
    }

    Ok(transform)
}

/// Inline value of a GeoKey, `None` when absent or stored out of line
fn geokey_value(keys: &[u16], id: u16) -> Option<u16> {
    let count = *keys.get(3)? as usize;
    keys.get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == id && entry[1] == 0)
        .map(|entry| entry[3])
}

fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    [PROJECTED_CS_TYPE, GEOGRAPHIC_TYPE]
        .iter()
        .filter_map(|&id| geokey_value(keys, id))
        .find(|&code| code != 0 && code != USER_DEFINED)
        .map(u32::from)
}

fn is_geographic(epsg: u32) -> bool {
    matches!(epsg, 4326 | 4258)
}

/// Write a Raster to a single-band float32 GeoTIFF file
///
/// The EPSG code (when known) and the no-data value are written as GeoKeys
/// and GDAL_NODATA respectively.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let geokeys = geokey_directory(raster.crs().and_then(|c| c.epsg()));
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    if let Some(nodata) = raster.nodata().and_then(|nd| nd.to_f64()) {
        let text = if nodata.is_nan() {
            "nan".to_string()
        } else {
            nodata.to_string()
        };
        image
            .encoder()
            .write_tag(Tag::GdalNodata, text.as_str())
            .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

fn geokey_directory(epsg: Option<u32>) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    let model = match epsg {
        Some(code) if is_geographic(code) => 2,
        _ => 1,
    };
    keys.push([GT_MODEL_TYPE, 0, 1, model]);
    // RasterPixelIsArea
    keys.push([GT_RASTER_TYPE, 0, 1, 1]);
    if let Some(code) = epsg.and_then(|c| u16::try_from(c).ok()) {
        let id = if is_geographic(u32::from(code)) {
            GEOGRAPHIC_TYPE
        } else {
            PROJECTED_CS_TYPE
        };
        keys.push([id, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_read_roundtrip() {
        let mut raster: Raster<f64> = Raster::new(20, 30);
        raster.set_transform(GeoTransform::new(400_000.0, 6_200_000.0, 100.0, -100.0));
        raster.set_crs(Some(CRS::from_epsg(25832)));
        raster.set_nodata(Some(-9999.0));

        for i in 0..20 {
            for j in 0..30 {
                raster.set(i, j, (i * 30 + j) as f64).unwrap();
            }
        }
        raster.set(3, 4, -9999.0).unwrap();

        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path()).unwrap();

        let loaded: Raster<f64> = read_geotiff(tmp.path(), None).unwrap();

        assert_eq!(loaded.shape(), raster.shape());
        assert_eq!(loaded.get(10, 12).unwrap(), raster.get(10, 12).unwrap());
        assert_eq!(loaded.transform(), raster.transform());
        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(25832));
        assert_eq!(loaded.nodata(), Some(-9999.0));
        assert!(!loaded.is_defined_at(3, 4).unwrap());
    }

    #[test]
    fn test_geographic_crs_roundtrip() {
        let mut raster: Raster<f32> = Raster::filled(4, 4, 250.0);
        raster.set_transform(GeoTransform::new(7.0, 58.0, 0.25, -0.25));
        raster.set_crs(Some(CRS::wgs84()));

        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path()).unwrap();
        let loaded: Raster<f32> = read_geotiff(tmp.path(), Some(1)).unwrap();

        assert_eq!(loaded.crs().and_then(|c| c.epsg()), Some(4326));
        assert_eq!(loaded.nodata(), None);
    }

    #[test]
    fn test_missing_file_is_data_access_error() {
        let err = read_geotiff::<f64, _>("/nonexistent/bathymetry.tif", None).unwrap_err();
        assert!(matches!(err, Error::DataAccess { .. }));
    }

    #[test]
    fn test_band_out_of_range() {
        let raster: Raster<f64> = Raster::filled(2, 2, 1.0);
        let tmp = NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path()).unwrap();
        assert!(read_geotiff::<f64, _>(tmp.path(), Some(2)).is_err());
    }

    #[test]
    fn test_geokey_parsing() {
        let keys = geokey_directory(Some(3035));
        assert_eq!(epsg_from_geokeys(&keys), Some(3035));
        assert_eq!(geokey_value(&keys, GT_MODEL_TYPE), Some(1));

        let keys = geokey_directory(None);
        assert_eq!(epsg_from_geokeys(&keys), None);

        let user_defined = vec![1, 1, 0, 1, PROJECTED_CS_TYPE, 0, 1, USER_DEFINED];
        assert_eq!(epsg_from_geokeys(&user_defined), None);
    }
}
