//! PNG encoding for RGBA image data.
//!
//! Writes truecolor-with-alpha PNGs (color type 6) and records the print
//! resolution in a `pHYs` chunk.

use std::io::Write;
use thiserror::Error;

/// Errors while encoding or writing an image
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Pixel buffer has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid figure: {0}")]
    InvalidFigure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
const METRES_PER_INCH: f64 = 0.0254;

/// Pixels per metre for a resolution in dots per inch
pub(crate) fn pixels_per_metre(dpi: u32) -> u32 {
    (dpi as f64 / METRES_PER_INCH).round() as u32
}

/// Encode an RGBA buffer as a PNG with the given resolution.
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel, row-major)
/// - `width`, `height`: image size in pixels
/// - `dpi`: resolution stored in the `pHYs` chunk
pub fn encode_png(pixels: &[u8], width: usize, height: usize, dpi: u32) -> Result<Vec<u8>, RenderError> {
    let expected = width * height * 4;
    if pixels.len() != expected || width == 0 || height == 0 {
        return Err(RenderError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type (RGBA)
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr);

    let ppm = pixels_per_metre(dpi);
    let mut phys = Vec::with_capacity(9);
    phys.extend_from_slice(&ppm.to_be_bytes());
    phys.extend_from_slice(&ppm.to_be_bytes());
    phys.push(1); // unit: metre
    write_chunk(&mut png, b"pHYs", &phys);

    let idat = deflate_idat_rgba(pixels, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Scanlines with filter byte 0, zlib-compressed
fn deflate_idat_rgba(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let stride = width * 4;
    let mut encoder = flate2::write::ZlibEncoder::new(
        Vec::with_capacity(height * (1 + stride) / 4),
        flate2::Compression::default(),
    );
    for row in pixels.chunks_exact(stride) {
        encoder.write_all(&[0])?;
        encoder.write_all(row)?;
    }
    encoder.finish()
}
