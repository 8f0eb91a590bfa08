//! Map figures
//!
//! A figure is an opaque RGBA canvas with a plot area showing a world extent
//! at a uniform scale, a title band above it and a colorbar strip on the
//! right. Overlays are stroked and filled with `tiny-skia`; text is set in
//! the embedded DejaVu Sans through `imageproc`.

use crate::png::{encode_png, RenderError};
use crate::render::ColormapParams;
use crate::scheme::{evaluate, Rgb};
use geo_types::{LineString, MultiPolygon, Point};
use havvind_core::raster::{Raster, RasterElement};
use image::{ImageBuffer, Rgba};
use imageproc::drawing::draw_text_mut;
use rusttype::{point, Font, Scale};
use std::path::Path;
use tiny_skia::{FillRule, LineCap, LineJoin, Mask, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::warn;

const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const MARGIN: f64 = 0.06;
const COLORBAR_STRIP: f64 = 0.14;
/// Text heights as fractions of the figure height
const TITLE_SIZE: f32 = 0.03;
const LABEL_SIZE: f32 = 0.018;
const OVERLAY_WIDTH: f32 = 2.0;
const TICK_LENGTH: f32 = 6.0;
/// World extent (min_x, min_y, max_x, max_y)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Left edge
    pub min_x: f64,
    /// Bottom edge
    pub min_y: f64,
    /// Right edge
    pub max_x: f64,
    /// Top edge
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    fn is_valid(&self) -> bool {
        self.width().is_finite() && self.height().is_finite() && self.width() > 0.0 && self.height() > 0.0
    }
}

impl From<(f64, f64, f64, f64)> for Extent {
    fn from((min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

/// Pixel rectangle, right and bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq)]
struct PixelRect {
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
}

impl PixelRect {
    fn to_rect(self) -> Option<Rect> {
        Rect::from_ltrb(self.left as f32, self.top as f32, self.right as f32, self.bottom as f32)
    }

    /// Rectangle through the centres of the edge pixels, for 1 px outlines
    fn inset_half(self) -> Option<Rect> {
        Rect::from_ltrb(
            self.left as f32 + 0.5,
            self.top as f32 + 0.5,
            self.right as f32 - 0.5,
            self.bottom as f32 - 0.5,
        )
    }
}

fn solid(color: Rgb, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = anti_alias;
    paint
}

/// Clip mask covering `area`
fn clip_mask(width: u32, height: u32, area: PixelRect) -> Result<Mask, RenderError> {
    let invalid = || RenderError::InvalidFigure(format!("empty plot area in {width}x{height} figure"));
    let mut mask = Mask::new(width, height).ok_or_else(invalid)?;
    let rect = area.to_rect().ok_or_else(invalid)?;
    mask.fill_path(&PathBuilder::from_rect(rect), FillRule::Winding, false, Transform::identity());
    Ok(mask)
}

/// Label for a colorbar tick, with fewer decimals for larger values
fn tick_label(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 100.0 {
        format!("{value:.0}")
    } else if magnitude >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

/// A fixed-size RGBA map canvas
pub struct Figure {
    /// Opaque RGBA pixels
    canvas: Pixmap,
    /// World area shown in the plot
    extent: Extent,
    /// Pixels per world unit
    scale: f64,
    /// Pixel position of the extent's upper-left corner
    origin: (f64, f64),
    /// Pixels covered by the extent
    plot: PixelRect,
    /// Colorbar strip right of the plot
    colorbar: PixelRect,
    /// Overlays never leave the plot area
    plot_clip: Mask,
    /// `None` when the embedded font fails to parse; text is then skipped
    font: Option<Font<'static>>,
}

impl Figure {
    /// Create a white canvas showing `extent` with preserved aspect ratio
    pub fn new(width: usize, height: usize, extent: impl Into<Extent>) -> Result<Self, RenderError> {
        let extent = extent.into();
        if width < 16 || height < 16 {
            return Err(RenderError::InvalidFigure(format!("size {width}x{height} is too small")));
        }
        if !extent.is_valid() {
            return Err(RenderError::InvalidFigure(format!("degenerate extent {extent:?}")));
        }
        let too_large = || RenderError::InvalidFigure(format!("size {width}x{height} is too large"));
        let canvas_w = u32::try_from(width).map_err(|_| too_large())?;
        let canvas_h = u32::try_from(height).map_err(|_| too_large())?;

        let (w, h) = (width as f64, height as f64);
        let left = w * MARGIN;
        let top = h * MARGIN;
        let avail_w = w * (1.0 - 2.0 * MARGIN - COLORBAR_STRIP);
        let avail_h = h * (1.0 - 2.0 * MARGIN);

        let scale = (avail_w / extent.width()).min(avail_h / extent.height());
        let used_w = extent.width() * scale;
        let used_h = extent.height() * scale;
        let origin = (left + (avail_w - used_w) / 2.0, top + (avail_h - used_h) / 2.0);

        let plot = PixelRect {
            left: origin.0.floor() as usize,
            top: origin.1.floor() as usize,
            right: ((origin.0 + used_w).ceil() as usize).min(width),
            bottom: ((origin.1 + used_h).ceil() as usize).min(height),
        };
        let bar_left = (w * (1.0 - MARGIN - COLORBAR_STRIP / 2.0)) as usize;
        let colorbar = PixelRect {
            left: bar_left,
            top: (top + avail_h * 0.1) as usize,
            right: (bar_left + (w * 0.025).max(4.0) as usize).min(width),
            bottom: (top + avail_h * 0.9) as usize,
        };

        let mut canvas = Pixmap::new(canvas_w, canvas_h).ok_or_else(too_large)?;
        canvas.fill(tiny_skia::Color::WHITE);
        let plot_clip = clip_mask(canvas_w, canvas_h, plot)?;

        let font = Font::try_from_bytes(FONT_DATA);
        if font.is_none() {
            warn!("embedded font failed to parse, figure text is skipped");
        }

        Ok(Self {
            canvas,
            extent,
            scale,
            origin,
            plot,
            colorbar,
            plot_clip,
            font,
        })
    }

    pub fn width(&self) -> usize {
        self.canvas.width() as usize
    }

    pub fn height(&self) -> usize {
        self.canvas.height() as usize
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// RGBA pixels, row-major.
    ///
    /// The canvas is opaque, so premultiplied and straight alpha agree.
    pub fn pixels(&self) -> &[u8] {
        self.canvas.data()
    }

    /// RGBA of the pixel at (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let i = (y * self.width() + x) * 4;
        let data = self.canvas.data();
        Some([data[i], data[i + 1], data[i + 2], data[i + 3]])
    }

    /// Continuous pixel position of a world coordinate
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.origin.0 + (x - self.extent.min_x) * self.scale,
            self.origin.1 + (self.extent.max_y - y) * self.scale,
        )
    }

    fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.extent.min_x + (px - self.origin.0) / self.scale,
            self.extent.max_y - (py - self.origin.1) / self.scale,
        )
    }

    fn put(&mut self, x: usize, y: usize, color: Rgb) {
        let i = (y * self.width() + x) * 4;
        self.canvas.data_mut()[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, 255]);
    }

    fn fill_rect(&mut self, rect: Option<Rect>, color: Rgb) {
        if let Some(rect) = rect {
            self.canvas.fill_rect(rect, &solid(color, false), Transform::identity(), None);
        }
    }

    /// Paint the whole plot area, e.g. as a land background
    pub fn fill_plot(&mut self, color: Rgb) {
        self.fill_rect(self.plot.to_rect(), color);
    }

    /// Draw a raster into the plot area.
    ///
    /// Each figure pixel takes the color of the raster cell under its centre;
    /// no-data cells leave the canvas untouched.
    pub fn draw_raster<T: RasterElement>(&mut self, raster: &Raster<T>, params: &ColormapParams) {
        let p = self.plot;
        for py in p.top..p.bottom {
            for px in p.left..p.right {
                let (x, y) = self.pixel_to_world(px as f64 + 0.5, py as f64 + 0.5);
                let Some((row, col)) = raster.cell_at(x, y) else {
                    continue;
                };
                let Ok(value) = raster.get(row, col) else {
                    continue;
                };
                if raster.is_nodata(value) {
                    continue;
                }
                if let Some(color) = value.to_f64().and_then(|v| params.color_of(v)) {
                    self.put(px, py, color);
                }
            }
        }
    }

    /// Draw points as filled discs of `radius` pixels
    pub fn draw_points(&mut self, points: &[Point<f64>], radius: f64, color: Rgb) {
        let radius = radius.max(0.5) as f32;
        let mut pb = PathBuilder::new();
        for point in points {
            let (x, y) = self.world_to_pixel(point.x(), point.y());
            if x.is_finite() && y.is_finite() {
                pb.push_circle(x as f32, y as f32, radius);
            }
        }
        if let Some(path) = pb.finish() {
            self.canvas.fill_path(
                &path,
                &solid(color, true),
                FillRule::Winding,
                Transform::identity(),
                Some(&self.plot_clip),
            );
        }
    }

    /// Draw line strings
    pub fn draw_lines(&mut self, lines: &[LineString<f64>], color: Rgb) {
        let mut pb = PathBuilder::new();
        for line in lines {
            self.trace(&mut pb, line, false);
        }
        self.stroke_overlay(pb, color);
    }

    /// Draw the exterior and interior rings of every polygon
    pub fn draw_outline(&mut self, geometry: &MultiPolygon<f64>, color: Rgb) {
        let mut pb = PathBuilder::new();
        for polygon in geometry {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                self.trace(&mut pb, ring, true);
            }
        }
        self.stroke_overlay(pb, color);
    }

    /// Append a line string in pixel space; non-finite vertices break the line
    fn trace(&self, pb: &mut PathBuilder, line: &LineString<f64>, close: bool) {
        let mut open = false;
        for c in line.coords() {
            let (x, y) = self.world_to_pixel(c.x, c.y);
            if !(x.is_finite() && y.is_finite()) {
                open = false;
                continue;
            }
            if open {
                pb.line_to(x as f32, y as f32);
            } else {
                pb.move_to(x as f32, y as f32);
                open = true;
            }
        }
        if close && open {
            pb.close();
        }
    }

    fn stroke_overlay(&mut self, pb: PathBuilder, color: Rgb) {
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width: OVERLAY_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.canvas.stroke_path(
            &path,
            &solid(color, true),
            &stroke,
            Transform::identity(),
            Some(&self.plot_clip),
        );
    }

    /// One pixel black outline along the inside of `rect`
    fn outline(&mut self, rect: Option<Rect>) {
        let Some(rect) = rect else {
            return;
        };
        let stroke = Stroke { width: 1.0, ..Stroke::default() };
        self.canvas.stroke_path(
            &PathBuilder::from_rect(rect),
            &solid(Rgb::BLACK, false),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Black frame around the plot area
    pub fn draw_frame(&mut self) {
        self.outline(self.plot.inset_half());
    }

    /// Width and height in pixels of `text` at `size` px
    fn text_extent(&self, text: &str, size: f32) -> (i32, i32) {
        let Some(font) = self.font.as_ref() else {
            return (0, 0);
        };
        let width = font
            .layout(text, Scale::uniform(size), point(0.0, 0.0))
            .filter_map(|glyph| glyph.pixel_bounding_box())
            .map(|bb| bb.max.x)
            .max()
            .unwrap_or(0);
        (width, size.ceil() as i32)
    }

    /// Draw `text` with its top-left corner at pixel (x, y)
    fn draw_text(&mut self, text: &str, x: i32, y: i32, size: f32) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let (w, h) = (self.canvas.width(), self.canvas.height());
        let Some(mut image) = ImageBuffer::<Rgba<u8>, &mut [u8]>::from_raw(w, h, self.canvas.data_mut()) else {
            return;
        };
        draw_text_mut(&mut image, Rgba([0, 0, 0, 255]), x, y, Scale::uniform(size), font, text);
    }

    fn label_size(&self) -> f32 {
        (self.height() as f32 * LABEL_SIZE).max(8.0)
    }

    /// Title centred over the plot area, inside the top margin
    pub fn draw_title(&mut self, title: &str) {
        let size = (self.height() as f32 * TITLE_SIZE).max(8.0);
        let (text_w, text_h) = self.text_extent(title, size);
        let p = self.plot;
        let centre = (p.left + p.right) as i32 / 2;
        let x = (centre - text_w / 2).max(0);
        let y = ((p.top as i32 - text_h) / 2).max(0);
        self.draw_text(title, x, y, size);
    }

    /// Vertical colorbar, maximum at the top.
    ///
    /// Continuous schemes get five ticks labelled with their values.
    /// Categorical schemes are drawn as one block per class with separators;
    /// their blocks are named with [`Figure::label_classes`].
    pub fn draw_colorbar(&mut self, params: &ColormapParams) {
        let bar = self.colorbar;
        let span = (bar.bottom - bar.top).max(1) as f64;
        let classes = params.scheme.classes();

        for y in bar.top..bar.bottom {
            let t = 1.0 - (y - bar.top) as f64 / span;
            let color = evaluate(params.scheme, t.clamp(0.0, 1.0 - f64::EPSILON));
            let row = Rect::from_xywh(bar.left as f32, y as f32, (bar.right - bar.left) as f32, 1.0);
            self.fill_rect(row, color);
        }

        let divisions = classes.unwrap_or(4);
        let mut ticks = PathBuilder::new();
        let mut labels = Vec::new();
        for i in 0..=divisions {
            let y = (bar.top as f64 + span * i as f64 / divisions as f64).round() as f32;
            let y = y.min(bar.bottom as f32 - 1.0) + 0.5;
            if classes.is_some() {
                ticks.move_to(bar.left as f32, y);
                ticks.line_to(bar.right as f32, y);
            } else {
                ticks.move_to(bar.right as f32, y);
                ticks.line_to(bar.right as f32 + TICK_LENGTH, y);
                let value = params.max - (params.max - params.min) * i as f64 / divisions as f64;
                labels.push((tick_label(value), y));
            }
        }
        if let Some(path) = ticks.finish() {
            let stroke = Stroke { width: 1.0, ..Stroke::default() };
            self.canvas.stroke_path(&path, &solid(Rgb::BLACK, false), &stroke, Transform::identity(), None);
        }
        self.outline(bar.inset_half());

        let size = self.label_size();
        let x = bar.right as i32 + TICK_LENGTH as i32 + 4;
        for (label, y) in labels {
            self.draw_text(&label, x, y as i32 - size as i32 / 2, size);
        }
    }

    /// Name the blocks of a categorical colorbar, first label on the
    /// lowest block
    pub fn label_classes<S: AsRef<str>>(&mut self, labels: &[S]) {
        if labels.is_empty() {
            return;
        }
        let bar = self.colorbar;
        let block = (bar.bottom - bar.top) as f64 / labels.len() as f64;
        let size = self.label_size();
        let x = bar.right as i32 + 4;
        for (k, label) in labels.iter().enumerate() {
            let centre = bar.bottom as f64 - block * (k as f64 + 0.5);
            self.draw_text(label.as_ref(), x, centre as i32 - size as i32 / 2, size);
        }
    }

    /// Encode the canvas as PNG with the given resolution
    pub fn to_png(&self, dpi: u32) -> Result<Vec<u8>, RenderError> {
        encode_png(self.pixels(), self.width(), self.height(), dpi)
    }

    /// Write the canvas to a PNG file
    pub fn save<P: AsRef<Path>>(&self, path: P, dpi: u32) -> Result<(), RenderError> {
        let png = self.to_png(dpi)?;
        std::fs::write(path, png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::ColorScheme;
    use geo_types::Polygon;
    use havvind_core::GeoTransform;

    fn figure() -> Figure {
        Figure::new(400, 300, (0.0, 0.0, 1000.0, 1000.0)).unwrap()
    }

    #[test]
    fn test_square_extent_keeps_aspect() {
        let fig = figure();
        let (x0, y0) = fig.world_to_pixel(0.0, 1000.0);
        let (x1, y1) = fig.world_to_pixel(1000.0, 0.0);
        assert!(((x1 - x0) - (y1 - y0)).abs() < 1e-9);
        assert!(x0 >= 0.0 && y0 >= 0.0 && x1 <= 400.0 && y1 <= 300.0);
    }

    #[test]
    fn test_draw_raster_respects_nodata() {
        let mut r = Raster::from_vec(vec![1.0, f64::NAN, 3.0, 4.0], 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 1000.0, 500.0, -500.0));
        r.set_nodata(Some(f64::NAN));

        let mut fig = figure();
        let params = ColormapParams::with_range(ColorScheme::Wind, 0.0, 4.0);
        fig.draw_raster(&r, &params);

        let (px, py) = fig.world_to_pixel(250.0, 750.0);
        assert_eq!(fig.pixel(px as usize, py as usize), Some([59, 82, 139, 255]));
        // Undefined cell keeps the white background
        let (px, py) = fig.world_to_pixel(750.0, 750.0);
        assert_eq!(fig.pixel(px as usize, py as usize), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_points_and_outlines() {
        let mut fig = figure();
        let red = Rgb::new(255, 0, 0);
        fig.draw_points(&[Point::new(500.0, 500.0)], 3.0, red);
        let (px, py) = fig.world_to_pixel(500.0, 500.0);
        let [r, g, b, a] = fig.pixel(px as usize, py as usize).unwrap();
        assert_eq!((r, a), (255, 255));
        assert!(g < 64 && b < 64);

        let square = Polygon::new(
            LineString::from(vec![(100.0, 100.0), (900.0, 100.0), (900.0, 900.0), (100.0, 900.0), (100.0, 100.0)]),
            vec![],
        );
        let blue = Rgb::new(0, 0, 255);
        fig.draw_outline(&MultiPolygon::new(vec![square]), blue);
        let (px, py) = fig.world_to_pixel(500.0, 100.0);
        let [r, g, b, _] = fig.pixel(px as usize, py.floor() as usize).unwrap();
        assert_eq!(b, 255);
        assert!(r < 128 && g < 128);
        // Interior stays untouched
        let (px, py) = fig.world_to_pixel(500.0, 500.0);
        assert_eq!(fig.pixel(px as usize + 20, py as usize), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_lines_are_clipped_to_plot() {
        let mut fig = figure();
        let lane = LineString::from(vec![(-1.0e6, 500.0), (1.0e6, 500.0)]);
        fig.draw_lines(&[lane], Rgb::BLACK);
        // Nothing drawn left of the plot area
        assert_eq!(fig.pixel(0, 150), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_png_has_figure_size() {
        let mut fig = Figure::new(160, 120, (0.0, 0.0, 4.0, 3.0)).unwrap();
        fig.draw_colorbar(&ColormapParams::with_range(ColorScheme::DepthZones, 0.5, 4.5));
        fig.draw_frame();
        let png = fig.to_png(200).unwrap();
        assert_eq!(u32::from_be_bytes(png[16..20].try_into().unwrap()), 160);
        assert_eq!(u32::from_be_bytes(png[20..24].try_into().unwrap()), 120);
    }

    #[test]
    fn test_invalid_figures() {
        assert!(Figure::new(0, 100, (0.0, 0.0, 1.0, 1.0)).is_err());
        assert!(Figure::new(100, 100, (0.0, 0.0, 0.0, 1.0)).is_err());
        assert!(Figure::new(100, 100, (0.0, 0.0, f64::NAN, 1.0)).is_err());
    }

    /// Non-white pixels in columns `xs` and rows `ys`
    fn inked(fig: &Figure, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| fig.pixel(x, y) != Some([255, 255, 255, 255]))
            .count()
    }

    #[test]
    fn test_title_is_drawn_above_plot() {
        let mut fig = Figure::new(800, 600, (0.0, 0.0, 1000.0, 1000.0)).unwrap();
        let band = 0..fig.plot.top;
        assert_eq!(inked(&fig, 0..800, band.clone()), 0);

        fig.draw_title("Depth zones");
        assert!(inked(&fig, 0..800, band) > 50);
        // The plot area is left alone
        let p = fig.plot;
        assert_eq!(inked(&fig, p.left..p.right, p.top..p.bottom), 0);
    }

    #[test]
    fn test_continuous_colorbar_has_value_labels() {
        let mut fig = Figure::new(800, 600, (0.0, 0.0, 1000.0, 1000.0)).unwrap();
        fig.draw_colorbar(&ColormapParams::with_range(ColorScheme::Wind, 0.0, 800.0));
        let bar = fig.colorbar;
        let labels = bar.right + TICK_LENGTH as usize + 1..fig.width();
        assert!(inked(&fig, labels, bar.top.saturating_sub(10)..bar.bottom + 10) > 50);
    }

    #[test]
    fn test_class_labels_sit_beside_their_blocks() {
        let mut fig = Figure::new(800, 600, (0.0, 0.0, 1000.0, 1000.0)).unwrap();
        fig.draw_colorbar(&ColormapParams::with_range(ColorScheme::DepthZones, 0.5, 4.5));
        let bar = fig.colorbar;
        let beside = bar.right + 1..fig.width();
        // Categorical bars have no ticks, so nothing is written beside them yet
        assert_eq!(inked(&fig, beside.clone(), bar.top..bar.bottom), 0);

        fig.label_classes(&["0-10 m", "10-20 m", "20-30 m", "30-40 m"]);
        let block = (bar.bottom - bar.top) / 4;
        for k in 0..4 {
            let bottom = bar.bottom - block * k;
            assert!(inked(&fig, beside.clone(), bottom - block..bottom) > 20, "block {k}");
        }
    }

    #[test]
    fn test_tick_label_precision() {
        assert_eq!(tick_label(812.4), "812");
        assert_eq!(tick_label(12.34), "12.3");
        assert_eq!(tick_label(0.456), "0.46");
        assert_eq!(tick_label(-150.0), "-150");
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        figure().save(&path, 200).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
