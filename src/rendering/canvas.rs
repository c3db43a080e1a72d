//! Minimal 2D canvas over an RGBA buffer.

use crate::rendering::font::FontFace;
use crate::rendering::layout::TextMeasure;
use crate::{Error, Result};
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};
use rusttype::point;
use std::io::Cursor;

/// Horizontal anchoring of `fill_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// A drawable raster. Starts fully transparent.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
}

/// Source-over blend of `src`, scaled by `coverage`, onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = (src.0[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for i in 0..3 {
        let c = (src.0[i] as f32 * sa + dst.0[i] as f32 * da * (1.0 - sa)) / out_a;
        dst.0[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Fill a rectangle, clipped to the canvas.
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x + width as i64).clamp(0, self.width() as i64) as u32;
        let y1 = (y + height as i64).clamp(0, self.height() as i64) as u32;
        for py in y0..y1 {
            for px in x0..x1 {
                blend(self.pixels.get_pixel_mut(px, py), color, 1.0);
            }
        }
    }

    /// Paint `text` with its alphabetic baseline at `y`.
    pub fn fill_text(
        &mut self,
        face: &FontFace,
        text: &str,
        x: f32,
        y: f32,
        align: TextAlign,
        color: Rgba<u8>,
    ) {
        if text.is_empty() {
            return;
        }
        let start_x = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - face.measure(text) / 2.0,
        };

        let (w, h) = (self.width() as i32, self.height() as i32);
        for glyph in face.font().layout(text, face.scale(), point(start_x, y)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            let pixels = &mut self.pixels;
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || px >= w || py >= h {
                    return;
                }
                blend(pixels.get_pixel_mut(px as u32, py as u32), color, coverage);
            });
        }
    }

    /// Composite `image` with its top-left corner at (`x`, `y`).
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        for (ix, iy, src) in image.enumerate_pixels() {
            let px = x + ix as i64;
            let py = y + iy as i64;
            if px < 0 || py < 0 || px >= self.width() as i64 || py >= self.height() as i64 {
                continue;
            }
            blend(self.pixels.get_pixel_mut(px as u32, py as u32), *src, 1.0);
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| Error::RenderError(format!("PNG encoding failed: {}", e)))?;
        Ok(buf)
    }

    /// PNG bytes as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> Result<String> {
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(self.to_png()?)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_is_clipped() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_rect(-5, -5, 8, 8, Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.image().get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(canvas.image().get_pixel(3, 3).0, [0, 0, 0, 0]);
    }

    fn painted_columns(canvas: &Canvas) -> Vec<u32> {
        (0..canvas.width())
            .filter(|&x| (0..canvas.height()).any(|y| canvas.image().get_pixel(x, y).0[3] > 0))
            .collect()
    }

    #[test]
    fn text_alignment_anchors_at_x() {
        let face = crate::rendering::FontBook::load(&[])
            .and_then(|book| book.face(&crate::rendering::FontSpec::new("Arial", 400, 20.0)));
        let Ok(face) = face else {
            eprintln!("Skipping canvas text test: no system fonts installed");
            return;
        };
        let black = Rgba([0, 0, 0, 255]);

        let mut left = Canvas::new(200, 40);
        left.fill_text(&face, "HHHH", 100.0, 30.0, TextAlign::Left, black);
        let cols = painted_columns(&left);
        assert!(!cols.is_empty());
        assert!(cols[0] >= 98, "left-aligned text starts at x: {:?}", cols.first());

        let mut center = Canvas::new(200, 40);
        center.fill_text(&face, "HHHH", 100.0, 30.0, TextAlign::Center, black);
        let cols = painted_columns(&center);
        let (first, last) = (cols[0], cols[cols.len() - 1]);
        assert!(first < 100 && last > 100);
        assert!(((first + last) as i64 / 2 - 100).abs() <= 3);
    }

    #[test]
    fn transparent_pixels_leave_background() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(0, 0, 4, 4, Rgba([10, 20, 30, 255]));
        let mut overlay = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        overlay.put_pixel(0, 0, Rgba([200, 0, 0, 255]));
        canvas.draw_image(&overlay, 1, 1);
        assert_eq!(canvas.image().get_pixel(1, 1).0, [200, 0, 0, 255]);
        assert_eq!(canvas.image().get_pixel(2, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn half_alpha_blends() {
        let mut canvas = Canvas::new(1, 1);
        canvas.fill_rect(0, 0, 1, 1, Rgba([0, 0, 0, 255]));
        canvas.fill_rect(0, 0, 1, 1, Rgba([255, 255, 255, 128]));
        let px = canvas.image().get_pixel(0, 0).0;
        assert!((127..=129).contains(&px[0]));
        assert_eq!(px[3], 255);
    }

    #[test]
    fn data_url_round_trips_through_png() {
        let mut canvas = Canvas::new(3, 2);
        canvas.fill_rect(0, 0, 3, 2, Rgba([1, 2, 3, 255]));
        let url = canvas.to_data_url().unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [1, 2, 3, 255]);
    }
}
