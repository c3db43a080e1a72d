//! Card composition: canvas fill, title, favicon, description.

use crate::color::{parse_css_color, ResolvedPalette};
use crate::favicon::FaviconBitmap;
use crate::rendering::{
    truncate_and_wrap, wrap_text, Canvas, FontBook, FontFace, FontSpec, TextAlign, TextBox,
    WEIGHT_BOLD, WEIGHT_NORMAL,
};
use crate::{Error, Result};
use image::{imageops, Rgba, RgbaImage};
use log::debug;

/// Fixed card geometry and typography.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub width: u32,
    pub height: u32,
    /// Side of the square favicon slot, centered in the card
    pub icon_size: u32,
    /// Baseline of the first title line
    pub title_y: f32,
    /// Shared by title and description
    pub max_text_width: f32,
    pub title_line_height: f32,
    pub title_font: FontSpec,
    /// Description baseline sits this far above the bottom edge
    pub description_offset: f32,
    pub description_line_height: f32,
    pub description_font: FontSpec,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            icon_size: 100,
            title_y: 150.0,
            max_text_width: 460.0,
            title_line_height: 40.0,
            title_font: FontSpec::new("Arial", WEIGHT_BOLD, 30.0),
            description_offset: 150.0,
            description_line_height: 30.0,
            description_font: FontSpec::new("Arial", WEIGHT_NORMAL, 20.0),
        }
    }
}

impl CardLayout {
    fn center_x(&self) -> f32 {
        self.width as f32 / 2.0
    }

    pub fn title_box(&self) -> TextBox {
        TextBox {
            x: self.center_x(),
            y: self.title_y,
            max_width: self.max_text_width,
            line_height: self.title_line_height,
        }
    }

    pub fn description_box(&self) -> TextBox {
        TextBox {
            x: self.center_x(),
            y: self.height as f32 - self.description_offset,
            max_width: self.max_text_width,
            line_height: self.description_line_height,
        }
    }

    /// Top-left corner of the favicon slot.
    pub fn icon_origin(&self) -> (i64, i64) {
        (
            (self.width as i64 - self.icon_size as i64) / 2,
            (self.height as i64 - self.icon_size as i64) / 2,
        )
    }
}

/// Faces used for the title and the description.
#[derive(Debug)]
pub struct CardFonts {
    pub title: FontFace,
    pub description: FontFace,
}

impl CardFonts {
    pub fn load(book: &FontBook, layout: &CardLayout) -> Result<Self> {
        Ok(Self {
            title: book.face(&layout.title_font)?,
            description: book.face(&layout.description_font)?,
        })
    }
}

/// A finished card raster.
#[derive(Debug, Clone)]
pub struct Card {
    canvas: Canvas,
}

impl Card {
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn image(&self) -> &RgbaImage {
        self.canvas.image()
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.canvas.to_png()
    }

    /// `data:image/png;base64,...`
    pub fn to_data_url(&self) -> Result<String> {
        self.canvas.to_data_url()
    }
}

fn paint(color: &str) -> Result<Rgba<u8>> {
    parse_css_color(color).ok_or_else(|| Error::RenderError(format!("unpaintable color '{}'", color)))
}

/// Compose a card from extracted signals.
///
/// Steps, in order: fill with `palette.main`, truncate-and-wrap the title in
/// `palette.header`, draw the favicon centered, wrap the description in
/// `palette.anchor`. A favicon of the wrong size is resized to the icon slot.
pub fn compose_card(
    layout: &CardLayout,
    fonts: &CardFonts,
    title: &str,
    description: &str,
    palette: &ResolvedPalette,
    favicon: &FaviconBitmap,
) -> Result<Card> {
    let mut canvas = Canvas::new(layout.width, layout.height);
    canvas.fill_rect(0, 0, layout.width, layout.height, paint(&palette.main)?);

    let header = paint(&palette.header)?;
    let title_lines = truncate_and_wrap(&fonts.title, title, layout.title_box());
    for line in &title_lines {
        canvas.fill_text(&fonts.title, &line.text, line.x, line.y, TextAlign::Center, header);
    }

    let (icon_x, icon_y) = layout.icon_origin();
    if favicon.dimensions() == (layout.icon_size, layout.icon_size) {
        canvas.draw_image(favicon, icon_x, icon_y);
    } else {
        let resized = imageops::resize(
            favicon,
            layout.icon_size,
            layout.icon_size,
            imageops::FilterType::Lanczos3,
        );
        canvas.draw_image(&resized, icon_x, icon_y);
    }

    let anchor = paint(&palette.anchor)?;
    let description_lines = wrap_text(&fonts.description, description, layout.description_box());
    for line in &description_lines {
        canvas.fill_text(&fonts.description, &line.text, line.x, line.y, TextAlign::Center, anchor);
    }

    debug!(
        "composed {}x{} card: {} title lines, {} description lines",
        layout.width,
        layout.height,
        title_lines.len(),
        description_lines.len()
    );
    Ok(Card { canvas })
}
