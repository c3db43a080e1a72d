//! Font discovery and glyph metrics.
//!
//! Faces are looked up by family and weight with `fontdb` and rasterized with
//! `rusttype`. Sizes are CSS pixels, i.e. the em size, not the line height.

use crate::rendering::layout::TextMeasure;
use crate::{Error, Result};
use log::{debug, warn};
use rusttype::{Font, Scale};
use std::path::PathBuf;

/// Regular weight (CSS `normal`).
pub const WEIGHT_NORMAL: u16 = 400;
/// Bold weight (CSS `bold`).
pub const WEIGHT_BOLD: u16 = 700;

/// A CSS-like font request such as `bold 30px Arial`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16,
    pub size_px: f32,
}

impl FontSpec {
    pub fn new(family: &str, weight: u16, size_px: f32) -> Self {
        Self {
            family: family.to_string(),
            weight,
            size_px,
        }
    }
}

/// A loaded face at a fixed pixel size.
pub struct FontFace {
    font: Font<'static>,
    scale: Scale,
    size_px: f32,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("size_px", &self.size_px)
            .finish()
    }
}

impl FontFace {
    /// Build a face from raw font bytes (`index` selects a face in a collection).
    pub fn from_bytes(data: Vec<u8>, index: u32, size_px: f32) -> Result<Self> {
        let font = Font::try_from_vec_and_index(data, index)
            .ok_or_else(|| Error::RenderError("unparseable font data".into()))?;
        Ok(Self::with_font(font, size_px))
    }

    fn with_font(font: Font<'static>, size_px: f32) -> Self {
        let units_per_em = font.units_per_em().max(1) as f32;
        let v = font.v_metrics_unscaled();
        // rusttype scales by line height (ascent - descent); convert from em
        let height = size_px * (v.ascent - v.descent) / units_per_em;
        Self {
            font,
            scale: Scale::uniform(height),
            size_px,
        }
    }

    pub fn font(&self) -> &Font<'static> {
        &self.font
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }
}

impl TextMeasure for FontFace {
    /// Advance width including kerning, like canvas `measureText().width`.
    fn measure(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars() {
            let glyph = self.font.glyph(ch).scaled(self.scale);
            if let Some(prev) = previous {
                width += self.font.pair_kerning(self.scale, prev, glyph.id());
            }
            width += glyph.h_metrics().advance_width;
            previous = Some(glyph.id());
        }
        width
    }
}

/// Font lookup across user-supplied font files and installed system fonts.
pub struct FontBook {
    extra: fontdb::Database,
    system: fontdb::Database,
}

impl FontBook {
    /// Index `extra_files` and all system fonts. Extra files win over system
    /// faces regardless of family name.
    pub fn load(extra_files: &[PathBuf]) -> Result<Self> {
        let mut extra = fontdb::Database::new();
        for path in extra_files {
            extra.load_font_file(path).map_err(|e| {
                Error::ConfigError(format!("Failed to load font {}: {}", path.display(), e))
            })?;
        }

        let mut system = fontdb::Database::new();
        system.load_system_fonts();
        debug!(
            "font book: {} extra faces, {} system faces",
            extra.len(),
            system.len()
        );
        if extra.is_empty() && system.is_empty() {
            return Err(Error::ConfigError(
                "no fonts available; install a system font or pass a font file".into(),
            ));
        }
        Ok(Self { extra, system })
    }

    /// Resolve `spec` to a face: the closest-weight extra face if any were
    /// supplied, otherwise the requested family, then any sans-serif, then
    /// whatever the system has.
    pub fn face(&self, spec: &FontSpec) -> Result<FontFace> {
        if let Some(id) = closest_weight(&self.extra, spec.weight) {
            return load_face(&self.extra, id, spec.size_px);
        }

        let families = [
            fontdb::Family::Name(&spec.family),
            fontdb::Family::SansSerif,
        ];
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(spec.weight),
            ..fontdb::Query::default()
        };
        let id = match self.system.query(&query) {
            Some(id) => id,
            None => {
                warn!(
                    "no face for family '{}'; falling back to the closest weight available",
                    spec.family
                );
                closest_weight(&self.system, spec.weight)
                    .ok_or_else(|| Error::RenderError("no fonts available".into()))?
            }
        };
        load_face(&self.system, id, spec.size_px)
    }
}

fn closest_weight(db: &fontdb::Database, weight: u16) -> Option<fontdb::ID> {
    db.faces()
        .min_by_key(|f| (f.weight.0 as i32 - weight as i32).abs())
        .map(|f| f.id)
}

fn load_face(db: &fontdb::Database, id: fontdb::ID, size_px: f32) -> Result<FontFace> {
    db.with_face_data(id, |data, index| {
        FontFace::from_bytes(data.to_vec(), index, size_px)
    })
    .ok_or_else(|| Error::RenderError("font data unavailable".into()))?
}
