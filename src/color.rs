//! Color normalization and palette resolution.
//!
//! Browsers report computed colors as `rgb(r, g, b)` / `rgba(r, g, b, a)`
//! strings. The card wants `#RRGGBB`, so [`normalize_color`] converts the
//! former and passes anything else through untouched. [`resolve_palette`]
//! then walks a short fallback chain per channel until it finds a value that
//! can actually be painted.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Last-resort card background.
pub const DEFAULT_MAIN: &str = "#ffffff";
/// Last-resort title color.
pub const DEFAULT_HEADER: &str = "#000000";
/// Last-resort description color.
pub const DEFAULT_ANCHOR: &str = "#555555";

/// Raw computed colors read from a rendered page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSample {
    /// Background of the first navbar-like element, if one exists
    pub navbar_background: Option<String>,
    /// Text color of the first heading-like child of the navbar
    pub header_text: Option<String>,
    /// Text color of the first link-like child of the navbar
    pub anchor_text: Option<String>,
    /// `body` background, always populated (falls back to white)
    pub body_background_color: String,
    /// `body` text color, always populated (falls back to light grey)
    pub body_text_color: String,
}

/// The three colors a card is painted with. Never contains an empty or
/// unpaintable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPalette {
    /// Canvas background
    pub main: String,
    /// Title text
    pub header: String,
    /// Description text
    pub anchor: String,
}

/// Convert a browser-reported color into `#RRGGBB`.
///
/// - `None` or `""` yields `None`.
/// - Anything starting with `rgb` has its digit runs extracted; the first
///   three become the channels. Fewer than three runs yields `None`.
/// - Every other string is returned unchanged (hex literals, named colors).
pub fn normalize_color(input: Option<&str>) -> Option<String> {
    let color = input.filter(|c| !c.is_empty())?;
    if !color.starts_with("rgb") {
        return Some(color.to_string());
    }

    let channels = digit_runs(color);
    if channels.len() < 3 {
        return None;
    }

    let mut hex = String::with_capacity(7);
    hex.push('#');
    for run in &channels[..3] {
        // Channels are not range-checked; out-of-range values produce a
        // longer string that the palette validator later rejects.
        let value: u128 = run.parse().ok()?;
        hex.push_str(&format!("{:02X}", value));
    }
    Some(hex)
}

fn digit_runs(s: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, ch) in s.char_indices() {
        match (ch.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(st)) => {
                runs.push(&s[st..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(st) = start {
        runs.push(&s[st..]);
    }
    runs
}

/// Return the first candidate that is present and accepted by `validate`.
///
/// Candidates are evaluated lazily, left to right.
pub fn first_valid<I, F>(candidates: I, validate: F) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
    F: Fn(&str) -> bool,
{
    candidates
        .into_iter()
        .find_map(|candidate| candidate.filter(|c| validate(c)))
}

/// Parse any CSS color token into an RGBA pixel.
pub fn parse_css_color(color: &str) -> Option<Rgba<u8>> {
    csscolorparser::parse(color.trim())
        .ok()
        .map(|c| Rgba(c.to_rgba8()))
}

/// Whether `color` can be used as a fill style.
pub fn is_paintable(color: &str) -> bool {
    parse_css_color(color).is_some()
}

fn resolve_channel(raw: [Option<&str>; 2], default: &str) -> String {
    first_valid(raw.into_iter().map(normalize_color), is_paintable)
        .unwrap_or_else(|| default.to_string())
}

/// Resolve the card palette from a page's color sample.
///
/// ```text
/// main   = navbarBackground -> bodyBackgroundColor -> #ffffff
/// header = headerText       -> bodyTextColor       -> #000000
/// anchor = anchorText       -> bodyTextColor       -> #555555
/// ```
pub fn resolve_palette(sample: &ColorSample) -> ResolvedPalette {
    ResolvedPalette {
        main: resolve_channel(
            [
                sample.navbar_background.as_deref(),
                Some(sample.body_background_color.as_str()),
            ],
            DEFAULT_MAIN,
        ),
        header: resolve_channel(
            [
                sample.header_text.as_deref(),
                Some(sample.body_text_color.as_str()),
            ],
            DEFAULT_HEADER,
        ),
        anchor: resolve_channel(
            [
                sample.anchor_text.as_deref(),
                Some(sample.body_text_color.as_str()),
            ],
            DEFAULT_ANCHOR,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_upper_hex(s: &str) -> bool {
        s.len() == 7
            && s.starts_with('#')
            && s[1..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }

    #[test]
    fn rgb_becomes_uppercase_hex() {
        assert_eq!(
            normalize_color(Some("rgb(0, 128, 255)")).as_deref(),
            Some("#0080FF")
        );
        assert_eq!(
            normalize_color(Some("rgb(10,20,30)")).as_deref(),
            Some("#0A141E")
        );
    }

    #[test]
    fn rgba_keeps_first_three_channels() {
        assert_eq!(
            normalize_color(Some("rgba(0, 0, 0, 0)")).as_deref(),
            Some("#000000")
        );
    }

    #[test]
    fn every_channel_value_pads_to_two_digits() {
        for v in [0u32, 1, 9, 15, 16, 127, 200, 255] {
            let input = format!("rgb({v}, {v}, {v})");
            let out = normalize_color(Some(&input)).unwrap();
            assert!(is_upper_hex(&out), "{out}");
            assert_eq!(&out[1..3], format!("{:02X}", v));
        }
    }

    #[test]
    fn missing_or_short_input_is_none() {
        assert_eq!(normalize_color(None), None);
        assert_eq!(normalize_color(Some("")), None);
        assert_eq!(normalize_color(Some("rgb(1, 2)")), None);
        assert_eq!(normalize_color(Some("rgb()")), None);
    }

    #[test]
    fn non_rgb_passes_through() {
        assert_eq!(normalize_color(Some("#abc")).as_deref(), Some("#abc"));
        assert_eq!(normalize_color(Some("teal")).as_deref(), Some("teal"));
        // prefix match is case-sensitive
        assert_eq!(
            normalize_color(Some("RGB(1,2,3)")).as_deref(),
            Some("RGB(1,2,3)")
        );
    }

    #[test]
    fn first_valid_short_circuits_left_to_right() {
        let picked = first_valid(
            vec![None, Some("nope".to_string()), Some("#111111".to_string())],
            is_paintable,
        );
        assert_eq!(picked.as_deref(), Some("#111111"));
        assert_eq!(first_valid(vec![None, None], is_paintable), None);
    }

    #[test]
    fn palette_prefers_navbar_colors() {
        let sample = ColorSample {
            navbar_background: Some("rgb(10, 20, 30)".into()),
            header_text: Some("rgb(255, 255, 255)".into()),
            anchor_text: Some("rgb(0, 0, 0)".into()),
            body_background_color: "rgb(1, 1, 1)".into(),
            body_text_color: "rgb(2, 2, 2)".into(),
        };
        let palette = resolve_palette(&sample);
        assert_eq!(palette.main, "#0A141E");
        assert_eq!(palette.header, "#FFFFFF");
        assert_eq!(palette.anchor, "#000000");
    }

    #[test]
    fn palette_falls_back_to_body() {
        let sample = ColorSample {
            body_background_color: "rgb(250, 250, 250)".into(),
            body_text_color: "rgb(17, 17, 17)".into(),
            ..Default::default()
        };
        let palette = resolve_palette(&sample);
        assert_eq!(
            palette,
            ResolvedPalette {
                main: normalize_color(Some("rgb(250, 250, 250)")).unwrap(),
                header: normalize_color(Some("rgb(17, 17, 17)")).unwrap(),
                anchor: normalize_color(Some("rgb(17, 17, 17)")).unwrap(),
            }
        );
    }

    #[test]
    fn palette_uses_hard_defaults_when_everything_is_missing() {
        let palette = resolve_palette(&ColorSample::default());
        assert_eq!(palette.main, "#ffffff");
        assert_eq!(palette.header, "#000000");
        assert_eq!(palette.anchor, "#555555");
    }

    #[test]
    fn palette_skips_unpaintable_values() {
        let sample = ColorSample {
            navbar_background: Some("rgb(300, 0, 0)".into()),
            header_text: Some("not-a-color".into()),
            body_background_color: "rgb(9, 9, 9)".into(),
            body_text_color: String::new(),
            ..Default::default()
        };
        let palette = resolve_palette(&sample);
        assert_eq!(palette.main, "#090909");
        assert_eq!(palette.header, "#000000");
        assert_eq!(palette.anchor, "#555555");
    }

    #[test]
    fn parse_handles_hex_and_names() {
        assert_eq!(parse_css_color("#0A141E"), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(parse_css_color("white"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_css_color("bogus"), None);
    }
}
