//! Text layout for card labels: greedy word wrapping plus single-pass
//! ellipsis truncation.

use std::borrow::Cow;

/// Anything that can report the rendered width of a string.
pub trait TextMeasure {
    fn measure(&self, text: &str) -> f32;
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn measure(&self, text: &str) -> f32 {
        (**self).measure(text)
    }
}

/// Where and how wide a block of text may be laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    /// Anchor x (the horizontal center for centered text)
    pub x: f32,
    /// Baseline of the first line
    pub y: f32,
    pub max_width: f32,
    pub line_height: f32,
}

/// A positioned line ready to be painted.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Shorten `text` with a trailing `...` when its measured width exceeds
/// `max_width`.
///
/// The cut point assumes roughly uniform glyph widths:
/// `floor(chars * max_width / width) - 3`. The result is not re-measured, so
/// it may still overshoot `max_width` by a few glyphs.
pub fn truncate_to_fit<'a, M: TextMeasure + ?Sized>(
    measure: &M,
    text: &'a str,
    max_width: f32,
) -> Cow<'a, str> {
    let width = measure.measure(text);
    if width <= max_width {
        return Cow::Borrowed(text);
    }

    let chars = text.chars().count();
    let keep = ((chars as f64 * max_width as f64 / width as f64).floor() as i64 - 3).max(0) as usize;
    let mut shortened: String = text.chars().take(keep).collect();
    shortened.push_str("...");
    Cow::Owned(shortened)
}

/// Greedily pack space-separated words into lines no wider than
/// `bounds.max_width`.
///
/// A line is broken only when appending the next word would overflow and
/// the current line already holds something, so a single over-long word
/// sits alone on its line. Lines are placed `line_height` apart starting at
/// `bounds.y`. Empty text produces no lines.
pub fn wrap_text<M: TextMeasure + ?Sized>(measure: &M, text: &str, bounds: TextBox) -> Vec<TextLine> {
    let mut lines = Vec::new();
    if text.is_empty() {
        return lines;
    }

    let mut line = String::new();
    let mut y = bounds.y;
    for word in text.split(' ') {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };

        if measure.measure(&candidate) > bounds.max_width && !line.is_empty() {
            lines.push(TextLine {
                text: std::mem::replace(&mut line, word.to_string()),
                x: bounds.x,
                y,
            });
            y += bounds.line_height;
        } else {
            line = candidate;
        }
    }
    lines.push(TextLine {
        text: line,
        x: bounds.x,
        y,
    });
    lines
}

/// Truncate once (see [`truncate_to_fit`]) and then wrap the result.
pub fn truncate_and_wrap<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    bounds: TextBox,
) -> Vec<TextLine> {
    if text.is_empty() {
        return Vec::new();
    }
    let truncated = truncate_to_fit(measure, text, bounds.max_width);
    wrap_text(measure, &truncated, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is the same width.
    struct Monospace(f32);

    impl TextMeasure for Monospace {
        fn measure(&self, text: &str) -> f32 {
            text.chars().count() as f32 * self.0
        }
    }

    /// `W` is six times wider than everything else.
    struct Skewed;

    impl TextMeasure for Skewed {
        fn measure(&self, text: &str) -> f32 {
            text.chars().map(|c| if c == 'W' { 30.0 } else { 5.0 }).sum()
        }
    }

    fn bounds(max_width: f32) -> TextBox {
        TextBox {
            x: 250.0,
            y: 150.0,
            max_width,
            line_height: 40.0,
        }
    }

    #[test]
    fn short_text_is_one_line_at_anchor() {
        let lines = wrap_text(&Monospace(10.0), "hello world", bounds(460.0));
        assert_eq!(
            lines,
            vec![TextLine {
                text: "hello world".into(),
                x: 250.0,
                y: 150.0
            }]
        );
    }

    #[test]
    fn second_line_is_one_line_height_down() {
        // "aaaa bbbb" is 90 wide, over the 60 limit
        let lines = wrap_text(&Monospace(10.0), "aaaa bbbb", bounds(60.0));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "aaaa");
        assert_eq!(lines[0].y, 150.0);
        assert_eq!(lines[1].text, "bbbb");
        assert_eq!(lines[1].y, 190.0);
    }

    #[test]
    fn greedy_packing_never_exceeds_width_for_fitting_words() {
        let text = "the quick brown fox jumps over the lazy dog";
        let m = Monospace(10.0);
        let lines = wrap_text(&m, text, bounds(150.0));
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(m.measure(&line.text) <= 150.0, "{:?}", line);
        }
        let rejoined: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), text);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.y, 150.0 + 40.0 * i as f32);
        }
    }

    #[test]
    fn overlong_word_sits_alone() {
        let lines = wrap_text(&Monospace(10.0), "a supercalifragilistic b", bounds(50.0));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn empty_text_draws_nothing() {
        assert!(wrap_text(&Monospace(10.0), "", bounds(100.0)).is_empty());
        assert!(truncate_and_wrap(&Monospace(10.0), "", bounds(100.0)).is_empty());
    }

    #[test]
    fn fitting_title_is_untouched() {
        let out = truncate_to_fit(&Monospace(10.0), "Example", 460.0);
        assert!(matches!(out, Cow::Borrowed("Example")));
    }

    #[test]
    fn overflowing_title_gets_ellipsis() {
        let title = "x".repeat(100);
        let out = truncate_to_fit(&Monospace(10.0), &title, 460.0);
        // floor(100 * 460 / 1000) - 3 = 43 characters kept
        assert_eq!(out.chars().count(), 46);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncation_is_heuristic_and_not_remeasured() {
        // wide glyphs at the start, narrow at the end: the uniform-width
        // estimate keeps too many wide characters
        let title = format!("{}{}", "W".repeat(20), "i".repeat(80));
        let out = truncate_to_fit(&Skewed, &title, 460.0);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() < title.chars().count());
        // still measurably wider than the limit, within a bounded error
        let width = Skewed.measure(&out);
        assert!(width < 460.0 * 2.0);
    }

    #[test]
    fn truncated_title_may_still_wrap() {
        let title = format!("WWW WWW WWW WWW {}", "i".repeat(200));
        let lines = truncate_and_wrap(&Skewed, &title, bounds(200.0));
        assert!(lines.len() > 1);
        assert!(lines.last().unwrap().text.ends_with("..."));
    }

    #[test]
    fn tiny_width_truncates_to_bare_ellipsis() {
        let out = truncate_to_fit(&Monospace(10.0), "abcdef", 5.0);
        assert_eq!(out, "...");
    }
}
