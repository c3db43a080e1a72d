//! Rendering primitives: text layout, fonts and the card canvas.

pub mod canvas;
pub mod font;
pub mod layout;

pub use canvas::{Canvas, TextAlign};
pub use font::{FontBook, FontFace, FontSpec, WEIGHT_BOLD, WEIGHT_NORMAL};
pub use layout::{truncate_and_wrap, truncate_to_fit, wrap_text, TextBox, TextLine, TextMeasure};
