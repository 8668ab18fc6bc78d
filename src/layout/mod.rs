//! Label layout on top of an abstract render surface.
//!
//! Coordinates are PDF user space: points, origin at the bottom-left of the
//! page, y growing upwards.

mod fit;
mod label;
mod sheet;

pub use fit::{Bounds, FitRules, fit_font_size};
pub use label::draw_label;
pub use sheet::compose_sheet;

/// A point in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Measures rendered text width in points.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        (**self).text_width(text, font_size)
    }
}

/// Drawing operations the label layout needs.
///
/// Font size and line width are sticky state, like a PDF graphics state.
pub trait RenderSurface: TextMeasure {
    fn set_font_size(&mut self, size: f64);
    fn set_line_width(&mut self, width: f64);
    /// Draw `text` with its baseline starting at `(x, y)`.
    fn draw_string(&mut self, x: f64, y: f64, text: &str);
    fn draw_line(&mut self, from: Point, to: Point);
    /// Stroke a rounded rectangle whose bottom-left corner is `(x, y)`.
    fn draw_rounded_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64);
    /// Close the current page and continue on a fresh one.
    fn show_page(&mut self);
}
