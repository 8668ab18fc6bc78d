use anyhow::Result;
use tracing::warn;

use super::{Bounds, FitRules, Point, RenderSurface, fit_font_size};
use crate::config::{LabelRecord, LayoutConfig};

/// Vertical positions computed while drawing one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelLayout {
    pub title_baseline: f64,
    /// False when the title is wider than the space between the paddings.
    pub title_fits: bool,
    pub divider_y: f64,
    /// `None` when the record has no body lines.
    pub body_font_size: Option<f64>,
}

/// Draw one label with its bottom-left corner at `origin`.
///
/// Border, centered title, divider, then the body lines auto-fitted and
/// vertically centered in the space left under the divider.
pub fn draw_label<S: RenderSurface + ?Sized>(
    surface: &mut S,
    origin: Point,
    record: &LabelRecord,
    config: &LayoutConfig,
) -> Result<LabelLayout> {
    let Point { x, y } = origin;
    let size = config.label_size;

    surface.set_line_width(config.border_width);
    surface.draw_rounded_rect(x, y, size, size, config.corner_radius);

    let title = record.title(&config.separator);
    surface.set_font_size(config.title_font_size);
    let title_width = surface.text_width(&title, config.title_font_size);
    let title_baseline = y + size - config.padding_top - config.title_font_size;
    let title_fits = title_width <= size - 2.0 * config.padding_left;
    if !title_fits {
        warn!(title = %title, width = title_width, label_size = size, "title is wider than the label");
    }
    surface.draw_string(x + (size - title_width) / 2.0, title_baseline, &title);

    let divider_y = title_baseline - 2.0 * config.title_spacing;
    surface.draw_line(
        Point { x: x + config.padding_left, y: divider_y },
        Point { x: x + size - config.padding_left, y: divider_y },
    );

    let lines = record.body_lines();
    if lines.is_empty() {
        return Ok(LabelLayout { title_baseline, title_fits, divider_y, body_font_size: None });
    }

    let body_top = divider_y - config.title_spacing;
    let body_bottom = y + config.padding_top;
    let bounds = Bounds {
        max_width: size - 2.0 * config.padding_left,
        max_height: (body_top - body_bottom).max(0.0),
    };
    let font_size = fit_font_size(
        &*surface,
        &lines.join("\n"),
        bounds,
        config.body_font_size,
        FitRules::from(config),
    );

    let n = lines.len() as f64;
    let block_height = n * font_size + (n - 1.0) * config.line_spacing;
    let slack = (bounds.max_height - block_height).max(0.0);

    surface.set_font_size(font_size);
    let mut baseline = body_top - slack / 2.0 - font_size;
    for line in &lines {
        if !line.is_empty() {
            surface.draw_string(x + config.padding_left, baseline, line);
        }
        baseline -= font_size + config.line_spacing;
    }

    Ok(LabelLayout { title_baseline, title_fits, divider_y, body_font_size: Some(font_size) })
}
