//! PDF content stream generation for label drawing.
//!
//! This module provides:
//! - Text, line and rounded rectangle operators
//! - Number formatting for content streams
//! - String encoding for the Identity-H CID font (UTF-16BE hex)
//! - Flate compression of stream data

use anyhow::Result;
use std::io::Write;

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.552_284_75;

/// Builder for one page's content stream
pub struct ContentBuilder {
    pub content_parts: Vec<String>,
    font_name: String,
}

impl ContentBuilder {
    /// Create a new ContentBuilder drawing text with the given font resource
    pub fn new(font_name: impl Into<String>) -> Self {
        Self {
            content_parts: Vec::new(),
            font_name: font_name.into(),
        }
    }

    /// Show `value` with its baseline starting at `(x, y)`
    pub fn add_text(&mut self, value: &str, x: f64, y: f64, font_size: f64) {
        self.content_parts.push(format!(
            "q BT 0 g /{} {} Tf {} {} Td <{}> Tj ET Q\n",
            self.font_name,
            num(font_size),
            num(x),
            num(y),
            encode_cid_text(value)
        ));
    }

    /// Stroke a straight line
    pub fn add_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, line_width: f64) {
        self.content_parts.push(format!(
            "q 0 G {} w {} {} m {} {} l S Q\n",
            num(line_width),
            num(x1),
            num(y1),
            num(x2),
            num(y2)
        ));
    }

    /// Stroke a rectangle with quarter-circle corners
    pub fn add_rounded_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64, line_width: f64) {
        let r = radius.min(width / 2.0).min(height / 2.0);
        if r <= 0.0 {
            self.content_parts.push(format!(
                "q 0 G {} w {} {} {} {} re S Q\n",
                num(line_width),
                num(x),
                num(y),
                num(width),
                num(height)
            ));
            return;
        }

        let c = r * KAPPA;
        let right = x + width;
        let top = y + height;
        let points = [
            format!("{} {} m", num(x + r), num(y)),
            format!("{} {} l", num(right - r), num(y)),
            curve(right - r + c, y, right, y + r - c, right, y + r),
            format!("{} {} l", num(right), num(top - r)),
            curve(right, top - r + c, right - r + c, top, right - r, top),
            format!("{} {} l", num(x + r), num(top)),
            curve(x + r - c, top, x, top - r + c, x, top - r),
            format!("{} {} l", num(x), num(y + r)),
            curve(x, y + r - c, x + r - c, y, x + r, y),
        ];
        self.content_parts.push(format!(
            "q 0 G {} w {} h S Q\n",
            num(line_width),
            points.join(" ")
        ));
    }

    /// Build the final content bytes
    pub fn build_content_bytes(&self) -> Vec<u8> {
        self.content_parts.concat().into_bytes()
    }
}

fn curve(x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> String {
    format!("{} {} {} {} {} {} c", num(x1), num(y1), num(x2), num(y2), num(x3), num(y3))
}

/// Format a number for a content stream: at most three decimals, no
/// trailing zeros.
pub fn num(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Encode text for CID font (Identity-H encoding)
///
/// Each character becomes its UTF-16BE code unit as a CID. Characters
/// outside the BMP have no CID in the map and render as .notdef.
pub fn encode_cid_text(s: &str) -> String {
    s.chars()
        .map(|c| u16::try_from(u32::from(c)).unwrap_or(0))
        .map(|code| format!("{:04X}", code))
        .collect()
}

/// Compress data using zlib/flate2
pub fn compress_data(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
