//! Configuration loading and parsing.
//!
//! This module handles:
//! - The layout configuration (label geometry, spacing, font sizes)
//! - Loading and applying the optional settings.json overrides
//! - Loading label records from the CSV file
//! - Unit conversion for dimensions (mm, cm, in, pt)

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Points per millimetre (1 inch = 72 points = 25.4 mm).
pub const MM: f64 = 72.0 / 25.4;

/// Smallest accepted font size step, in points.
const MIN_FONT_STEP: f64 = 0.01;
/// Upper bound on the number of font sizes one auto-fit search may try.
const MAX_FONT_CANDIDATES: f64 = 100_000.0;

/// Dimension value that can be specified as:
/// - A number (interpreted as points)
/// - A string with unit: e.g., "30 mm", "1 cm", "0.5 in", "12pt"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension(pub f64);

impl Dimension {
    /// Convert to points (internal PDF unit)
    pub fn as_points(&self) -> f64 {
        self.0
    }

    /// Parse a dimension string such as "30 mm" or "12pt" into points.
    pub fn parse(value: &str) -> Result<Dimension, String> {
        let value = value.trim();
        let split = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(value.len());
        let (num_str, unit) = value.split_at(split);
        let unit = unit.trim().to_lowercase();

        let num: f64 = num_str
            .trim()
            .parse()
            .map_err(|_| format!("invalid number in dimension: {:?}", value))?;

        let points = match unit.as_str() {
            "" | "pt" | "point" | "points" => num,
            "mm" => num * MM,
            "cm" => num * MM * 10.0,
            "in" | "inch" | "inches" => num * 72.0,
            _ => {
                return Err(format!(
                    "unknown unit '{}'. Supported: mm, cm, in, pt",
                    unit
                ));
            }
        };

        Ok(Dimension(points))
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DimensionVisitor;

        impl serde::de::Visitor<'_> for DimensionVisitor {
            type Value = Dimension;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or a string with unit (e.g., \"30 mm\", \"1 cm\", \"0.5 in\")")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Dimension::parse(value).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(DimensionVisitor)
    }
}

/// Label geometry and typography, all lengths in points.
///
/// Built once at startup and passed by reference into the layout code.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    /// Side length of the square label.
    pub label_size: f64,
    pub margin: f64,
    pub gap: f64,
    pub corner_radius: f64,
    pub border_width: f64,
    pub padding_left: f64,
    pub padding_top: f64,
    pub title_font_size: f64,
    /// Starting size for the body auto-fit search.
    pub body_font_size: f64,
    /// Space between the title baseline and the divider is twice this value.
    pub title_spacing: f64,
    pub line_spacing: f64,
    pub font_step: f64,
    pub min_font_size: f64,
    pub separator: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 210.0 * MM,
            page_height: 297.0 * MM,
            label_size: 30.0 * MM,
            margin: 1.0 * MM,
            gap: 0.5 * MM,
            corner_radius: 2.0 * MM,
            border_width: 0.5 * MM,
            padding_left: 0.9 * MM,
            padding_top: 1.0 * MM,
            title_font_size: 16.0,
            body_font_size: 16.0,
            title_spacing: 0.5 * MM,
            line_spacing: 0.2 * MM,
            font_step: 0.5,
            min_font_size: 1.0,
            separator: "/".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Reject geometry the layout code cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("label_size", self.label_size),
            ("title_font_size", self.title_font_size),
            ("body_font_size", self.body_font_size),
            ("font_step", self.font_step),
            ("min_font_size", self.min_font_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                bail!("{} must be a positive number, got {}", name, value);
            }
        }

        let non_negative = [
            ("margin", self.margin),
            ("gap", self.gap),
            ("corner_radius", self.corner_radius),
            ("border_width", self.border_width),
            ("padding_left", self.padding_left),
            ("padding_top", self.padding_top),
            ("title_spacing", self.title_spacing),
            ("line_spacing", self.line_spacing),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{} must not be negative, got {}", name, value);
            }
        }

        if 2.0 * self.padding_left >= self.label_size {
            bail!("padding_left leaves no room for text inside a {}pt label", self.label_size);
        }

        if self.font_step < MIN_FONT_STEP {
            bail!("font_step must be at least {}pt, got {}", MIN_FONT_STEP, self.font_step);
        }
        let candidates = (self.body_font_size - self.min_font_size) / self.font_step;
        if candidates > MAX_FONT_CANDIDATES {
            bail!(
                "font_step {} gives {:.0} font sizes between {}pt and {}pt; at most {} are tried",
                self.font_step,
                candidates,
                self.body_font_size,
                self.min_font_size,
                MAX_FONT_CANDIDATES
            );
        }
        Ok(())
    }
}

/// Optional overrides read from settings.json.
///
/// Every key is optional; a missing key keeps the `LayoutConfig` default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub label_size: Option<Dimension>,
    pub margin: Option<Dimension>,
    pub gap: Option<Dimension>,
    pub corner_radius: Option<Dimension>,
    pub border_width: Option<Dimension>,
    pub padding_left: Option<Dimension>,
    pub padding_top: Option<Dimension>,
    pub title_spacing: Option<Dimension>,
    pub line_spacing: Option<Dimension>,
    pub title_font_size: Option<Dimension>,
    pub body_font_size: Option<Dimension>,
    pub font_step: Option<f64>,
    pub min_font_size: Option<f64>,
    pub separator: Option<String>,
    /// Font files tried before the built-in search list.
    pub fonts: Vec<PathBuf>,
    /// Family names tried before the built-in family list.
    pub font_families: Vec<String>,
}

impl Settings {
    /// Apply these overrides on top of `base` and validate the result.
    pub fn apply(&self, base: LayoutConfig) -> Result<LayoutConfig> {
        let pick = |over: Option<Dimension>, default: f64| over.map_or(default, |d| d.as_points());

        let config = LayoutConfig {
            label_size: pick(self.label_size, base.label_size),
            margin: pick(self.margin, base.margin),
            gap: pick(self.gap, base.gap),
            corner_radius: pick(self.corner_radius, base.corner_radius),
            border_width: pick(self.border_width, base.border_width),
            padding_left: pick(self.padding_left, base.padding_left),
            padding_top: pick(self.padding_top, base.padding_top),
            title_spacing: pick(self.title_spacing, base.title_spacing),
            line_spacing: pick(self.line_spacing, base.line_spacing),
            title_font_size: pick(self.title_font_size, base.title_font_size),
            body_font_size: pick(self.body_font_size, base.body_font_size),
            font_step: self.font_step.unwrap_or(base.font_step),
            min_font_size: self.min_font_size.unwrap_or(base.min_font_size),
            separator: self.separator.clone().unwrap_or(base.separator),
            ..base
        };
        config.validate()?;
        Ok(config)
    }
}

/// One CSV data row: the text content of one printed label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    fields: Vec<String>,
}

impl LabelRecord {
    /// Build a record, requiring the two fields that form the title line.
    pub fn new(fields: Vec<String>) -> Result<Self> {
        if fields.len() < 2 {
            bail!("a label needs at least 2 fields, found {}", fields.len());
        }
        Ok(Self { fields })
    }

    /// First two fields joined by `separator`.
    pub fn title(&self, separator: &str) -> String {
        format!("{}{}{}", self.fields[0], separator, self.fields[1])
    }

    /// Remaining fields, one line each. Fields containing line breaks
    /// contribute one line per embedded line; empty fields stay as blank
    /// lines.
    pub fn body_lines(&self) -> Vec<&str> {
        self.fields[2..]
            .iter()
            .flat_map(|field| field.split('\n'))
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect()
    }
}

/// Helper function to open a file with consistent error context
fn open_file_with_context(path: &Path, description: &str) -> Result<File> {
    File::open(path)
        .with_context(|| format!("Failed to open {} at {:?}", description, path))
}

pub fn load_settings_config(path: &Path) -> Result<Settings> {
    let file = open_file_with_context(path, "settings file")?;
    let reader = BufReader::new(file);
    let settings: Settings = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse settings file {:?}", path))?;
    Ok(settings)
}

pub fn load_labels(path: &Path) -> Result<Vec<LabelRecord>> {
    let file = open_file_with_context(path, "label CSV")?;
    read_labels(file).with_context(|| format!("Failed to read labels from {:?}", path))
}

/// Read label records from CSV, skipping the header row.
pub fn read_labels<R: Read>(reader: R) -> Result<Vec<LabelRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut labels = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let fields = record.iter().map(str::to_string).collect();
        let label = LabelRecord::new(fields).with_context(|| format!("Invalid label on line {}", line))?;
        labels.push(label);
    }
    Ok(labels)
}
