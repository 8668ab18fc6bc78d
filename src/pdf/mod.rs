//! PDF output: content streams, font embedding and document assembly.

mod content;
mod document;
mod fonts;
mod resources;

pub use document::PdfCanvas;
pub use fonts::FontResolver;
