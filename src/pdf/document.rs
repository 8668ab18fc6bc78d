use anyhow::Result;
use lopdf::{Dictionary, Document, Object, Stream};
use std::collections::BTreeSet;

use super::content::{ContentBuilder, compress_data};
use super::fonts::{FontProgram, embed_cid_font};
use super::resources::{FONT_RESOURCE, add_page_resources};
use crate::layout::{Point, RenderSurface, TextMeasure};

/// Render surface that records label drawing into PDF pages
///
/// Text is measured with `M` and shown with the embedded `FontProgram`.
/// Nothing is written until `finish` assembles the document.
pub struct PdfCanvas<M> {
    measure: M,
    font: FontProgram,
    page_width: f64,
    page_height: f64,
    pages: Vec<ContentBuilder>,
    font_size: f64,
    line_width: f64,
    used_chars: BTreeSet<char>,
}

impl<M: TextMeasure> PdfCanvas<M> {
    pub fn new(measure: M, font: FontProgram, page_width: f64, page_height: f64) -> Self {
        Self {
            measure,
            font,
            page_width,
            page_height,
            pages: vec![ContentBuilder::new(FONT_RESOURCE)],
            font_size: 12.0,
            line_width: 1.0,
            used_chars: BTreeSet::new(),
        }
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Uncompressed content stream of each page
    #[cfg(test)]
    pub fn page_contents(&self) -> Vec<Vec<u8>> {
        self.pages.iter().map(ContentBuilder::build_content_bytes).collect()
    }

    fn current(&mut self) -> &mut ContentBuilder {
        if self.pages.is_empty() {
            self.pages.push(ContentBuilder::new(FONT_RESOURCE));
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Assemble the PDF: one shared font and resources object, then one
    /// page object per recorded page.
    pub fn finish(self) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = embed_cid_font(&mut doc, &self.font, &self.used_chars)?;
        let resources_id = add_page_resources(&mut doc, font_id);
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.page_width as f32),
            Object::Real(self.page_height as f32),
        ];

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let mut stream_dict = Dictionary::new();
            stream_dict.set("Filter", "FlateDecode");
            let content = Stream::new(stream_dict, compress_data(&page.build_content_bytes())?);
            let content_id = doc.add_object(content);

            let mut page_dict = Dictionary::new();
            page_dict.set("Type", "Page");
            page_dict.set("Parent", Object::Reference(pages_id));
            page_dict.set("MediaBox", media_box.clone());
            page_dict.set("Resources", Object::Reference(resources_id));
            page_dict.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page_dict))));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", "Pages");
        pages_dict.set("Count", kids.len() as i64);
        pages_dict.set("Kids", kids);
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", "Catalog");
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(doc)
    }
}

impl<M: TextMeasure> TextMeasure for PdfCanvas<M> {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        self.measure.text_width(text, font_size)
    }
}

impl<M: TextMeasure> RenderSurface for PdfCanvas<M> {
    fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn draw_string(&mut self, x: f64, y: f64, text: &str) {
        self.used_chars.extend(text.chars());
        let size = self.font_size;
        self.current().add_text(text, x, y, size);
    }

    fn draw_line(&mut self, from: Point, to: Point) {
        let width = self.line_width;
        self.current().add_line(from.x, from.y, to.x, to.y, width);
    }

    fn draw_rounded_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64) {
        let line_width = self.line_width;
        self.current().add_rounded_rect(x, y, width, height, radius, line_width);
    }

    fn show_page(&mut self) {
        self.pages.push(ContentBuilder::new(FONT_RESOURCE));
    }
}
