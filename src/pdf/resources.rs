use lopdf::{Dictionary, Document, Object};

/// Resource name the content streams use for the label font.
pub const FONT_RESOURCE: &str = "F1";

/// Add the resources dictionary shared by every page
///
/// Holds the label font under `F1` and the procedure sets for text and
/// vector drawing.
pub fn add_page_resources(doc: &mut Document, font_id: (u32, u16)) -> (u32, u16) {
    let mut font_resources = Dictionary::new();
    font_resources.set(FONT_RESOURCE, Object::Reference(font_id));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(font_resources));
    resources.set("ProcSet", vec![Object::Name(b"PDF".to_vec()), Object::Name(b"Text".to_vec())]);

    doc.add_object(Object::Dictionary(resources))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_reference_font() {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(Object::Null);

        let resources_id = add_page_resources(&mut doc, font_id);

        let resources = doc.get_dictionary(resources_id).unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"F1").unwrap().as_reference().unwrap(), font_id);
    }
}
