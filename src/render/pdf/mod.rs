//! PDF rendering. New documents are composed page by page with `lopdf`;
//! modify appends freshly composed pages to the end of an existing file.

pub mod layout;
pub mod merge;
pub mod resources;
pub mod standard;
pub mod text;

use super::RenderError;
use crate::attachments::ResolvedImage;
use crate::fonts::FontRegistry;
use crate::schema::pdf::PdfInstructions;
use layout::{Composer, Decoration, DocumentInfo, PageBox};
use log::debug;
use lopdf::Document;

const PARAGRAPH_GAP: f32 = 6.0;
const IMAGE_GAP: f32 = 8.0;
const TABLE_GAP: f32 = 10.0;

/// Trailer keys that only make sense next to a cross-reference stream.
const XREF_STREAM_KEYS: [&[u8]; 8] = [
    b"Type",
    b"W",
    b"Index",
    b"Filter",
    b"DecodeParms",
    b"Length",
    b"XRefStm",
    b"Prev",
];

/// Paragraphs first, then images, then tables. `images` are the resolved
/// counterparts of `instructions.images`, in the same order.
pub fn compose(
    instructions: &PdfInstructions,
    images: &[ResolvedImage],
    fonts: &FontRegistry,
) -> Result<Document, RenderError> {
    let page = PageBox::new(instructions.page_size, &instructions.margins);
    let mut composer = Composer::new(fonts, page);
    for paragraph in &instructions.paragraphs {
        composer.paragraph(paragraph)?;
        composer.spacer(PARAGRAPH_GAP);
    }
    for image in images {
        composer.image(image)?;
        composer.spacer(IMAGE_GAP);
    }
    for table in &instructions.tables {
        composer.table(table)?;
        composer.spacer(TABLE_GAP);
    }
    debug!("composed {} pdf page(s)", composer.page_count());

    let decoration = Decoration {
        header: instructions.header_text.clone(),
        footer: instructions.footer_text.clone(),
        page_numbers: instructions.show_page_numbers,
    };
    let info = DocumentInfo {
        title: instructions.title.clone(),
        author: instructions.author.clone(),
        subject: instructions.subject.clone(),
    };
    composer.finish(&decoration, &info)
}

pub fn create(
    instructions: &PdfInstructions,
    images: &[ResolvedImage],
    fonts: &FontRegistry,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = compose(instructions, images, fonts)?;
    save(&mut doc)
}

/// Appends the rendered instructions after the pages of `existing`. When the
/// instructions carry no content the existing bytes come back unchanged.
pub fn modify(
    existing: &[u8],
    instructions: &PdfInstructions,
    images: &[ResolvedImage],
    fonts: &FontRegistry,
) -> Result<Vec<u8>, RenderError> {
    let mut target = Document::load_mem(existing)?;
    if !instructions.has_content() {
        debug!("no new pdf content; returning the source document as is");
        return Ok(existing.to_vec());
    }
    let addition = compose(instructions, images, fonts)?;
    let added = merge::append_pages(&mut target, &addition)?;
    debug!("appended {added} page(s) to the source pdf");
    for key in XREF_STREAM_KEYS {
        target.trailer.remove(key);
    }
    save(&mut target)
}

fn save(doc: &mut Document) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::tests::{jpeg_bytes, png_bytes};
    use crate::schema::pdf::{Align, PdfParagraph, PdfTable};
    use lopdf::Object;

    fn paragraph(text: &str) -> PdfParagraph {
        PdfParagraph {
            text: text.to_string(),
            ..PdfParagraph::default()
        }
    }

    fn image(label: &str, bytes: Vec<u8>, width_inches: f64) -> ResolvedImage {
        ResolvedImage {
            label: label.to_string(),
            width_inches,
            bytes: Some(bytes),
        }
    }

    fn reload(bytes: &[u8]) -> Document {
        Document::load_mem(bytes).expect("valid pdf")
    }

    fn info_entry(doc: &Document, key: &[u8]) -> Vec<u8> {
        let info_id = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .expect("info");
        doc.get_dictionary(info_id)
            .and_then(|info| info.get(key))
            .and_then(Object::as_str)
            .expect("entry")
            .to_vec()
    }

    #[test]
    fn empty_instructions_still_produce_a_page() {
        let registry = FontRegistry::new();
        let bytes = create(&PdfInstructions::default(), &[], &registry).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let doc = reload(&bytes);
        assert_eq!(doc.get_pages().len(), 1);
        let text = doc.extract_text(&[1]).expect("text");
        assert!(text.contains("Page 1"), "{text:?}");
    }

    #[test]
    fn text_metadata_and_decorations_are_written() {
        let registry = FontRegistry::new();
        let instructions = PdfInstructions {
            title: Some("Quarterly report".into()),
            author: Some("Finance".into()),
            header_text: Some("ACME confidential".into()),
            footer_text: Some("Internal".into()),
            paragraphs: vec![
                paragraph("Hello <b>world</b>"),
                PdfParagraph {
                    text: "Centered".into(),
                    align: Align::Center,
                    color: Some("1F4E79".into()),
                    ..PdfParagraph::default()
                },
            ],
            ..PdfInstructions::default()
        };
        let bytes = create(&instructions, &[], &registry).expect("pdf");
        let doc = reload(&bytes);
        assert_eq!(info_entry(&doc, b"Title"), b"Quarterly report".to_vec());
        assert_eq!(info_entry(&doc, b"Author"), b"Finance".to_vec());
        let text = doc.extract_text(&[1]).expect("text");
        for expected in ["Hello", "world", "Centered", "ACME confidential", "Internal", "Page 1"] {
            assert!(text.contains(expected), "{expected} missing from {text:?}");
        }
    }

    #[test]
    fn page_numbers_can_be_turned_off() {
        let registry = FontRegistry::new();
        let instructions = PdfInstructions {
            show_page_numbers: false,
            paragraphs: vec![paragraph("Body")],
            ..PdfInstructions::default()
        };
        let doc = reload(&create(&instructions, &[], &registry).expect("pdf"));
        let text = doc.extract_text(&[1]).expect("text");
        assert!(!text.contains("Page 1"), "{text:?}");
    }

    #[test]
    fn images_and_tables_are_placed() {
        let registry = FontRegistry::new();
        let instructions = PdfInstructions {
            tables: vec![PdfTable {
                rows: vec![
                    vec!["Region".into(), "Total".into()],
                    vec!["North".into(), "12".into()],
                ],
                header: true,
                col_widths_inches: None,
                style_grid: true,
            }],
            ..PdfInstructions::default()
        };
        let images = vec![
            image("photo.jpg", jpeg_bytes(30, 20), 3.0),
            image("logo.png", png_bytes(10, 10), 1.0),
        ];
        let doc = reload(&create(&instructions, &images, &registry).expect("pdf"));
        let pages = doc.get_pages();
        let resources_id = doc
            .get_dictionary(pages[&1])
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_reference)
            .expect("resources");
        let xobjects = doc
            .get_dictionary(resources_id)
            .and_then(|resources| resources.get(b"XObject"))
            .and_then(Object::as_dict)
            .expect("xobjects");
        assert_eq!(xobjects.len(), 2);
        let text = doc.extract_text(&[1]).expect("text");
        assert!(text.contains("Region") && text.contains("North"), "{text:?}");
    }

    #[test]
    fn missing_image_data_is_an_error() {
        let registry = FontRegistry::new();
        let unresolved = ResolvedImage {
            label: "chart.png".into(),
            width_inches: 3.0,
            bytes: None,
        };
        let err = create(&PdfInstructions::default(), &[unresolved], &registry)
            .expect_err("missing image");
        assert!(matches!(err, RenderError::MissingImage(ref label) if label == "chart.png"));
    }

    #[test]
    fn modify_appends_pages_after_the_source() {
        let registry = FontRegistry::new();
        let source = create(
            &PdfInstructions {
                paragraphs: vec![paragraph("Original page")],
                ..PdfInstructions::default()
            },
            &[],
            &registry,
        )
        .expect("source");
        let addition = PdfInstructions {
            paragraphs: vec![paragraph("Appendix")],
            ..PdfInstructions::default()
        };
        let doc = reload(&modify(&source, &addition, &[], &registry).expect("modified"));
        assert_eq!(doc.get_pages().len(), 2);
        let first = doc.extract_text(&[1]).expect("text");
        let second = doc.extract_text(&[2]).expect("text");
        assert!(first.contains("Original page"), "{first:?}");
        assert!(second.contains("Appendix"), "{second:?}");
    }

    #[test]
    fn modify_without_content_returns_the_source() {
        let registry = FontRegistry::new();
        let source = create(&PdfInstructions::default(), &[], &registry).expect("source");
        let out = modify(&source, &PdfInstructions::default(), &[], &registry).expect("same");
        assert_eq!(out, source);
    }

    #[test]
    fn modify_rejects_garbage() {
        let registry = FontRegistry::new();
        let err = modify(b"not a pdf", &PdfInstructions::default(), &[], &registry)
            .expect_err("garbage");
        assert!(matches!(err, RenderError::Pdf(_)));
    }
}
