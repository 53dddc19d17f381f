use tracing::debug;

use crate::core::geometry::{Quad, Rect};
use crate::ocr::response::VisionResponse;

/// One OCR paragraph flattened into a single line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphLine {
    pub text: String,
    pub quad: Quad,
    pub rect: Rect,
}

/// Collects the paragraphs of the first page of the first response entry.
///
/// Each word is its symbols concatenated, followed by a single space.
/// Paragraphs without a complete bounding polygon are skipped.
pub fn paragraph_lines(response: &VisionResponse) -> Vec<ParagraphLine> {
    let Some(page) = response
        .responses
        .first()
        .and_then(|entry| entry.full_text_annotation.as_ref())
        .and_then(|annotation| annotation.pages.first())
    else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for paragraph in page.blocks.iter().flat_map(|block| block.paragraphs.iter()) {
        let mut text = String::new();
        for word in &paragraph.words {
            for symbol in &word.symbols {
                text.push_str(&symbol.text);
            }
            text.push(' ');
        }

        let Some(poly) = paragraph.bounding_box.as_ref() else {
            debug!("skipping paragraph without bounding box");
            continue;
        };
        let quad = poly.to_quad();
        match quad.bounding_rect() {
            Ok(rect) => lines.push(ParagraphLine { text, quad, rect }),
            Err(reason) => debug!("skipping paragraph: {reason}"),
        }
    }
    lines
}

/// Page size reported by the provider, when present.
pub fn page_size(response: &VisionResponse) -> Option<(u32, u32)> {
    let page = response
        .responses
        .first()?
        .full_text_annotation
        .as_ref()?
        .pages
        .first()?;
    Some((page.width, page.height))
}
