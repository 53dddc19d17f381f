use tracing::debug;

use crate::core::error::{ExtractError, MalformedWord};
use crate::core::model::Word;
use crate::ocr::response::{EntityAnnotation, VisionResponse};

/// Whole-page annotation the provider places first in every response entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub text: String,
    pub locale: Option<String>,
}

/// Flattens every response entry's word annotations into `Word`s.
///
/// The first annotation of each entry is the page summary and is skipped.
/// Annotations with incomplete geometry are dropped.
pub fn extract_words(response: &VisionResponse) -> Result<Vec<Word>, ExtractError> {
    if response.responses.is_empty() {
        return Err(ExtractError::EmptyResponse);
    }

    let mut words = Vec::new();
    let mut dropped = 0usize;
    for (entry_idx, entry) in response.responses.iter().enumerate() {
        for (idx, annotation) in entry.text_annotations.iter().enumerate().skip(1) {
            match to_word(annotation) {
                Ok(word) => words.push(word),
                Err(reason) => {
                    dropped += 1;
                    debug!(
                        entry = entry_idx,
                        annotation = idx,
                        text = %annotation.description,
                        "dropping word: {reason}"
                    );
                }
            }
        }
    }

    debug!(words = words.len(), dropped, "extracted OCR words");
    Ok(words)
}

fn to_word(annotation: &EntityAnnotation) -> Result<Word, MalformedWord> {
    let poly = annotation
        .bounding_poly
        .as_ref()
        .ok_or(MalformedWord::MissingPolygon)?;
    Word::new(annotation.description.clone(), poly.to_quad())
}

/// Summary annotation of the first response entry, if any.
pub fn page_summary(response: &VisionResponse) -> Option<PageSummary> {
    let summary = response.responses.first()?.text_annotations.first()?;
    Some(PageSummary {
        text: summary.description.clone(),
        locale: summary.locale.clone(),
    })
}
