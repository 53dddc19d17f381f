use thiserror::Error;

/// Incomplete word geometry. Never fatal: the extractor drops the word.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MalformedWord {
    #[error("bounding polygon has no vertex {vertex}")]
    MissingVertex { vertex: usize },

    #[error("vertex {vertex} has no {axis} coordinate")]
    MissingCoordinate { vertex: usize, axis: char },

    #[error("annotation has no bounding polygon")]
    MissingPolygon,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("OCR response contains no response entries")]
    EmptyResponse,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("layout has no TextLine elements; segment the page before running OCR")]
    NotSegmented,

    #[error("line {line} has malformed {attribute}: {value:?}")]
    MalformedLayout {
        line: String,
        attribute: &'static str,
        value: Option<String>,
    },
}
