//! ALTO v4 layout adapter.
//!
//! The reader keeps the whole event stream so that everything outside the
//! `String` children of `TextLine`s is written back unchanged.

pub mod builder;
pub mod reader;
pub mod writer;

use quick_xml::events::Event;
use thiserror::Error;

use crate::core::model::TextLine;

pub const ALTO_NS: &str = "http://www.loc.gov/standards/alto/ns-v4#";

#[derive(Debug, Error)]
pub enum AltoError {
    #[error("malformed ALTO XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed ALTO attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("failed to write ALTO: {0}")]
    Io(#[from] std::io::Error),

    #[error("ALTO output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Parsed ALTO document: the lines the reconciler works on plus the raw
/// events needed to write the file back.
#[derive(Debug, Clone)]
pub struct AltoDocument {
    events: Vec<Event<'static>>,
    pub lines: Vec<TextLine>,
    /// Last path segment of `sourceImageInformation/fileName`.
    pub file_name: Option<String>,
    /// `WIDTH`/`HEIGHT` of the first `Page`.
    pub page_size: Option<(i64, i64)>,
}

impl AltoDocument {
    pub fn parse(xml: &str) -> Result<Self, AltoError> {
        reader::read_alto(xml)
    }

    pub fn to_xml(&self) -> Result<String, AltoError> {
        writer::write_alto(self)
    }

    pub(crate) fn events(&self) -> &[Event<'static>] {
        &self.events
    }
}
