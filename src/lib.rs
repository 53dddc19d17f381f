pub mod alto;
pub mod config;
pub mod core;
pub mod escriptorium;
pub mod ocr;
pub mod pipeline;
pub mod reconcile;

pub use alto::AltoDocument;
pub use crate::core::model::{AltoString, TextLine, Word};
pub use pipeline::{merge_vision_alto, process_page, PageError};
