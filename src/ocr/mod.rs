pub mod client;
pub mod extract;
pub mod paragraphs;
pub mod raster;
pub mod response;

pub use client::VisionClient;
pub use extract::{extract_words, page_summary, PageSummary};
pub use response::VisionResponse;

use anyhow::Result;

pub trait OcrProvider {
    fn annotate(&self, image: &[u8], language: &str) -> Result<VisionResponse>;
}
