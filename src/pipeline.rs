use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::alto::builder::build_alto;
use crate::alto::{AltoDocument, AltoError};
use crate::core::error::{ExtractError, ReconcileError};
use crate::core::model::ReconcileSummary;
use crate::escriptorium::{DocumentHost, Part};
use crate::ocr::raster::{prepare_image, PreparedImage};
use crate::ocr::{extract_words, page_summary, OcrProvider, VisionResponse};
use crate::reconcile::{ContainmentReconciler, Reconciler};

/// Why a single page could not be processed.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Alto(#[from] AltoError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// OCR service, document host, layout store or image decoding.
    #[error(transparent)]
    Collaborator(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct PageOutput {
    pub alto: String,
    pub summary: ReconcileSummary,
}

/// Places the words of `response` into the lines of `alto_xml`.
///
/// Either every line is updated or an error is returned and nothing is
/// produced.
pub fn merge_vision_alto(response: &VisionResponse, alto_xml: &str) -> Result<PageOutput, PageError> {
    let layout = AltoDocument::parse(alto_xml)?;
    reconcile_layout(layout, response)
}

fn reconcile_layout(mut layout: AltoDocument, response: &VisionResponse) -> Result<PageOutput, PageError> {
    if let Some(summary) = page_summary(response) {
        debug!(locale = ?summary.locale, chars = summary.text.len(), "OCR page summary");
    }
    let words = extract_words(response)?;
    let summary = ContainmentReconciler::new().reconcile(&words, &mut layout.lines)?;
    Ok(PageOutput {
        alto: layout.to_xml()?,
        summary,
    })
}

/// Runs OCR on a page image and merges the result into its layout.
pub fn process_page(
    ocr: &dyn OcrProvider,
    language: &str,
    image: Vec<u8>,
    alto_xml: &str,
) -> Result<PageOutput, PageError> {
    let layout = AltoDocument::parse(alto_xml)?;
    // no point paying for OCR when the text could not be placed
    if layout.lines.is_empty() {
        return Err(ReconcileError::NotSegmented.into());
    }
    for line in &layout.lines {
        line.rect()?;
    }

    let image = prepare_image(image).map_err(PageError::Collaborator)?;
    check_dimensions(&layout, &image);
    let response = ocr
        .annotate(&image.bytes, language)
        .map_err(PageError::Collaborator)?;
    reconcile_layout(layout, &response)
}

fn check_dimensions(layout: &AltoDocument, image: &PreparedImage) {
    if let Some((width, height)) = layout.page_size {
        if width != i64::from(image.width) || height != i64::from(image.height) {
            warn!(
                layout_width = width,
                layout_height = height,
                image_width = image.width,
                image_height = image.height,
                "layout and image sizes differ; line matching may be off"
            );
        }
    }
}

/// Builds a fresh ALTO document for an image that has no segmentation.
pub fn transcribe_image(ocr: &dyn OcrProvider, language: &str, path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let image = prepare_image(bytes)?;
    let response = ocr.annotate(&image.bytes, language)?;
    if let Some(summary) = page_summary(&response) {
        info!(locale = ?summary.locale, "transcribed {}", path.display());
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(build_alto(&file_name, &response)?)
}

#[derive(Debug, Clone)]
pub struct DocumentJob {
    pub document: u64,
    /// Exported ALTO files, one `<image stem>.xml` per part.
    pub alto_dir: PathBuf,
    pub output_dir: PathBuf,
    pub language: String,
    /// Import the merged files into this transcription when set.
    pub transcription: Option<String>,
}

#[derive(Debug)]
pub struct PageReport {
    pub part: String,
    pub result: Result<ReconcileSummary, PageError>,
}

#[derive(Debug, Default)]
pub struct DocumentReport {
    pub pages: Vec<PageReport>,
}

impl DocumentReport {
    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|page| page.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.pages.len() - self.succeeded()
    }
}

/// Processes every part of a document. A failing page is reported and the
/// run moves on to the next one.
pub fn run_document(
    host: &dyn DocumentHost,
    ocr: &dyn OcrProvider,
    job: &DocumentJob,
) -> Result<DocumentReport> {
    let parts = host
        .list_parts(job.document)
        .with_context(|| format!("failed to list parts of document {}", job.document))?;
    fs::create_dir_all(&job.output_dir)
        .with_context(|| format!("failed to create {}", job.output_dir.display()))?;
    info!(document = job.document, parts = parts.len(), "processing document");

    let mut report = DocumentReport::default();
    for part in &parts {
        let name = part.stem();
        let result = run_part(host, ocr, job, part, &name);
        match &result {
            Ok(summary) => info!(
                part = %name,
                lines = summary.lines,
                words = summary.assigned_words,
                "page done"
            ),
            Err(err) => error!(part = %name, "page failed: {err:#}"),
        }
        report.pages.push(PageReport { part: name, result });
    }
    Ok(report)
}

fn run_part(
    host: &dyn DocumentHost,
    ocr: &dyn OcrProvider,
    job: &DocumentJob,
    part: &Part,
    name: &str,
) -> Result<ReconcileSummary, PageError> {
    let file_name = format!("{name}.xml");
    let alto_path = job.alto_dir.join(&file_name);
    let alto_xml = fs::read_to_string(&alto_path)
        .with_context(|| format!("failed to read layout {}", alto_path.display()))
        .map_err(PageError::Collaborator)?;
    let image = host.fetch_image(part).map_err(PageError::Collaborator)?;

    let output = process_page(ocr, &job.language, image, &alto_xml)?;

    let out_path = job.output_dir.join(&file_name);
    fs::write(&out_path, &output.alto)
        .with_context(|| format!("failed to write {}", out_path.display()))
        .map_err(PageError::Collaborator)?;

    if let Some(transcription) = &job.transcription {
        host.upload_layout(job.document, transcription, &file_name, output.alto)
            .map_err(PageError::Collaborator)?;
    }
    Ok(output.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAYOUT: &str = r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#"><Layout><Page WIDTH="200" HEIGHT="100"><TextLine ID="l1" HPOS="10" VPOS="10" WIDTH="100" HEIGHT="20"/></Page></Layout></alto>"#;

    const RESPONSE: &str = r#"{"responses":[{"textAnnotations":[
        {"description":"Hello World","locale":"en"},
        {"description":"World","boundingPoly":{"vertices":[{"x":60,"y":12},{"x":100,"y":12},{"x":100,"y":28},{"x":60,"y":28}]}},
        {"description":"Hello","boundingPoly":{"vertices":[{"x":15,"y":12},{"x":50,"y":12},{"x":50,"y":28},{"x":15,"y":28}]}}
    ]}]}"#;

    #[test]
    fn merges_words_into_layout() {
        let response = VisionResponse::from_json(RESPONSE).unwrap();
        let output = merge_vision_alto(&response, LAYOUT).unwrap();
        let doc = AltoDocument::parse(&output.alto).unwrap();
        assert_eq!(doc.lines[0].text(), "Hello World");
        assert_eq!(output.summary.assigned_words, 2);
    }

    #[test]
    fn unsegmented_layout_is_rejected() {
        let response = VisionResponse::from_json(RESPONSE).unwrap();
        let err = merge_vision_alto(&response, "<alto><Layout/></alto>").unwrap_err();
        assert!(matches!(err, PageError::Reconcile(ReconcileError::NotSegmented)));
    }

    #[test]
    fn out_of_range_line_is_malformed() {
        let response = VisionResponse::from_json(RESPONSE).unwrap();
        let layout = LAYOUT.replace(r#"HPOS="10""#, r#"HPOS="1e300""#);
        let err = merge_vision_alto(&response, &layout).unwrap_err();
        assert!(matches!(
            err,
            PageError::Reconcile(ReconcileError::MalformedLayout { attribute: "HPOS", .. })
        ));
    }

    #[test]
    fn empty_response_is_rejected() {
        let err = merge_vision_alto(&VisionResponse::default(), LAYOUT).unwrap_err();
        assert!(matches!(err, PageError::Extract(ExtractError::EmptyResponse)));
    }

    #[test]
    fn report_counts_outcomes() {
        let report = DocumentReport {
            pages: vec![
                PageReport {
                    part: "a".to_string(),
                    result: Ok(ReconcileSummary::default()),
                },
                PageReport {
                    part: "b".to_string(),
                    result: Err(ReconcileError::NotSegmented.into()),
                },
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }
}
