pub mod docx;
pub mod ocr;
pub mod pdf;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ExtractionConfig;
use ocr::{OcrEngine, TesseractOcr};
use pdf::{PdfExtractTextLayer, PdfExtractor, PdfiumRenderer};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Text is not valid UTF-8: {0}")]
    Encoding(String),
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),
    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },
    #[error("DOCX parsing failed: {0}")]
    Docx(String),
    #[error("Image decoding failed: {0}")]
    Image(String),
    #[error("OCR engine could not start: {0}")]
    OcrInit(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
    Image,
}

impl DocumentKind {
    /// Kind tag from the lower-cased file extension.
    pub fn from_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Text),
            "png" | "jpg" | "jpeg" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Text => "txt",
            DocumentKind::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Turns raw file bytes into text. Implementations are blocking and are
/// driven from `spawn_blocking` by the pipeline.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Dispatches on [`DocumentKind`] to the PDF, DOCX, UTF-8 and OCR readers.
pub struct DocumentExtractor {
    pdf: PdfExtractor,
    ocr: Arc<dyn OcrEngine>,
}

impl DocumentExtractor {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new(
            config.tessdata_dir.clone(),
            config.ocr_language.clone(),
            config.ocr_dpi,
        ));
        let pdf = PdfExtractor::new(
            Box::new(PdfExtractTextLayer),
            Box::new(PdfiumRenderer),
            ocr.clone(),
            config.ocr_dpi,
        );
        Self { pdf, ocr }
    }

    pub fn with_components(pdf: PdfExtractor, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractionError> {
        match kind {
            DocumentKind::Pdf => self.pdf.extract(bytes),
            DocumentKind::Docx => docx::extract_text(bytes),
            DocumentKind::Text => String::from_utf8(bytes.to_vec())
                .map_err(|e| ExtractionError::Encoding(e.to_string())),
            DocumentKind::Image => {
                let png = ocr::normalize_to_png(bytes)?;
                self.ocr.recognize(&png)
            }
        }
    }
}
