use std::sync::Arc;

use crate::ats::extraction::{
    DocumentExtractor, DocxParser, ExtractionSettings, PdfTextParser, TesseractOcr,
};
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Extraction cascade. Parsers and OCR engine sit behind traits; tests swap in stubs.
    pub extractor: Arc<DocumentExtractor>,
}

impl AppState {
    /// Production wiring: pdf-extract, docx-rs and the Tesseract CLI.
    pub fn new(config: Config) -> Self {
        let extractor = DocumentExtractor::new(
            Arc::new(PdfTextParser),
            Arc::new(DocxParser),
            Arc::new(TesseractOcr::new(&config.ocr)),
            ExtractionSettings::from(&config.pipeline),
        );
        Self {
            config,
            extractor: Arc::new(extractor),
        }
    }
}
