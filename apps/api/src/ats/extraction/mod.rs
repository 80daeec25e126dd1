// Document text extraction: selectable PDF → OCR of scanned PDF → DOCX → OCR of image.
// Every stage degrades to "no text" plus a details entry; nothing here fails a request.
// CPU-bound parsers run inside tokio::task::spawn_blocking.

pub mod cascade;
pub mod ocr;
pub mod parsers;
pub mod types;

use std::time::Duration;

use thiserror::Error;

pub use cascade::{DocumentExtractor, ExtractionSettings};
pub use ocr::{OcrEngine, TesseractOcr};
pub use parsers::{DocxParser, PdfTextParser, TextParser};
pub use types::ExtractionResult;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("DOCX parse error: {0}")]
    Docx(String),

    #[error("OCR engine error: {0}")]
    Ocr(String),

    #[error("OCR exceeded {0:?}")]
    OcrTimeout(Duration),

    #[error("buffer too small to be an image ({len} < {min} bytes)")]
    ImageTooSmall { len: usize, min: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parser task failed: {0}")]
    TaskFailed(String),
}
