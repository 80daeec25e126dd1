use serde::{Deserialize, Serialize};

/// Which strategy produced the text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    SelectablePdf,
    OcrPdf,
    Docx,
    OcrImage,
    None,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectablePdf => "selectable-pdf",
            Self::OcrPdf => "ocr-pdf",
            Self::Docx => "docx",
            Self::OcrImage => "ocr-image",
            Self::None => "none",
        }
    }

    pub fn is_ocr(&self) -> bool {
        matches!(self, Self::OcrPdf | Self::OcrImage)
    }
}

/// Sub-stage diagnostics collected while walking the cascade.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_scanned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docx_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_extracted_successfully: Option<bool>,
}

/// Text recovered from one upload. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    /// 0–1. 1.0 for deterministic parsers; engine-reported for OCR; 0 when nothing matched.
    pub confidence: f32,
    pub is_ocr: bool,
    pub is_image: bool,
    pub details: ExtractionDetails,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::None,
            confidence: 0.0,
            is_ocr: false,
            is_image: false,
            details: ExtractionDetails::default(),
        }
    }

    pub(crate) fn accept(&mut self, method: ExtractionMethod, text: String, confidence: f32) {
        self.text = text;
        self.method = method;
        self.confidence = confidence.clamp(0.0, 1.0);
        self.is_ocr = method.is_ocr();
        self.is_image = method == ExtractionMethod::OcrImage;
    }

    /// Character count of the extracted text.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }
}

/// Output of one OCR run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// 0–1.
    pub confidence: f32,
}
