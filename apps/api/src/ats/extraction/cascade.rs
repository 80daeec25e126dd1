use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::ocr::OcrEngine;
use super::parsers::TextParser;
use super::types::{ExtractionMethod, ExtractionResult, OcrOutput};
use super::ExtractionError;
use crate::ats::detect::DocumentKind;
use crate::ats::normalize::normalize_text;
use crate::config::PipelineConfig;

#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub scanned_pdf_threshold: usize,
    pub ocr_timeout: Duration,
    pub min_image_bytes: usize,
    pub min_usable_chars: usize,
}

impl From<&PipelineConfig> for ExtractionSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            scanned_pdf_threshold: config.scanned_pdf_threshold,
            ocr_timeout: config.ocr_timeout,
            min_image_bytes: config.min_image_bytes,
            min_usable_chars: config.min_usable_chars,
        }
    }
}

/// One strategy in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SelectablePdf,
    OcrPdf,
    Docx,
    OcrImage,
}

/// Tried in order; the first stage that yields non-empty text wins.
const CASCADE: &[Stage] = &[
    Stage::SelectablePdf,
    Stage::OcrPdf,
    Stage::Docx,
    Stage::OcrImage,
];

impl Stage {
    fn applies(&self, kind: DocumentKind, scanned: bool) -> bool {
        match self {
            Stage::SelectablePdf => kind == DocumentKind::Pdf,
            Stage::OcrPdf => kind == DocumentKind::Pdf && scanned,
            Stage::Docx => matches!(kind, DocumentKind::Docx | DocumentKind::Unknown),
            Stage::OcrImage => kind != DocumentKind::Pdf,
        }
    }

    fn method(&self) -> ExtractionMethod {
        match self {
            Stage::SelectablePdf => ExtractionMethod::SelectablePdf,
            Stage::OcrPdf => ExtractionMethod::OcrPdf,
            Stage::Docx => ExtractionMethod::Docx,
            Stage::OcrImage => ExtractionMethod::OcrImage,
        }
    }
}

/// Walks the extraction cascade for one upload.
/// Uses trait objects for parsers and OCR so tests can inject stubs.
pub struct DocumentExtractor {
    pdf: Arc<dyn TextParser>,
    docx: Arc<dyn TextParser>,
    ocr: Arc<dyn OcrEngine>,
    settings: ExtractionSettings,
}

impl DocumentExtractor {
    pub fn new(
        pdf: Arc<dyn TextParser>,
        docx: Arc<dyn TextParser>,
        ocr: Arc<dyn OcrEngine>,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            pdf,
            docx,
            ocr,
            settings,
        }
    }

    /// Never fails: every stage error ends up in `details` and the cascade moves on.
    /// Stages run strictly one after another.
    pub async fn extract(&self, bytes: Bytes, kind: DocumentKind) -> ExtractionResult {
        let mut result = ExtractionResult::empty();

        if bytes.is_empty() {
            result.details.error = Some("empty buffer".to_string());
            result.details.suggestion = Some(
                "O arquivo parece estar corrompido. Tente fazer upload novamente.".to_string(),
            );
            return result;
        }

        let mut scanned = false;
        for stage in CASCADE {
            if !stage.applies(kind, scanned) {
                continue;
            }
            debug!(stage = ?stage, kind = kind.as_str(), "Trying extraction stage");

            let attempt = match stage {
                Stage::SelectablePdf => self
                    .selectable_pdf(&bytes, &mut result, &mut scanned)
                    .await
                    .map(|text| (text, 1.0)),
                Stage::OcrPdf => self
                    .ocr_pdf(&bytes, &mut result)
                    .await
                    .map(|o| (o.text, o.confidence)),
                Stage::Docx => self.docx(&bytes, &mut result).await.map(|text| (text, 1.0)),
                Stage::OcrImage => self
                    .ocr_image(&bytes, &mut result)
                    .await
                    .map(|o| (o.text, o.confidence)),
            };

            if let Some((text, confidence)) = attempt.filter(|(text, _)| !text.trim().is_empty()) {
                result.accept(stage.method(), text, confidence);
                break;
            }
        }

        result.text = normalize_text(&result.text);
        let final_length = result.text_length();
        result.details.final_text_length = Some(final_length);
        result.details.text_extracted_successfully =
            Some(final_length >= self.settings.min_usable_chars);

        info!(
            method = result.method.as_str(),
            is_ocr = result.is_ocr,
            text_length = final_length,
            confidence = result.confidence,
            "Extraction finished"
        );
        result
    }

    /// Returns the text only when it is long enough to trust; otherwise marks the PDF scanned.
    async fn selectable_pdf(
        &self,
        bytes: &Bytes,
        result: &mut ExtractionResult,
        scanned: &mut bool,
    ) -> Option<String> {
        match run_parser(self.pdf.clone(), bytes.clone()).await {
            Ok(text) => {
                let length = text.trim().chars().count();
                *scanned = length < self.settings.scanned_pdf_threshold;
                result.details.is_scanned = Some(*scanned);
                result.details.initial_text_length = Some(length);
                if *scanned {
                    info!(text_length = length, "PDF looks scanned, falling back to OCR");
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                warn!("Selectable-text PDF extraction failed: {e}");
                *scanned = true;
                result.details.is_scanned = Some(true);
                result.details.initial_text_length = Some(0);
                result.details.pdf_error = Some(e.to_string());
                None
            }
        }
    }

    async fn ocr_pdf(&self, bytes: &Bytes, result: &mut ExtractionResult) -> Option<OcrOutput> {
        match self.bounded_ocr(self.ocr.recognize_pdf(bytes)).await {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("OCR on PDF failed: {e}");
                result.details.ocr_error = Some(e.to_string());
                None
            }
        }
    }

    async fn docx(&self, bytes: &Bytes, result: &mut ExtractionResult) -> Option<String> {
        match run_parser(self.docx.clone(), bytes.clone()).await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("Not a readable DOCX: {e}");
                result.details.docx_error = Some(e.to_string());
                None
            }
        }
    }

    async fn ocr_image(&self, bytes: &Bytes, result: &mut ExtractionResult) -> Option<OcrOutput> {
        if bytes.len() < self.settings.min_image_bytes {
            let e = ExtractionError::ImageTooSmall {
                len: bytes.len(),
                min: self.settings.min_image_bytes,
            };
            warn!("{e}");
            result.details.image_error = Some(e.to_string());
            return None;
        }

        match self.bounded_ocr(self.ocr.recognize_image(bytes)).await {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("OCR on image failed: {e}");
                result.details.image_error = Some(e.to_string());
                None
            }
        }
    }

    /// Races an OCR call against the OCR budget. On timeout the call is dropped
    /// and its eventual result, if any, is discarded.
    async fn bounded_ocr<F>(&self, call: F) -> Result<OcrOutput, ExtractionError>
    where
        F: std::future::Future<Output = Result<OcrOutput, ExtractionError>>,
    {
        match tokio::time::timeout(self.settings.ocr_timeout, call).await {
            Ok(output) => output,
            Err(_) => Err(ExtractionError::OcrTimeout(self.settings.ocr_timeout)),
        }
    }
}

async fn run_parser(parser: Arc<dyn TextParser>, bytes: Bytes) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || parser.parse(&bytes))
        .await
        .map_err(|e| ExtractionError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FixedParser(Result<&'static str, &'static str>);

    impl TextParser for FixedParser {
        fn parse(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            self.0
                .map(String::from)
                .map_err(|e| ExtractionError::Pdf(e.to_string()))
        }
    }

    struct PanickingParser;

    impl TextParser for PanickingParser {
        fn parse(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            panic!("malformed xref table")
        }
    }

    #[derive(Default)]
    struct CountingOcr {
        calls: AtomicUsize,
        text: &'static str,
        confidence: f32,
    }

    #[async_trait]
    impl OcrEngine for CountingOcr {
        async fn recognize_image(&self, _image: &[u8]) -> Result<OcrOutput, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(OcrOutput {
                text: self.text.to_string(),
                confidence: self.confidence,
            })
        }

        async fn recognize_pdf(&self, _pdf: &[u8]) -> Result<OcrOutput, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(OcrOutput {
                text: self.text.to_string(),
                confidence: self.confidence,
            })
        }
    }

    struct HangingOcr;

    #[async_trait]
    impl OcrEngine for HangingOcr {
        async fn recognize_image(&self, _image: &[u8]) -> Result<OcrOutput, ExtractionError> {
            std::future::pending().await
        }

        async fn recognize_pdf(&self, _pdf: &[u8]) -> Result<OcrOutput, ExtractionError> {
            std::future::pending().await
        }
    }

    fn settings() -> ExtractionSettings {
        ExtractionSettings::from(&PipelineConfig::default())
    }

    fn extractor(
        pdf: impl TextParser + 'static,
        docx: impl TextParser + 'static,
        ocr: Arc<dyn OcrEngine>,
    ) -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(pdf), Arc::new(docx), ocr, settings())
    }

    const LONG_TEXT: &str = "Maria Souza, analista administrativa com experiência em auditoria, \
        formação em Administração e habilidades em planilhas, relatórios e gestão de contratos.";

    fn image_bytes() -> Bytes {
        Bytes::from(vec![0xFFu8; 512])
    }

    #[tokio::test]
    async fn empty_buffer_short_circuits() {
        let ocr = Arc::new(CountingOcr::default());
        let extractor = extractor(FixedParser(Ok(LONG_TEXT)), FixedParser(Ok(LONG_TEXT)), ocr.clone());

        let started = std::time::Instant::now();
        let result = extractor.extract(Bytes::new(), DocumentKind::Pdf).await;

        assert_eq!(result.text, "");
        assert_eq!(result.details.error.as_deref(), Some("empty buffer"));
        assert!(result.details.suggestion.is_some());
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn selectable_pdf_never_invokes_ocr() {
        let ocr = Arc::new(CountingOcr {
            text: "ocr text",
            confidence: 0.9,
            ..CountingOcr::default()
        });
        let extractor = extractor(FixedParser(Ok(LONG_TEXT)), FixedParser(Err("no")), ocr.clone());

        let result = extractor
            .extract(Bytes::from_static(b"%PDF-1.4"), DocumentKind::Pdf)
            .await;

        assert_eq!(result.method, ExtractionMethod::SelectablePdf);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.is_ocr);
        assert_eq!(result.details.is_scanned, Some(false));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_pdf_text_falls_through_to_ocr() {
        let ocr = Arc::new(CountingOcr {
            text: LONG_TEXT,
            confidence: 0.82,
            ..CountingOcr::default()
        });
        let extractor = extractor(FixedParser(Ok("Page 1")), FixedParser(Err("no")), ocr.clone());

        let result = extractor
            .extract(Bytes::from_static(b"%PDF-1.4"), DocumentKind::Pdf)
            .await;

        assert_eq!(result.method, ExtractionMethod::OcrPdf);
        assert!(result.is_ocr);
        assert!(!result.is_image);
        assert!((result.confidence - 0.82).abs() < 1e-6);
        assert_eq!(result.details.is_scanned, Some(true));
        assert_eq!(result.details.initial_text_length, Some(6));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn broken_pdf_is_treated_as_scanned() {
        let ocr = Arc::new(CountingOcr::default());
        let extractor = extractor(FixedParser(Err("bad xref")), FixedParser(Err("no")), ocr.clone());

        let result = extractor
            .extract(Bytes::from_static(b"%PDF-1.4"), DocumentKind::Pdf)
            .await;

        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(result.details.is_scanned, Some(true));
        assert!(result.details.pdf_error.as_deref().unwrap().contains("bad xref"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        // PDFs never fall through to DOCX or image OCR.
        assert!(result.details.docx_error.is_none());
        assert!(result.details.image_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_ocr_on_pdf_resolves_empty_within_budget() {
        let extractor = extractor(FixedParser(Ok("")), FixedParser(Err("no")), Arc::new(HangingOcr));

        let started = tokio::time::Instant::now();
        let result = extractor
            .extract(Bytes::from_static(b"%PDF-1.4"), DocumentKind::Pdf)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result.details.ocr_error.as_deref().unwrap().contains("OCR exceeded"));
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11));
    }

    #[tokio::test]
    async fn docx_wins_for_docx_kind() {
        let ocr = Arc::new(CountingOcr::default());
        let extractor = extractor(FixedParser(Err("no")), FixedParser(Ok(LONG_TEXT)), ocr.clone());

        let result = extractor.extract(image_bytes(), DocumentKind::Docx).await;

        assert_eq!(result.method, ExtractionMethod::Docx);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_kind_falls_back_from_docx_to_image_ocr() {
        let ocr = Arc::new(CountingOcr {
            text: LONG_TEXT,
            confidence: 0.64,
            ..CountingOcr::default()
        });
        let extractor = extractor(FixedParser(Err("no")), FixedParser(Err("not a zip")), ocr.clone());

        let result = extractor.extract(image_bytes(), DocumentKind::Unknown).await;

        assert_eq!(result.method, ExtractionMethod::OcrImage);
        assert!(result.is_ocr && result.is_image);
        assert!(result.details.docx_error.as_deref().unwrap().contains("not a zip"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn image_kind_skips_docx() {
        let ocr = Arc::new(CountingOcr {
            text: LONG_TEXT,
            confidence: 0.9,
            ..CountingOcr::default()
        });
        let extractor = extractor(FixedParser(Err("no")), FixedParser(Ok("docx text")), ocr);

        let result = extractor.extract(image_bytes(), DocumentKind::Image).await;

        assert_eq!(result.method, ExtractionMethod::OcrImage);
        assert!(result.details.docx_error.is_none());
    }

    #[tokio::test]
    async fn tiny_image_is_not_sent_to_ocr() {
        let ocr = Arc::new(CountingOcr {
            text: LONG_TEXT,
            confidence: 0.9,
            ..CountingOcr::default()
        });
        let extractor = extractor(FixedParser(Err("no")), FixedParser(Err("no")), ocr.clone());

        let result = extractor
            .extract(Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]), DocumentKind::Image)
            .await;

        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result.details.image_error.as_deref().unwrap().contains("too small"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn parser_panic_is_contained() {
        let extractor = extractor(PanickingParser, FixedParser(Err("no")), Arc::new(CountingOcr::default()));

        let result = extractor
            .extract(Bytes::from_static(b"%PDF-1.4"), DocumentKind::Pdf)
            .await;

        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result.details.pdf_error.as_deref().unwrap().contains("parser task failed"));
    }

    #[tokio::test]
    async fn winning_text_is_normalized() {
        let extractor = extractor(
            FixedParser(Err("no")),
            FixedParser(Ok("  Maria\t\tSouza\r\n\r\n\r\n\r\nAnalista  ")),
            Arc::new(CountingOcr::default()),
        );

        let result = extractor.extract(image_bytes(), DocumentKind::Docx).await;

        assert_eq!(result.text, "Maria Souza\n\nAnalista");
        assert_eq!(result.details.final_text_length, Some(result.text_length()));
        assert_eq!(result.details.text_extracted_successfully, Some(false));
    }
}
