use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ats::detect::detect_document;
use crate::ats::extraction::{DocumentExtractor, ExtractionResult};
use crate::ats::models::UploadedDocument;
use crate::ats::scoring::{score_resume, AtsReport, ProcessingInfo};
use crate::config::PipelineConfig;
use crate::errors::AppError;

/// Single write path for a request's outcome. The first `send` wins; later
/// calls are no-ops that return `false`.
pub struct Responder<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Responder<T> {
    pub fn new(sender: oneshot::Sender<T>) -> Self {
        Self {
            slot: Mutex::new(Some(sender)),
        }
    }

    pub fn send(&self, value: T) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(sender) => sender.send(value).is_ok(),
            None => false,
        }
    }
}

/// Runs `work` as its own task and races it against `budget`.
///
/// Exactly one outcome is produced: the worker's result, a 500 if the worker
/// panicked, or `AppError::Timeout` if the budget elapsed first. The watchdog
/// is aborted as soon as an outcome has been delivered. A worker that loses the
/// race keeps running until its own inner budgets expire; its result is dropped.
pub async fn respond_within<T, F>(budget: Duration, work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    let (outcome, _watchdog) = race_budget(budget, work).await;
    outcome
}

/// Returns the delivered outcome and the (already aborted) watchdog handle.
async fn race_budget<T, F>(budget: Duration, work: F) -> (Result<T, AppError>, JoinHandle<()>)
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let responder = Arc::new(Responder::new(tx));

    let worker = tokio::spawn(work);
    {
        let responder = responder.clone();
        tokio::spawn(async move {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(AppError::Internal(anyhow!("analysis task failed: {e}"))),
            };
            if !responder.send(outcome) {
                debug!("Late analysis result discarded");
            }
        });
    }
    let watchdog = {
        let responder = responder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            if responder.send(Err(AppError::Timeout)) {
                warn!(budget_secs = budget.as_secs(), "Request budget exceeded");
            }
        })
    };

    let outcome = rx.await;
    watchdog.abort();

    let outcome =
        outcome.unwrap_or_else(|_| Err(AppError::Internal(anyhow!("no response was produced"))));
    (outcome, watchdog)
}

/// Upload → detect → extract → validate → score.
pub async fn analyze_document(
    extractor: &DocumentExtractor,
    config: &PipelineConfig,
    mut document: UploadedDocument,
    request_id: &str,
) -> Result<AtsReport, AppError> {
    if document.size == 0 {
        return Err(AppError::EmptyFile);
    }
    if document.size > config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge {
            limit_bytes: config.max_upload_bytes,
        });
    }

    let detection = detect_document(&document.bytes, document.declared_mime.as_deref());
    document.detected_mime = Some(detection.mime);
    info!(
        request_id,
        file_name = document.file_name.as_deref().unwrap_or("-"),
        size = document.size,
        kind = detection.kind.as_str(),
        mime = document.detected_mime.as_deref().unwrap_or("-"),
        sniffed = detection.sniffed,
        "Processing upload"
    );

    let extraction = match tokio::time::timeout(
        config.extraction_timeout,
        extractor.extract(document.bytes.clone(), detection.kind),
    )
    .await
    {
        Ok(extraction) => extraction,
        Err(_) => {
            warn!(request_id, "Extraction exceeded {:?}", config.extraction_timeout);
            return Err(AppError::Unprocessable {
                error: "Processamento timeout".to_string(),
                message: "O arquivo demorou muito para ser processado. Pode estar corrompido ou ser uma imagem muito grande. Tente com outro arquivo."
                    .to_string(),
                debug: None,
            });
        }
    };

    let text_length = extraction.text_length();
    if text_length < config.min_usable_chars {
        error!(
            request_id,
            text_length,
            method = extraction.method.as_str(),
            "Insufficient text extracted"
        );
        return Err(diagnose_unusable(&extraction, config));
    }

    let mut report = score_resume(&extraction.text);
    report.processing_info = Some(ProcessingInfo {
        method: extraction.method.as_str().to_string(),
        is_ocr: extraction.is_ocr,
        is_image: extraction.is_image,
        confidence: confidence_percent(extraction.confidence),
        text_length,
    });

    info!(request_id, score = report.score, "Analysis finished");
    Ok(report)
}

/// Picks the most actionable explanation for an extraction that came back too short.
pub fn diagnose_unusable(extraction: &ExtractionResult, config: &PipelineConfig) -> AppError {
    let details = &extraction.details;
    let message = if details.error.as_deref() == Some("empty buffer") {
        "O arquivo parece estar corrompido. Tente fazer upload novamente.".to_string()
    } else if details.is_scanned == Some(true) && !extraction.is_ocr {
        "PDF escaneado detectado mas OCR falhou. O arquivo pode ter imagem de baixa qualidade."
            .to_string()
    } else if extraction.is_ocr && extraction.confidence < config.low_confidence_threshold {
        format!(
            "OCR com baixa confiança ({}%). Tente com arquivo de melhor qualidade.",
            confidence_percent(extraction.confidence)
        )
    } else if let Some(error) = &details.error {
        format!("Erro ao processar: {error}")
    } else {
        "Conteúdo insuficiente ou ilegível.".to_string()
    };

    AppError::Unprocessable {
        error: "Conteúdo não processável".to_string(),
        message,
        debug: Some(json!({
            "method": extraction.method.as_str(),
            "textLength": extraction.text_length(),
            "isOCR": extraction.is_ocr,
            "confidence": extraction.confidence,
        })),
    }
}

fn confidence_percent(confidence: f32) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}
