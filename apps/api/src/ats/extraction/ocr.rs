//! OCR engine seam and the Tesseract subprocess implementation.
//!
//! Implementations must release everything they hold when their future is
//! dropped: the cascade enforces its budget with `tokio::time::timeout`, which
//! drops the in-flight call. For an engine that cannot be interrupted this is a
//! liveness guarantee only; the late result is discarded by whoever dropped it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tracing::{debug, warn};

use super::types::OcrOutput;
use super::ExtractionError;
use crate::config::OcrConfig;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize_image(&self, image: &[u8]) -> Result<OcrOutput, ExtractionError>;

    /// OCR of a scanned PDF. Engine-dependent: the PDF is treated as a rasterizable source.
    async fn recognize_pdf(&self, pdf: &[u8]) -> Result<OcrOutput, ExtractionError>;
}

/// Tesseract CLI with TSV output. Every invocation writes its input to a uniquely
/// named temp file that is removed on drop, on every exit path.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    pdftoppm: Option<PathBuf>,
    pdf_max_pages: u32,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.language.clone(),
            pdftoppm: config.pdftoppm_path.clone(),
            pdf_max_pages: config.pdf_max_pages.max(1),
        }
    }

    async fn run_tesseract(&self, input: &Path) -> Result<OcrOutput, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::Ocr(format!("failed to start tesseract: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Renders the first pages to PNG with `pdftoppm` and OCRs each one.
    async fn recognize_rasterized(
        &self,
        pdftoppm: &Path,
        pdf: &[u8],
    ) -> Result<OcrOutput, ExtractionError> {
        let contents = pdf.to_vec();
        let workdir = tokio::task::spawn_blocking(move || -> Result<TempDir, ExtractionError> {
            let workdir = tempfile::Builder::new().prefix("ocr-pdf-").tempdir()?;
            std::fs::write(workdir.path().join("input.pdf"), contents)?;
            Ok(workdir)
        })
        .await
        .map_err(|e| ExtractionError::TaskFailed(e.to_string()))??;
        let input = workdir.path().join("input.pdf");

        let status = Command::new(pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg("200")
            .arg("-l")
            .arg(self.pdf_max_pages.to_string())
            .arg(&input)
            .arg(workdir.path().join("page"))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| ExtractionError::Ocr(format!("failed to start pdftoppm: {e}")))?;
        if !status.success() {
            return Err(ExtractionError::Ocr(format!("pdftoppm exited with {status}")));
        }

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(workdir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                pages.push(path);
            }
        }
        // page-1.png, page-2.png, ... (zero-padded when the document has many pages)
        pages.sort();

        let mut outputs = Vec::with_capacity(pages.len());
        for page in &pages {
            outputs.push(self.run_tesseract(page).await?);
        }
        debug!(pages = outputs.len(), "Rasterized PDF pages OCR'd");
        Ok(merge_pages(outputs))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize_image(&self, image: &[u8]) -> Result<OcrOutput, ExtractionError> {
        let file = write_temp_input("ocr-", ".img", image.to_vec()).await?;
        self.run_tesseract(file.path()).await
    }

    async fn recognize_pdf(&self, pdf: &[u8]) -> Result<OcrOutput, ExtractionError> {
        if let Some(pdftoppm) = &self.pdftoppm {
            return self.recognize_rasterized(pdftoppm, pdf).await;
        }

        warn!("PDFTOPPM_PATH not set; handing the PDF to tesseract directly");
        let file = write_temp_input("ocr-pdf-", ".pdf", pdf.to_vec()).await?;
        self.run_tesseract(file.path()).await
    }
}

/// Creates and fills the engine's input file on the blocking pool. The blocking
/// task owns the handle until it returns, so a caller dropped mid-write still
/// leaves the file to be deleted by whoever drops the handle last.
async fn write_temp_input(
    prefix: &'static str,
    suffix: &'static str,
    contents: Vec<u8>,
) -> Result<NamedTempFile, ExtractionError> {
    tokio::task::spawn_blocking(move || -> Result<NamedTempFile, ExtractionError> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        file.write_all(&contents)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| ExtractionError::TaskFailed(e.to_string()))?
}

/// Rebuilds text from Tesseract TSV output.
///
/// Words on the same line are joined by spaces, lines by `\n`, paragraphs and
/// blocks by a blank line. Confidence is the mean word confidence scaled to 0–1.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut text = String::new();
    let mut conf_sum = 0.0_f64;
    let mut conf_count = 0usize;
    let mut last_paragraph: Option<(u32, u32, u32)> = None;
    let mut last_line: Option<u32> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let number = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let paragraph = (number(1), number(2), number(3));
        let line = number(4);

        match last_paragraph {
            Some(p) if p != paragraph => text.push_str("\n\n"),
            Some(_) if last_line != Some(line) => text.push('\n'),
            Some(_) => text.push(' '),
            None => {}
        }
        text.push_str(word);
        last_paragraph = Some(paragraph);
        last_line = Some(line);

        if let Ok(conf) = cols[10].parse::<f64>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let confidence = if conf_count > 0 {
        (conf_sum / conf_count as f64 / 100.0) as f32
    } else {
        0.0
    };

    OcrOutput {
        text,
        confidence: confidence.clamp(0.0, 1.0),
    }
}

/// Joins per-page OCR output; confidence is weighted by each page's text length.
fn merge_pages(pages: Vec<OcrOutput>) -> OcrOutput {
    let total_chars: usize = pages.iter().map(|p| p.text.chars().count()).sum();
    if total_chars == 0 {
        return OcrOutput::default();
    }
    let confidence = pages
        .iter()
        .map(|p| p.confidence * p.text.chars().count() as f32)
        .sum::<f32>()
        / total_chars as f32;
    let text = pages
        .into_iter()
        .map(|p| p.text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    OcrOutput { text, confidence }
}
