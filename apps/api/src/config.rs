use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Deployment flavour. Local runs get permissive CORS; deployed runs are
/// restricted to `ALLOWED_ORIGINS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => bail!("unknown APP_ENV '{other}' (expected development or production)"),
        }
    }
}

/// Thresholds and time budgets of the upload-to-score pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_upload_bytes: usize,
    pub ocr_timeout: Duration,
    pub extraction_timeout: Duration,
    pub request_timeout: Duration,
    /// Selectable-text length below which a PDF is treated as scanned.
    /// Unvalidated heuristic: short real résumés may be misclassified.
    pub scanned_pdf_threshold: usize,
    pub min_usable_chars: usize,
    /// OCR confidence (0–1) below which a failed upload is reported as low-confidence.
    pub low_confidence_threshold: f32,
    pub min_image_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            ocr_timeout: Duration::from_secs(10),
            extraction_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(25),
            scanned_pdf_threshold: 100,
            min_usable_chars: 50,
            low_confidence_threshold: 0.5,
            min_image_bytes: 100,
        }
    }
}

impl PipelineConfig {
    /// Budgets must nest: OCR < extraction < request.
    pub fn validate(&self) -> Result<()> {
        if self.ocr_timeout >= self.extraction_timeout {
            bail!(
                "OCR_TIMEOUT_SECS ({:?}) must be shorter than EXTRACTION_TIMEOUT_SECS ({:?})",
                self.ocr_timeout,
                self.extraction_timeout
            );
        }
        if self.extraction_timeout >= self.request_timeout {
            bail!(
                "EXTRACTION_TIMEOUT_SECS ({:?}) must be shorter than REQUEST_TIMEOUT_SECS ({:?})",
                self.extraction_timeout,
                self.request_timeout
            );
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            bail!("LOW_CONFIDENCE_THRESHOLD must be within [0, 1]");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_path: PathBuf,
    pub language: String,
    pub pdftoppm_path: Option<PathBuf>,
    pub pdf_max_pages: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language: "por".to_string(),
            pdftoppm_path: None,
            pdf_max_pages: 3,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values abort startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    pub pipeline: PipelineConfig,
    pub ocr: OcrConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            ocr_timeout: Duration::from_secs(env_or("OCR_TIMEOUT_SECS", 10)?),
            extraction_timeout: Duration::from_secs(env_or("EXTRACTION_TIMEOUT_SECS", 15)?),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 25)?),
            scanned_pdf_threshold: env_or("SCANNED_PDF_THRESHOLD", defaults.scanned_pdf_threshold)?,
            min_usable_chars: env_or("MIN_USABLE_CHARS", defaults.min_usable_chars)?,
            low_confidence_threshold: env_or(
                "LOW_CONFIDENCE_THRESHOLD",
                defaults.low_confidence_threshold,
            )?,
            min_image_bytes: env_or("MIN_IMAGE_BYTES", defaults.min_image_bytes)?,
        };
        pipeline.validate()?;

        let ocr = OcrConfig {
            tesseract_path: env_or("TESSERACT_PATH", PathBuf::from("tesseract"))?,
            language: env_or("OCR_LANGUAGE", "por".to_string())?,
            pdftoppm_path: optional_env("PDFTOPPM_PATH").map(PathBuf::from),
            pdf_max_pages: env_or("OCR_PDF_MAX_PAGES", 3)?,
        };

        Ok(Config {
            port: env_or("PORT", 3000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            environment: env_or("APP_ENV", Environment::Development)?,
            allowed_origins: parse_list(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "https://gerador-curriculos.vercel.app".to_string()),
            ),
            pipeline,
            ocr,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'"))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets_nest() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_ocr_budget_longer_than_extraction() {
        let config = PipelineConfig {
            ocr_timeout: Duration::from_secs(20),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_extraction_budget_longer_than_request() {
        let config = PipelineConfig {
            extraction_timeout: Duration::from_secs(30),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_environment_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Local".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn parse_value_reports_key_on_failure() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(format!("{err:#}").contains("PORT"));
    }

    #[test]
    fn parse_list_skips_blanks() {
        assert_eq!(
            parse_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
