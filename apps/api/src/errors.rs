use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders as `{ "error": ..., "message": ..., "debug"?: ... }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Payload exceeds {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: usize },

    #[error("Processing timeout")]
    Timeout,

    #[error("Unprocessable content: {message}")]
    Unprocessable {
        error: String,
        message: String,
        debug: Option<Value>,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile
            | AppError::EmptyFile
            | AppError::Validation(_)
            | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, debug) = match self {
            AppError::MissingFile => (
                "Arquivo não encontrado".to_string(),
                "Nenhum arquivo foi enviado. Verifique se o upload foi completado.".to_string(),
                None,
            ),
            AppError::EmptyFile => (
                "Arquivo vazio".to_string(),
                "O arquivo enviado está vazio. Tente novamente com um arquivo válido.".to_string(),
                None,
            ),
            AppError::Validation(msg) => ("Dados inválidos".to_string(), msg, None),
            AppError::Upload(msg) => {
                tracing::warn!("Upload error: {msg}");
                (
                    "Erro no upload de arquivo".to_string(),
                    "Não foi possível ler o arquivo enviado.".to_string(),
                    None,
                )
            }
            AppError::PayloadTooLarge { limit_bytes } => (
                "Arquivo muito grande".to_string(),
                format!(
                    "Arquivo excede o tamanho máximo permitido ({}MB).",
                    limit_bytes / 1024 / 1024
                ),
                None,
            ),
            AppError::Timeout => (
                "Timeout na análise".to_string(),
                "O processamento demorou muito. Tente novamente com um arquivo menor ou de melhor qualidade."
                    .to_string(),
                None,
            ),
            AppError::Unprocessable {
                error,
                message,
                debug,
            } => (error, message, debug),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    "Erro ao processar arquivo".to_string(),
                    "Ocorreu um erro inesperado. Tente novamente com outro arquivo.".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": error,
            "message": message,
        });
        if let Some(debug) = debug {
            body["debug"] = debug;
        }

        (status, Json(body)).into_response()
    }
}
