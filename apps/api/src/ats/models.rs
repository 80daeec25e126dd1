use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

/// One received upload. Lives for a single request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Bytes,
    /// Content type sent by the client for the file part.
    pub declared_mime: Option<String>,
    /// Filled in by content sniffing once the pipeline starts.
    pub detected_mime: Option<String>,
    pub file_name: Option<String>,
    pub size: usize,
}

impl UploadedDocument {
    pub fn new(bytes: Bytes, declared_mime: Option<String>, file_name: Option<String>) -> Self {
        let size = bytes.len();
        Self {
            bytes,
            declared_mime,
            detected_mime: None,
            file_name,
            size,
        }
    }
}

/// Résumé form fields concatenated first, in this order.
const KNOWN_FIELDS: &[&str] = &[
    "nome",
    "cargo",
    "objetivo",
    "experiencia",
    "formacao",
    "habilidades",
    "cursos",
    "empresa1",
    "funcao1",
    "empresa2",
    "funcao2",
    "empresa3",
    "funcao3",
];

/// Body of `POST /api/ats-analyze-data`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeDataRequest {
    pub data: Option<BTreeMap<String, Value>>,
}

/// Joins the form fields into one text blob for scoring. Known résumé fields
/// come first; every other string or number field follows in key order.
pub fn compose_form_text(data: &BTreeMap<String, Value>) -> String {
    let mut parts: Vec<String> = KNOWN_FIELDS
        .iter()
        .filter_map(|key| data.get(*key).and_then(field_text))
        .collect();

    parts.extend(
        data.iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .filter_map(|(_, value)| field_text(value)),
    );

    parts.join("\n")
}

fn field_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
