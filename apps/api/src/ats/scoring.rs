//! ATS heuristic scorer.
//!
//! Four additive rules (contact, section coverage, action verbs, content volume)
//! are summed in floating point, rounded, and clamped to `[0, 100]`. Pure and
//! deterministic; callers pass already-normalized text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("valid email pattern"));

// Brazilian phone: optional parenthesised area code, 4–5 digit prefix, 4-digit suffix.
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\d{2}\)?\s?\d{4,5}-?\d{4}").expect("valid phone pattern")
});

struct Section {
    name: &'static str,
    keywords: &'static [&'static str],
}

const SECTIONS: &[Section] = &[
    Section {
        name: "Experiência",
        keywords: &["experiência", "histórico profissional", "atuação", "trajetória"],
    },
    Section {
        name: "Formação",
        keywords: &["formação", "escolaridade", "educação", "graduação", "acadêmico"],
    },
    Section {
        name: "Habilidades",
        keywords: &["habilidades", "competências", "conhecimentos", "skills", "tecnologias"],
    },
    Section {
        name: "Objetivo",
        keywords: &["objetivo", "resumo", "perfil"],
    },
];

const ACTION_VERBS: &[&str] = &[
    "realizei",
    "desenvolvi",
    "coordenei",
    "liderei",
    "apliquei",
    "gerenciei",
    "otimizei",
    "implementei",
    "colaborei",
    "atuei",
];

const FULL_VERB_CREDIT_AT: usize = 5;
const FULL_VOLUME_ABOVE_WORDS: usize = 300;
const PARTIAL_VOLUME_FROM_WORDS: usize = 150;

const FALLBACK_STRENGTH: &str = "Formato de arquivo compatível para leitura.";
const FORMATTING_TIP: &str =
    "Mantenha um layout limpo, com fontes padrão e sem tabelas ou colunas complexas.";

/// Maximum points per rule. Defaults sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub contact: f64,
    pub sections: f64,
    pub action_verbs: f64,
    pub volume: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            contact: 15.0,
            sections: 25.0,
            action_verbs: 30.0,
            volume: 30.0,
        }
    }
}

/// How a file upload was turned into text. Present only on the file path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingInfo {
    pub method: String,
    #[serde(rename = "isOCR")]
    pub is_ocr: bool,
    #[serde(rename = "isImage")]
    pub is_image: bool,
    /// Percentage, 0–100.
    pub confidence: u8,
    #[serde(rename = "textLength")]
    pub text_length: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AtsReport {
    pub score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(rename = "processingInfo", skip_serializing_if = "Option::is_none", default)]
    pub processing_info: Option<ProcessingInfo>,
}

pub fn score_resume(text: &str) -> AtsReport {
    score_resume_with(text, &ScoringWeights::default())
}

pub fn score_resume_with(text: &str, weights: &ScoringWeights) -> AtsReport {
    let mut report = AtsReport::default();
    if text.trim().is_empty() {
        return report;
    }

    let lower = text.to_lowercase();
    let mut score = 0.0_f64;

    // Contact
    if EMAIL_PATTERN.is_match(text) && PHONE_PATTERN.is_match(text) {
        score += weights.contact;
        report
            .strengths
            .push("Informações de contato completas (email e telefone).".to_string());
    } else {
        report
            .improvements
            .push("Faltam informações de contato claras.".to_string());
        report
            .suggestions
            .push("Certifique-se de que seu email e telefone estão bem visíveis.".to_string());
    }

    // Sections
    let mut sections_found = 0usize;
    for section in SECTIONS {
        if section.keywords.iter().any(|k| lower.contains(k)) {
            sections_found += 1;
        } else {
            report.improvements.push(format!(
                "Seção de {} não identificada claramente.",
                section.name
            ));
        }
    }
    score += sections_found as f64 / SECTIONS.len() as f64 * weights.sections;
    if sections_found == SECTIONS.len() {
        report
            .strengths
            .push("Estrutura bem definida com todas as seções essenciais.".to_string());
    }

    // Action verbs
    let verbs_found = ACTION_VERBS.iter().filter(|v| lower.contains(*v)).count();
    if verbs_found >= FULL_VERB_CREDIT_AT {
        score += weights.action_verbs;
        report
            .strengths
            .push("Bom uso de verbos de ação para descrever experiências.".to_string());
    } else if verbs_found > 0 {
        score += weights.action_verbs / 2.0;
        report
            .improvements
            .push("Pode usar mais verbos de ação para destacar conquistas.".to_string());
        report.suggestions.push(
            "Use palavras como 'gerenciei', 'desenvolvi' ou 'otimizei' em vez de apenas 'fiz'."
                .to_string(),
        );
    } else {
        report
            .improvements
            .push("Faltam termos de impacto nas descrições.".to_string());
    }

    // Volume
    let word_count = text.split_whitespace().count();
    if word_count > FULL_VOLUME_ABOVE_WORDS {
        score += weights.volume;
        report
            .strengths
            .push("Conteúdo detalhado e informativo.".to_string());
    } else if word_count >= PARTIAL_VOLUME_FROM_WORDS {
        score += weights.volume / 2.0;
        report
            .improvements
            .push("O currículo está um pouco curto.".to_string());
        report.suggestions.push(
            "Tente detalhar mais suas responsabilidades e resultados alcançados.".to_string(),
        );
    } else {
        report
            .improvements
            .push("Conteúdo muito escasso para uma análise profunda.".to_string());
    }

    report.score = clamp_score(score);

    if report.strengths.is_empty() {
        report.strengths.push(FALLBACK_STRENGTH.to_string());
    }
    report.suggestions.push(FORMATTING_TIP.to_string());

    report
}

fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
