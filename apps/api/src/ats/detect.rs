use serde::{Deserialize, Serialize};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Content classification of an upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
    Unknown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub kind: DocumentKind,
    /// MIME type taken from content when sniffing succeeded, otherwise the declared one.
    pub mime: String,
    pub sniffed: bool,
}

/// Classifies a buffer from its magic bytes, falling back to the declared MIME.
/// Never fails: `Unknown` is a valid answer.
pub fn detect_document(bytes: &[u8], declared_mime: Option<&str>) -> Detection {
    if let Some((kind, mime)) = sniff(bytes) {
        // A ZIP without a Word part could still be a DOCX the client labelled correctly.
        if kind != DocumentKind::Unknown {
            return Detection {
                kind,
                mime: mime.to_string(),
                sniffed: true,
            };
        }
    }

    let declared = declared_mime
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());

    let kind = match declared.as_deref() {
        Some("application/pdf") => DocumentKind::Pdf,
        Some(DOCX_MIME) => DocumentKind::Docx,
        Some(m) if m.starts_with("image/") => DocumentKind::Image,
        _ => DocumentKind::Unknown,
    };

    Detection {
        kind,
        mime: declared.unwrap_or_else(|| "application/octet-stream".to_string()),
        sniffed: false,
    }
}

/// Magic-number sniffing. Returns `Unknown` for a ZIP container that holds no Word part.
fn sniff(bytes: &[u8]) -> Option<(DocumentKind, &'static str)> {
    let head = &bytes[..bytes.len().min(1024)];

    // The PDF header may be preceded by junk; readers accept it within the first 1 KiB.
    if find(head, b"%PDF-").is_some() {
        return Some((DocumentKind::Pdf, "application/pdf"));
    }

    match bytes {
        [b'P', b'K', 0x03, 0x04, ..] => {
            if find(bytes, b"word/").is_some() {
                Some((DocumentKind::Docx, DOCX_MIME))
            } else {
                Some((DocumentKind::Unknown, "application/zip"))
            }
        }
        [0xFF, 0xD8, 0xFF, ..] => Some((DocumentKind::Image, "image/jpeg")),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => {
            Some((DocumentKind::Image, "image/png"))
        }
        [b'G', b'I', b'F', b'8', ..] => Some((DocumentKind::Image, "image/gif")),
        [b'B', b'M', ..] if bytes.len() > 14 => Some((DocumentKind::Image, "image/bmp")),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            Some((DocumentKind::Image, "image/tiff"))
        }
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
            Some((DocumentKind::Image, "image/webp"))
        }
        _ => None,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn sniffs_pdf_regardless_of_declared_type() {
        let detection = detect_document(b"%PDF-1.7\n...", Some("image/png"));
        assert_eq!(detection.kind, DocumentKind::Pdf);
        assert_eq!(detection.mime, "application/pdf");
        assert!(detection.sniffed);
    }

    #[test]
    fn sniffs_pdf_after_leading_junk() {
        let mut bytes = vec![b'\n'; 20];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert_eq!(detect_document(&bytes, None).kind, DocumentKind::Pdf);
    }

    #[test]
    fn sniffs_docx_zip() {
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend_from_slice(&[0u8; 26]);
        bytes.extend_from_slice(b"word/document.xml");
        let detection = detect_document(&bytes, Some("application/octet-stream"));
        assert_eq!(detection.kind, DocumentKind::Docx);
        assert_eq!(detection.mime, DOCX_MIME);
    }

    #[test]
    fn plain_zip_falls_back_to_declared_mime() {
        let bytes = b"PK\x03\x04xl/workbook.xml";
        assert_eq!(detect_document(bytes, None).kind, DocumentKind::Unknown);
        assert_eq!(
            detect_document(bytes, Some(DOCX_MIME)).kind,
            DocumentKind::Docx
        );
    }

    #[test]
    fn sniffs_images() {
        assert_eq!(detect_document(PNG_HEADER, None).kind, DocumentKind::Image);
        assert_eq!(
            detect_document(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 16], None).mime,
            "image/jpeg"
        );
        assert_eq!(
            detect_document(b"RIFF\x10\x00\x00\x00WEBPVP8 ", None).mime,
            "image/webp"
        );
    }

    #[test]
    fn declared_mime_used_when_sniffing_is_inconclusive() {
        let text = b"just some bytes";
        assert_eq!(
            detect_document(text, Some("application/pdf")).kind,
            DocumentKind::Pdf
        );
        assert_eq!(
            detect_document(text, Some("image/jpeg; charset=binary")).kind,
            DocumentKind::Image
        );
        let detection = detect_document(text, Some("IMAGE/PNG"));
        assert_eq!(detection.kind, DocumentKind::Image);
        assert!(!detection.sniffed);
    }

    #[test]
    fn unusable_inputs_are_unknown() {
        assert_eq!(detect_document(&[], None).kind, DocumentKind::Unknown);
        assert_eq!(
            detect_document(b"hello", Some("application/octet-stream")).kind,
            DocumentKind::Unknown
        );
        let detection = detect_document(b"hello", Some("  "));
        assert_eq!(detection.kind, DocumentKind::Unknown);
        assert_eq!(detection.mime, "application/octet-stream");
    }
}
