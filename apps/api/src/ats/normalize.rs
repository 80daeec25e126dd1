/// Normalizes extracted text before scoring.
///
/// Control characters (0x00–0x08, 0x0B–0x0C, 0x0E–0x1F, 0x7F) and tabs become a
/// single space, runs of spaces collapse to one, CRLF/CR become LF, three or more
/// consecutive newlines collapse to a paragraph break, and the result is trimmed.
/// Idempotent: `normalize_text(&normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if is_stripped_control(c) { ' ' } else { c };
        if c == ' ' && spaced.ends_with(' ') {
            continue;
        }
        spaced.push(c);
    }

    let unix = spaced.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unix.len());
    let mut newline_run = 0usize;
    for c in unix.chars() {
        if c == '\n' {
            newline_run += 1;
            if newline_run > 2 {
                continue;
            }
        } else {
            newline_run = 0;
        }
        out.push(c);
    }

    out.trim().to_string()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\t' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}
