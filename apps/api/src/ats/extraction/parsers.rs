use super::ExtractionError;

/// Deterministic text parser for one container format.
/// Implementations are synchronous and may be CPU-heavy; the cascade runs them
/// on the blocking pool and contains their panics.
pub trait TextParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Selectable-text PDF extraction via `pdf-extract`.
pub struct PdfTextParser;

impl TextParser for PdfTextParser {
    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map(|text| text.trim().to_string())
            .map_err(|e| ExtractionError::Pdf(e.to_string()))
    }
}

/// Raw text of a Word document: one line per paragraph, table cells included.
pub struct DocxParser;

impl TextParser for DocxParser {
    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        use docx_rs::DocumentChild;

        let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
                DocumentChild::Table(table) => push_table(table, &mut lines),
                DocumentChild::StructuredDataTag(tag) => push_tag(tag, &mut lines),
                _ => {}
            }
        }

        Ok(lines.join("\n").trim().to_string())
    }
}

fn push_table(table: &docx_rs::Table, lines: &mut Vec<String>) {
    use docx_rs::{TableCellContent, TableChild, TableRowChild};

    for TableChild::TableRow(row) in &table.rows {
        for TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
                    TableCellContent::Table(nested) => push_table(nested, lines),
                    TableCellContent::StructuredDataTag(tag) => push_tag(tag, lines),
                    _ => {}
                }
            }
        }
    }
}

/// Content controls wrap runs, paragraphs or whole tables.
fn push_tag(tag: &docx_rs::StructuredDataTag, lines: &mut Vec<String>) {
    use docx_rs::StructuredDataTagChild;

    let mut inline = String::new();
    for child in &tag.children {
        match child {
            StructuredDataTagChild::Run(run) => push_run(run, &mut inline),
            StructuredDataTagChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            StructuredDataTagChild::Table(table) => push_table(table, lines),
            StructuredDataTagChild::StructuredDataTag(nested) => push_tag(nested, lines),
            _ => {}
        }
    }
    if !inline.is_empty() {
        lines.push(inline);
    }
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut line = String::new();
    for child in &paragraph.children {
        push_paragraph_child(child, &mut line);
    }
    line
}

fn push_paragraph_child(child: &docx_rs::ParagraphChild, line: &mut String) {
    use docx_rs::{InsertChild, ParagraphChild, StructuredDataTagChild};

    match child {
        ParagraphChild::Run(run) => push_run(run, line),
        ParagraphChild::Hyperlink(link) => {
            for nested in &link.children {
                push_paragraph_child(nested, line);
            }
        }
        // Tracked insertions are part of the visible text; deletions are not.
        ParagraphChild::Insert(insert) => {
            for nested in &insert.children {
                if let InsertChild::Run(run) = nested {
                    push_run(run, line);
                }
            }
        }
        ParagraphChild::StructuredDataTag(tag) => {
            for nested in &tag.children {
                if let StructuredDataTagChild::Run(run) = nested {
                    push_run(run, line);
                }
            }
        }
        _ => {}
    }
}

fn push_run(run: &docx_rs::Run, line: &mut String) {
    use docx_rs::RunChild;

    for child in &run.children {
        match child {
            RunChild::Text(t) => line.push_str(&t.text),
            RunChild::Tab(_) => line.push(' '),
            RunChild::Break(_) => line.push('\n'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_parser_rejects_garbage() {
        let err = PdfTextParser.parse(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
    }

    #[test]
    fn docx_parser_rejects_non_zip() {
        let err = DocxParser.parse(b"%PDF-1.4 definitely not a docx").unwrap_err();
        assert!(matches!(err, ExtractionError::Docx(_)));
    }

    #[test]
    fn docx_parser_reads_paragraphs() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buffer = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Maria Souza")))
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Experiência profissional")))
            .build()
            .pack(&mut buffer)
            .unwrap();

        let text = DocxParser.parse(buffer.get_ref()).unwrap();
        assert_eq!(text, "Maria Souza\nExperiência profissional");
    }

    #[test]
    fn docx_parser_reads_hyperlinks_insertions_and_tables() {
        use docx_rs::{
            Docx, Hyperlink, HyperlinkType, Insert, Paragraph, Run, Table, TableCell, TableRow,
        };

        let contact = Paragraph::new()
            .add_run(Run::new().add_text("Contato: "))
            .add_hyperlink(
                Hyperlink::new("mailto:maria@email.com", HyperlinkType::External)
                    .add_run(Run::new().add_text("maria@email.com")),
            );
        let revised = Paragraph::new().add_insert(Insert::new(Run::new().add_text("Analista sênior")));
        let layout = Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Experiência: desenvolvi sistemas")),
            ),
            TableCell::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Formação: Administração"))),
        ])]);

        let mut buffer = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Maria Souza")))
            .add_paragraph(contact)
            .add_paragraph(revised)
            .add_table(layout)
            .build()
            .pack(&mut buffer)
            .unwrap();

        let text = DocxParser.parse(buffer.get_ref()).unwrap();
        assert_eq!(
            text,
            "Maria Souza\nContato: maria@email.com\nAnalista sênior\n\
             Experiência: desenvolvi sistemas\nFormação: Administração"
        );
    }
}
