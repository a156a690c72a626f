use roxmltree::{Document, Node};
use std::io::{Cursor, Read};

use super::ExtractionError;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Paragraph text of `word/document.xml`, one body paragraph per line.
///
/// Only paragraphs sitting directly in the body are read. Text inside table
/// cells and text boxes belongs to other paragraphs and is skipped.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let document = Document::parse(&xml).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let body = document
        .descendants()
        .find(|n| n.has_tag_name((W_NS, "body")))
        .ok_or_else(|| ExtractionError::Docx("document has no body".to_string()))?;

    let paragraphs: Vec<String> = body
        .children()
        .filter(|n| n.has_tag_name((W_NS, "p")))
        .map(paragraph_text)
        .collect();
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: Node) -> String {
    let mut text = String::new();
    for child in paragraph.children() {
        collect_runs(child, &mut text);
    }
    text
}

fn collect_runs(node: Node, out: &mut String) {
    if !node.is_element() || node.tag_name().namespace() != Some(W_NS) {
        return;
    }
    match node.tag_name().name() {
        // Nested paragraphs (text boxes) and property blocks carry no own text.
        "p" | "pPr" | "rPr" => {}
        "t" => out.push_str(node.text().unwrap_or_default()),
        "tab" => out.push('\t'),
        "br" | "cr" => out.push('\n'),
        _ => {
            for child in node.children() {
                collect_runs(child, out);
            }
        }
    }
}
