//! PDF text via lopdf, page by page
//!
//! Every text-showing operator (`Tj`, `TJ`, `'`, `"`) in a page's content
//! stream yields one text item, decoded with the encoding of the font set
//! by the preceding `Tf`.

use crate::{AlexError, Result};
use lopdf::content::Content;
use lopdf::{Document, Encoding, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// `TJ` adjustments below this (in thousandths of a text unit) read as a word gap
const WORD_GAP: i64 = -100;

/// Extract the text of every page
///
/// Each page's text items are joined with single spaces and pages are
/// separated by a blank line.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes).map_err(|e| AlexError::PdfReadError(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(AlexError::PdfReadError("document is encrypted".to_string()));
    }

    let pages = doc.get_pages();
    debug!("PDF has {} pages", pages.len());

    let mut page_texts = Vec::with_capacity(pages.len());
    for (page_number, page_id) in pages {
        let items = page_text_items(&doc, page_id)
            .map_err(|e| AlexError::PdfReadError(format!("page {page_number}: {e}")))?;
        page_texts.push(items.join(" "));
    }

    Ok(page_texts.join("\n\n").trim().to_string())
}

/// The text items of one page, in content stream order
fn page_text_items(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<String>> {
    let encodings = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .map(|(name, font)| font.get_font_encoding(doc).map(|encoding| (name, encoding)))
        .collect::<lopdf::Result<BTreeMap<Vec<u8>, Encoding>>>()?;

    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut items = Vec::new();
    let mut encoding = None;
    for operation in &content.operations {
        let shown = match operation.operator.as_str() {
            "Tf" => {
                encoding = match operation.operands.first().map(Object::as_name) {
                    Some(Ok(font)) => encodings.get(font),
                    _ => None,
                };
                continue;
            }
            "Tj" | "'" => operation.operands.first(),
            "\"" => operation.operands.get(2),
            "TJ" => operation.operands.first(),
            _ => continue,
        };
        let Some(shown) = shown else {
            continue;
        };

        let mut item = String::new();
        show_text(&mut item, encoding, shown)?;
        let item = item.trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }

    Ok(items)
}

/// Append the text shown by one operand: a string, or a `TJ` array
fn show_text(item: &mut String, encoding: Option<&Encoding>, operand: &Object) -> lopdf::Result<()> {
    match operand {
        Object::String(bytes, _) => match encoding {
            Some(encoding) => item.push_str(&Document::decode_text(encoding, bytes)?),
            None => {
                warn!("Text shown without a font, decoding as UTF-8");
                item.push_str(&String::from_utf8_lossy(bytes));
            }
        },
        Object::Array(parts) => {
            for part in parts {
                match part {
                    Object::Integer(gap) if *gap < WORD_GAP => item.push(' '),
                    Object::Real(gap) if *gap < WORD_GAP as f32 => item.push(' '),
                    _ => show_text(item, encoding, part)?,
                }
            }
        }
        _ => {}
    }
    Ok(())
}
