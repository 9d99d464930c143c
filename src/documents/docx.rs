//! Raw text of a Word (.docx) document
//!
//! Reads `word/document.xml` out of the zip container and keeps only the
//! run text. Every paragraph is followed by a blank line; tabs and line
//! breaks inside a paragraph are kept.

use crate::{AlexError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| AlexError::DocxReadError(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| AlexError::DocxReadError(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| AlexError::DocxReadError(e.to_string()))?;

    document_xml_text(&xml)
}

/// Text content of a WordprocessingML body
///
/// Tabs and breaks count only inside a run (`w:r`); the `w:tab` entries of a
/// paragraph's tab stop list are layout, not text.
pub fn document_xml_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut run_depth = 0usize;
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:r" => run_depth += 1,
                b"w:t" => in_text_run = run_depth > 0,
                b"w:tab" if run_depth > 0 => text.push('\t'),
                b"w:br" | b"w:cr" if run_depth > 0 => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" if run_depth > 0 => text.push('\t'),
                b"w:br" | b"w:cr" if run_depth > 0 => text.push('\n'),
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let run = e
                    .unescape()
                    .map_err(|e| AlexError::DocxReadError(e.to_string()))?;
                text.push_str(&run);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text_run = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(AlexError::DocxReadError(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    Ok(text)
}
