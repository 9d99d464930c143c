//! Document text extraction
//!
//! Turns the accepted upload formats (plain text, PDF, Word) into one
//! plain-text string for summarization.

pub mod docx;
pub mod extract;
pub mod pdf;

pub use extract::{
    extract_text, is_supported_document, mime_type_for_path, DocumentFile, DocumentSource,
    DOCX_MIME_TYPE, PDF_MIME_TYPE, TEXT_MIME_TYPE,
};
