use crate::documents::{docx, pdf};
use crate::{AlexError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TEXT_MIME_TYPE: &str = "text/plain";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Where a document's bytes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// An uploaded document with its declared type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub mime_type: String,
    pub source: DocumentSource,
}

impl DocumentFile {
    /// A file on disk, typed by its extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_type_for_path(&path).unwrap_or_default().to_string();
        Self {
            name,
            mime_type,
            source: DocumentSource::Path(path),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: DocumentSource::Bytes(bytes),
        }
    }

    async fn read(&self) -> Result<Vec<u8>> {
        match &self.source {
            DocumentSource::Path(path) => Ok(tokio::fs::read(path).await?),
            DocumentSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Whether `mime_type` is one of the accepted document types
pub fn is_supported_document(mime_type: &str) -> bool {
    matches!(mime_type, TEXT_MIME_TYPE | PDF_MIME_TYPE | DOCX_MIME_TYPE)
}

/// Declared MIME type for a path, by extension
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime_type = match extension.as_str() {
        "txt" => TEXT_MIME_TYPE,
        "pdf" => PDF_MIME_TYPE,
        "docx" => DOCX_MIME_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime_type)
}

/// Extract the plain text of a document
///
/// Dispatches on the declared type only. Other types are rejected before
/// the content is read.
pub async fn extract_text(file: &DocumentFile) -> Result<String> {
    if !is_supported_document(&file.mime_type) {
        debug!("Rejecting {} ({})", file.name, file.mime_type);
        return Err(AlexError::UnsupportedFileType(file.mime_type.clone()));
    }

    let bytes = file.read().await?;
    info!("Extracting text from {} ({} bytes)", file.name, bytes.len());

    match file.mime_type.as_str() {
        PDF_MIME_TYPE => {
            run_blocking(move || pdf::extract_pdf_text(&bytes), AlexError::PdfReadError).await
        }
        DOCX_MIME_TYPE => {
            run_blocking(move || docx::extract_docx_text(&bytes), AlexError::DocxReadError).await
        }
        _ => Ok(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Parsers are synchronous and CPU bound
async fn run_blocking<F>(parse: F, on_panic: fn(String) -> AlexError) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .map_err(|e| on_panic(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_bytes_round_trip() {
        let text = "Line one\n  indented\tline two\n";
        let file = DocumentFile::from_bytes("notes.txt", TEXT_MIME_TYPE, text.as_bytes().to_vec());
        assert_eq!(extract_text(&file).await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_text_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Photosynthesis converts light.").unwrap();

        let file = DocumentFile::from_path(&path);
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type, TEXT_MIME_TYPE);
        assert_eq!(
            extract_text(&file).await.unwrap(),
            "Photosynthesis converts light."
        );
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected_without_read() {
        // The path does not exist: a read attempt would give an IO error
        let file = DocumentFile {
            name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            source: DocumentSource::Path(PathBuf::from("/nonexistent/alex/photo.png")),
        };

        let err = extract_text(&file).await.unwrap_err();
        assert_eq!(err, AlexError::UnsupportedFileType("image/png".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let file = DocumentFile::from_path("/nonexistent/alex/notes.txt");
        let err = extract_text(&file).await.unwrap_err();
        assert!(matches!(err, AlexError::IOError(_)));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_pdf_error() {
        let file = DocumentFile::from_bytes("broken.pdf", PDF_MIME_TYPE, b"not a pdf".to_vec());
        let err = extract_text(&file).await.unwrap_err();
        assert!(matches!(err, AlexError::PdfReadError(_)));
        assert!(err.user_message().contains("PDF"));
    }

    #[tokio::test]
    async fn test_pdf_pages_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biology.pdf");
        let bytes = pdf::tests::pdf_with_pages(&[&["Cells", "divide."], &["Chapter", "two"]]);
        std::fs::write(&path, bytes).unwrap();

        let file = DocumentFile::from_path(&path);
        assert_eq!(file.mime_type, PDF_MIME_TYPE);
        assert_eq!(
            extract_text(&file).await.unwrap(),
            "Cells divide.\n\nChapter two"
        );
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_docx_error() {
        let file = DocumentFile::from_bytes("broken.docx", DOCX_MIME_TYPE, b"not a zip".to_vec());
        let err = extract_text(&file).await.unwrap_err();
        assert!(matches!(err, AlexError::DocxReadError(_)));
    }

    #[test]
    fn test_mime_type_for_path() {
        assert_eq!(mime_type_for_path(Path::new("a.TXT")), Some(TEXT_MIME_TYPE));
        assert_eq!(mime_type_for_path(Path::new("a.pdf")), Some(PDF_MIME_TYPE));
        assert_eq!(mime_type_for_path(Path::new("a.docx")), Some(DOCX_MIME_TYPE));
        assert_eq!(mime_type_for_path(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_type_for_path(Path::new("a.doc")), None);
        assert_eq!(mime_type_for_path(Path::new("README")), None);
    }

    #[test]
    fn test_supported_documents() {
        assert!(is_supported_document(TEXT_MIME_TYPE));
        assert!(is_supported_document(PDF_MIME_TYPE));
        assert!(is_supported_document(DOCX_MIME_TYPE));
        assert!(!is_supported_document("application/msword"));
        assert!(!is_supported_document(""));
    }
}
