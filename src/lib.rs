//! Alex - a voice-enabled AI study buddy
//!
//! Three modes share one session: a spoken chat with image generation,
//! document summaries and picture analysis. The language work itself is
//! delegated to a remote generative API; this crate owns the conversation
//! state machine and the speech capture/playback coordination around it.

pub mod documents;
pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlexError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Remote service error: {0}")]
    ServiceError(String),

    #[error("Summarization failed: {0}")]
    SummarizeError(String),

    #[error("Image analysis failed: {0}")]
    ImageAnalysisError(String),

    #[error("Image generation failed: {0}")]
    ImageGenerationError(String),

    #[error("Image generation returned no images")]
    NoImageReturned,

    #[error("Invalid image data")]
    InvalidImageData,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("DOCX read error: {0}")]
    DocxReadError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Speech recognition error: {0}")]
    RecognitionError(String),
}

impl From<std::io::Error> for AlexError {
    fn from(e: std::io::Error) -> Self {
        AlexError::IOError(e.to_string())
    }
}

impl AlexError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Missing credentials cannot be fixed without a restart
            AlexError::ConfigError(_) => false,
            // Remote faults are transient, the user can simply retry
            AlexError::ServiceError(_) => true,
            AlexError::SummarizeError(_) => true,
            AlexError::ImageAnalysisError(_) => true,
            AlexError::ImageGenerationError(_) => true,
            AlexError::NoImageReturned => true,
            // Input faults are fixed by choosing different input
            AlexError::InvalidImageData => true,
            AlexError::UnsupportedFileType(_) => true,
            AlexError::PdfReadError(_) => true,
            AlexError::DocxReadError(_) => true,
            AlexError::IOError(_) => true,
            // Recognition faults only end the session
            AlexError::RecognitionError(_) => true,
        }
    }

    /// Get the message shown (and spoken) to the user
    pub fn user_message(&self) -> String {
        match self {
            AlexError::ConfigError(_) => {
                "Configuration error. Please set the GEMINI_API_KEY environment variable."
                    .to_string()
            }
            AlexError::ServiceError(_) => {
                "I'm sorry, the AI service is unavailable right now. Please try again.".to_string()
            }
            AlexError::SummarizeError(_) => {
                "I'm sorry, I couldn't summarize the document. Please try again.".to_string()
            }
            AlexError::ImageAnalysisError(_) => {
                "I'm sorry, I couldn't analyze the image. Please check the image format or try a different question."
                    .to_string()
            }
            AlexError::ImageGenerationError(_) => {
                "I'm sorry, I couldn't create that image. Please try a different description."
                    .to_string()
            }
            AlexError::NoImageReturned => {
                "The model did not return an image. Please try a different prompt.".to_string()
            }
            AlexError::InvalidImageData => "Invalid Base64 image data provided.".to_string(),
            AlexError::UnsupportedFileType(_) => {
                "Unsupported file type. Please upload a .txt, .pdf, or .docx file.".to_string()
            }
            AlexError::PdfReadError(_) => {
                "Failed to read the PDF file. It may be corrupted or protected.".to_string()
            }
            AlexError::DocxReadError(_) => {
                "Failed to read the DOCX file. It may be corrupted.".to_string()
            }
            AlexError::IOError(_) => "Could not read the selected file.".to_string(),
            AlexError::RecognitionError(_) => {
                "Speech recognition stopped. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AlexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_fatal() {
        let err = AlexError::ConfigError("missing key".to_string());
        assert!(!err.is_recoverable());
        assert!(err.user_message().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_no_image_message_suggests_retry() {
        let msg = AlexError::NoImageReturned.user_message();
        assert!(msg.contains("try a different prompt"));
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = AlexError::PdfReadError("xref table broken at 0x1f".to_string());
        assert!(!err.user_message().contains("xref"));
        assert!(err.to_string().contains("xref"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AlexError = io.into();
        assert!(matches!(err, AlexError::IOError(_)));
    }
}
