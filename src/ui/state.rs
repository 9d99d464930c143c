//! Panel state for the document-summary and picture-analyzer modes
//!
//! Both panels run one-shot, stateless requests. Their outcome is stored
//! for display: the result text (also spoken) or a user-facing error.

use crate::documents::{extract_text, is_supported_document, mime_type_for_path, DocumentFile};
use crate::llm::data_uri::encode_data_uri;
use crate::llm::AiGateway;
use crate::speech::SpeechPlayback;
use crate::{AlexError, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Playback id of a spoken document summary
pub const SUMMARY_MESSAGE_ID: &str = "summary-result";

/// Playback id of a spoken image analysis
pub const ANALYSIS_MESSAGE_ID: &str = "analysis-result";

pub const INVALID_DOCUMENT_MESSAGE: &str =
    "Please select a valid document file (.txt, .pdf, or .docx).";
pub const INVALID_IMAGE_MESSAGE: &str = "Please select a valid image file (e.g., PNG, JPG).";

/// The three modes of the app
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Chat,
    Document,
    Image,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Chat, Tab::Document, Tab::Image];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Chat => "Study Buddy",
            Tab::Document => "Document Summary",
            Tab::Image => "Picture Analyzer",
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPanelState {
    pub file: Option<DocumentFile>,
    pub summary: String,
    pub error: Option<String>,
    pub loading: bool,
}

pub struct DocumentPanel {
    gateway: Arc<AiGateway>,
    playback: SpeechPlayback,
    state: RwLock<DocumentPanelState>,
}

impl DocumentPanel {
    pub fn new(gateway: Arc<AiGateway>, playback: SpeechPlayback) -> Self {
        Self {
            gateway,
            playback,
            state: RwLock::new(DocumentPanelState::default()),
        }
    }

    pub fn snapshot(&self) -> DocumentPanelState {
        self.state.read().clone()
    }

    /// Choose the document to summarize. Returns false for unsupported types.
    pub fn select_file(&self, file: DocumentFile) -> bool {
        let mut state = self.state.write();
        state.summary.clear();

        if !is_supported_document(&file.mime_type) {
            debug!("Rejected document {} ({})", file.name, file.mime_type);
            state.file = None;
            state.error = Some(INVALID_DOCUMENT_MESSAGE.to_string());
            return false;
        }

        info!("Selected document {}", file.name);
        state.file = Some(file);
        state.error = None;
        true
    }

    /// Summarize the selected document and speak the summary
    ///
    /// Does nothing without a selected file or while a summary is running.
    pub async fn summarize(&self) -> Option<String> {
        let file = {
            let mut state = self.state.write();
            if state.loading {
                return None;
            }
            let file = state.file.clone()?;
            state.loading = true;
            state.summary.clear();
            state.error = None;
            file
        };

        let result = self.extract_and_summarize(&file).await;

        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(summary) => {
                state.summary = summary.clone();
                drop(state);
                self.playback.speak(&summary, SUMMARY_MESSAGE_ID);
                Some(summary)
            }
            Err(e) => {
                warn!("Summary of {} failed: {}", file.name, e);
                state.error = Some(e.user_message());
                None
            }
        }
    }

    async fn extract_and_summarize(&self, file: &DocumentFile) -> Result<String> {
        let text = extract_text(file).await?;
        self.gateway.summarize_document(&text).await
    }
}

/// An image chosen for analysis, already encoded for the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub mime_type: String,
    pub data_uri: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImagePanelState {
    pub image: Option<SelectedImage>,
    pub prompt: String,
    pub analysis: String,
    pub error: Option<String>,
    pub loading: bool,
}

pub struct ImagePanel {
    gateway: Arc<AiGateway>,
    playback: SpeechPlayback,
    state: RwLock<ImagePanelState>,
}

impl ImagePanel {
    pub fn new(gateway: Arc<AiGateway>, playback: SpeechPlayback) -> Self {
        Self {
            gateway,
            playback,
            state: RwLock::new(ImagePanelState::default()),
        }
    }

    pub fn snapshot(&self) -> ImagePanelState {
        self.state.read().clone()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.state.write().prompt = prompt.into();
    }

    /// Choose and load the image to analyze. Accepts any `image/*` type.
    pub async fn select_image(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let mime_type = mime_type_for_path(path).unwrap_or_default();

        let loaded = if mime_type.starts_with("image/") {
            load_image(path, mime_type).await
        } else {
            Err(AlexError::UnsupportedFileType(mime_type.to_string()))
        };

        let mut state = self.state.write();
        state.analysis.clear();
        match loaded {
            Ok(image) => {
                info!("Selected image {:?}", image.path);
                state.image = Some(image);
                state.error = None;
                true
            }
            Err(AlexError::UnsupportedFileType(_)) => {
                state.image = None;
                state.error = Some(INVALID_IMAGE_MESSAGE.to_string());
                false
            }
            Err(e) => {
                warn!("Could not load image {:?}: {}", path, e);
                state.image = None;
                state.error = Some(e.user_message());
                false
            }
        }
    }

    /// Ask the prompt about the selected image and speak the answer
    ///
    /// Does nothing without an image, with a blank prompt, or while an
    /// analysis is running.
    pub async fn analyze(&self) -> Option<String> {
        let (image, prompt) = {
            let mut state = self.state.write();
            if state.loading || state.prompt.trim().is_empty() {
                return None;
            }
            let image = state.image.clone()?;
            state.loading = true;
            state.analysis.clear();
            state.error = None;
            (image, state.prompt.clone())
        };

        let result = self
            .gateway
            .analyze_image(&image.data_uri, &image.mime_type, &prompt)
            .await;

        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(analysis) => {
                state.analysis = analysis.clone();
                drop(state);
                self.playback.speak(&analysis, ANALYSIS_MESSAGE_ID);
                Some(analysis)
            }
            Err(e) => {
                warn!("Image analysis failed: {}", e);
                state.error = Some(e.user_message());
                None
            }
        }
    }
}

async fn load_image(path: &Path, mime_type: &str) -> Result<SelectedImage> {
    let bytes = tokio::fs::read(path).await?;
    Ok(SelectedImage {
        path: path.to_path_buf(),
        mime_type: mime_type.to_string(),
        data_uri: encode_data_uri(mime_type, &bytes),
    })
}
