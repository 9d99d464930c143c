//! Integration layer: configuration and the session orchestrator

pub mod config;
pub mod orchestrator;

pub use config::{AlexConfig, SpeechConfig};
pub use orchestrator::{
    is_image_request, ChatState, RejectReason, SendOutcome, SessionEvent, SessionOrchestrator,
    IMAGE_CAPTION, IMAGE_KEYWORDS,
};
