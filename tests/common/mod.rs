//! Shared fakes for the integration tests

#![allow(dead_code)]

use alex::integration::SessionOrchestrator;
use alex::llm::client::{GenerateContentRequest, GenerateImagesRequest, GeneratedImage};
use alex::llm::{AiGateway, GatewayConfig, GenerativeService};
use alex::messages::SessionLog;
use alex::speech::{PlaybackEvents, SpeechPlayback, Synthesizer};
use alex::{AlexError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// Generative service answering from a script and recording every request
#[derive(Default)]
pub struct FakeService {
    pub replies: Mutex<VecDeque<Result<String>>>,
    pub images: Mutex<VecDeque<Result<Vec<GeneratedImage>>>>,
    pub content_requests: Mutex<Vec<GenerateContentRequest>>,
    pub image_requests: Mutex<Vec<GenerateImagesRequest>>,
    /// When set, every request waits for one notification before answering
    pub gate: Option<Arc<Notify>>,
}

impl FakeService {
    pub fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Default::default()
        }
    }

    pub fn gated(gate: Arc<Notify>, replies: &[&str]) -> Self {
        Self {
            gate: Some(gate),
            ..Self::with_replies(replies)
        }
    }

    pub fn push_reply(&self, reply: Result<String>) {
        self.replies.lock().push_back(reply);
    }

    pub fn push_images(&self, images: Result<Vec<GeneratedImage>>) {
        self.images.lock().push_back(images);
    }

    pub fn request_count(&self) -> usize {
        self.content_requests.lock().len() + self.image_requests.lock().len()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl GenerativeService for FakeService {
    async fn generate_content(
        &self,
        _model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        self.content_requests.lock().push(request.clone());
        self.wait_for_gate().await;
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AlexError::ServiceError("no scripted reply".to_string())))
    }

    async fn generate_images(
        &self,
        _model: &str,
        request: &GenerateImagesRequest,
    ) -> Result<Vec<GeneratedImage>> {
        self.image_requests.lock().push(request.clone());
        self.wait_for_gate().await;
        self.images.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Synthesizer that starts every utterance at once and never finishes
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub utterances: Mutex<Vec<(String, String)>>,
    pub cancels: Mutex<usize>,
}

impl RecordingSynthesizer {
    pub fn spoken_ids(&self) -> Vec<String> {
        self.utterances.lock().iter().map(|(_, id)| id.clone()).collect()
    }

    pub fn last_spoken(&self) -> Option<(String, String)> {
        self.utterances.lock().last().cloned()
    }
}

impl Synthesizer for RecordingSynthesizer {
    fn speak(&self, text: &str, events: PlaybackEvents) {
        self.utterances
            .lock()
            .push((text.to_string(), events.message_id().to_string()));
        events.started();
    }

    fn cancel(&self) {
        *self.cancels.lock() += 1;
    }
}

pub fn gateway(service: Arc<FakeService>) -> Arc<AiGateway> {
    Arc::new(AiGateway::new(service, GatewayConfig::new("test-key")))
}

/// An orchestrator over the fakes, with a fresh log
pub fn orchestrator(
    service: Arc<FakeService>,
) -> (Arc<SessionOrchestrator>, Arc<RecordingSynthesizer>) {
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let playback = SpeechPlayback::new(synthesizer.clone());
    let orchestrator = Arc::new(SessionOrchestrator::new(
        gateway(service),
        playback,
        SessionLog::new(),
    ));
    (orchestrator, synthesizer)
}

/// A one-image service answer
pub fn jpeg(payload: &str) -> Vec<GeneratedImage> {
    vec![GeneratedImage {
        bytes_base64: payload.to_string(),
        mime_type: "image/jpeg".to_string(),
    }]
}
