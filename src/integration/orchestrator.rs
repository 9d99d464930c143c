//! Session orchestrator: the chat transcript and its request lifecycle
//!
//! Owns the session log and the `Idle -> Loading -> Idle` state machine.
//! Each accepted submission appends one user message, routes the text to
//! image generation or chat, appends exactly one model message with the
//! result and speaks it. Faults never escape: they arrive here either as
//! the gateway's fallback text or as an error whose user message becomes
//! the model's reply.

use crate::llm::AiGateway;
use crate::messages::{Message, SessionLog, GREETING_MESSAGE_ID};
use crate::speech::SpeechPlayback;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phrases that mark a submission as an image request (matched case-insensitively)
pub const IMAGE_KEYWORDS: [&str; 7] = [
    "draw",
    "create a picture",
    "generate an image",
    "show me a picture",
    "picture of",
    "image of",
    "create an image",
];

/// Caption of a successfully generated image
pub const IMAGE_CAPTION: &str = "Here is the image you requested.";

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Whether `text` asks for a picture rather than an answer
pub fn is_image_request(text: &str) -> bool {
    let text = text.to_lowercase();
    IMAGE_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Request lifecycle of the chat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatState {
    #[default]
    Idle,
    Loading,
}

impl ChatState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ChatState::Loading)
    }
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatState::Idle => write!(f, "Idle"),
            ChatState::Loading => write!(f, "Loading"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing left after trimming
    Empty,
    /// A request is already in flight
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(RejectReason),
    Replied { message_id: String },
}

/// Events emitted for the presentation layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended(Message),
    LoadingChanged(bool),
}

#[derive(Debug, Default)]
struct SessionState {
    chat: ChatState,
    draft: String,
    greeted: bool,
}

/// Returns the chat to `Idle` when the request ends, even if it is dropped
struct LoadingGuard<'a> {
    orchestrator: &'a SessionOrchestrator,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.state.write().chat = ChatState::Idle;
        self.orchestrator.emit(SessionEvent::LoadingChanged(false));
    }
}

pub struct SessionOrchestrator {
    gateway: Arc<AiGateway>,
    playback: SpeechPlayback,
    log: SessionLog,
    state: RwLock<SessionState>,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
}

impl SessionOrchestrator {
    pub fn new(gateway: Arc<AiGateway>, playback: SpeechPlayback, log: SessionLog) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            playback,
            log,
            state: RwLock::new(SessionState::default()),
            event_tx,
            event_rx,
        }
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn playback(&self) -> &SpeechPlayback {
        &self.playback
    }

    pub fn gateway(&self) -> &Arc<AiGateway> {
        &self.gateway
    }

    /// Receiver for session events
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    pub fn chat_state(&self) -> ChatState {
        self.state.read().chat
    }

    pub fn is_loading(&self) -> bool {
        self.chat_state().is_loading()
    }

    pub fn has_greeted(&self) -> bool {
        self.state.read().greeted
    }

    pub fn draft(&self) -> String {
        self.state.read().draft.clone()
    }

    /// Replace the input draft (typed text or a live transcript)
    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.write().draft = text.into();
    }

    /// Submit the current draft
    pub async fn submit_draft(&self) -> SendOutcome {
        let draft = self.draft();
        self.send_user_text(&draft).await
    }

    /// Send one user submission and append the model's reply
    ///
    /// Clears the draft in every case. Empty text and submissions while a
    /// request is in flight are rejected without touching the log.
    pub async fn send_user_text(&self, text: &str) -> SendOutcome {
        self.state.write().draft.clear();

        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return SendOutcome::Rejected(RejectReason::Empty);
        }

        let Some(_loading) = self.begin_loading() else {
            debug!("Request in flight, rejecting submission");
            return SendOutcome::Rejected(RejectReason::Busy);
        };

        self.append(Message::user(text));

        let reply = if is_image_request(text) {
            info!("Routing to image generation");
            match self.gateway.generate_image(text).await {
                Ok(image_url) => Message::model_with_image(IMAGE_CAPTION, image_url),
                Err(e) => {
                    warn!("Image request failed: {}", e);
                    Message::model(e.user_message())
                }
            }
        } else {
            Message::model(self.gateway.chat_turn(text).await)
        };

        let message_id = reply.id.clone();
        let spoken = reply.text.clone();
        self.append(reply);
        self.playback.speak(&spoken, &message_id);

        SendOutcome::Replied { message_id }
    }

    /// Fetch and speak the opening greeting
    ///
    /// Runs at most once per session. The greeting is only appended (and
    /// spoken) while the log is still empty. Returns whether it was appended.
    pub async fn initialize_greeting(&self) -> bool {
        {
            let mut state = self.state.write();
            if state.greeted {
                debug!("Greeting already requested");
                return false;
            }
            state.greeted = true;
        }

        let _loading = self.begin_loading();
        let greeting = self.gateway.initial_greeting().await;

        let message = Message::model(greeting).with_id(GREETING_MESSAGE_ID);
        let text = message.text.clone();
        if !self.log.append_if_empty(message.clone()) {
            debug!("Conversation already started, dropping greeting");
            return false;
        }
        self.emit(SessionEvent::MessageAppended(message));
        self.playback.speak(&text, GREETING_MESSAGE_ID);
        true
    }

    /// Speak a logged message again
    pub fn replay(&self, message_id: &str) -> bool {
        match self.log.get(message_id) {
            Some(message) => {
                self.playback.speak(&message.text, &message.id);
                true
            }
            None => {
                warn!("No message {} to replay", message_id);
                false
            }
        }
    }

    /// Replay a message, or stop it if it is the one being spoken
    pub fn toggle_playback(&self, message_id: &str) -> bool {
        if self.playback.is_speaking_message(message_id) {
            self.playback.cancel();
            return true;
        }
        self.replay(message_id)
    }

    pub fn stop_speaking(&self) {
        self.playback.cancel();
    }

    fn begin_loading(&self) -> Option<LoadingGuard<'_>> {
        {
            let mut state = self.state.write();
            if state.chat.is_loading() {
                return None;
            }
            state.chat = ChatState::Loading;
        }
        self.emit(SessionEvent::LoadingChanged(true));
        Some(LoadingGuard { orchestrator: self })
    }

    fn append(&self, message: Message) -> bool {
        if !self.log.append(message.clone()) {
            return false;
        }
        self.emit(SessionEvent::MessageAppended(message));
        true
    }

    fn emit(&self, event: SessionEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => debug!("Event channel full, dropping {:?}", event),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
