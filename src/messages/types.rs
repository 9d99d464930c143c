use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of the opening model message of a session
pub const GREETING_MESSAGE_ID: &str = "initial-greeting";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// One conversation turn. Immutable once appended to the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    /// Always present; image turns carry their caption here
    pub text: String,
    /// Data URI of a generated image
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: next_message_id(),
            role,
            text: text.into(),
            image_url: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn model_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        let mut message = Self::model(text);
        message.image_url = Some(image_url.into());
        message
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}

/// Time-ordered unique id (UUIDv7), so ids sort by creation time
fn next_message_id() -> String {
    Uuid::now_v7().to_string()
}
