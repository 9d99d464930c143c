//! Configuration for the remote generative API

use crate::llm::prompts::SYSTEM_INSTRUCTION;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Output encoding requested from the image model
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Aspect ratio requested from the image model
pub const IMAGE_ASPECT_RATIO: &str = "1:1";

/// Configuration for the AI gateway
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// API key for the generative service (required to build a client)
    pub api_key: Option<String>,

    /// Base URL of the models endpoint
    pub base_url: String,

    /// Model used for chat, greeting, summaries and image analysis
    pub chat_model: String,

    /// Model used for image generation
    pub image_model: String,

    /// System instruction fixed at conversation creation
    pub system_instruction: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the chat model
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Set the image model
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.api_key.as_deref() {
            None => return Err("API key is not set".to_string()),
            Some(key) if key.trim().is_empty() => return Err("API key is empty".to_string()),
            Some(_) => {}
        }

        if self.chat_model.trim().is_empty() {
            return Err("Chat model is required".to_string());
        }

        if self.image_model.trim().is_empty() {
            return Err("Image model is required".to_string());
        }

        if !self.base_url.starts_with("http") {
            return Err(format!("Invalid base URL: {}", self.base_url));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.chat_model, "gemini-2.5-flash");
        assert_eq!(config.image_model, "imagen-4.0-generate-001");
        assert!(config.system_instruction.contains("Alex"));
    }

    #[test]
    fn test_missing_key_fails_validation() {
        assert!(GatewayConfig::default().validate().is_err());
        assert!(GatewayConfig::new("  ").validate().is_err());
        assert!(GatewayConfig::new("secret").validate().is_ok());
    }

    #[test]
    fn test_gateway_config_builder() {
        let config = GatewayConfig::default()
            .with_api_key("k")
            .with_base_url("http://localhost:8080/models")
            .with_chat_model("chat")
            .with_image_model("paint");

        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.base_url, "http://localhost:8080/models");
        assert_eq!(config.chat_model, "chat");
        assert_eq!(config.image_model, "paint");
        assert!(config.validate().is_ok());
    }
}
