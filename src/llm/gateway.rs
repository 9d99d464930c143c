//! AI gateway: the study buddy's requests against the generative service
//!
//! Text requests on the conversational path (chat turn, greeting) never
//! fail: a fault becomes a fixed apology so the conversation keeps going.
//! Summaries, image analysis and image generation have no fallback content,
//! so their faults are returned as errors carrying a user-facing message.

use crate::llm::client::{
    Content, GeminiClient, GenerateContentRequest, GenerateImagesRequest, GenerativeService, Part,
};
use crate::llm::config::GatewayConfig;
use crate::llm::data_uri::{data_uri_payload, wrap_base64};
use crate::llm::prompts::{summary_prompt, CHAT_FALLBACK, GREETING_FALLBACK, GREETING_PROMPT};
use crate::{AlexError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info};

/// Dialogue context shared by every chat turn of a session
///
/// The system instruction is fixed at creation. Turns are serialized, and a
/// turn only enters the history once the service has answered it.
pub struct ConversationHandle {
    system_instruction: String,
    history: Mutex<Vec<Content>>,
}

impl ConversationHandle {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Send one user turn and record it with the reply
    pub async fn send_message(
        &self,
        service: &dyn GenerativeService,
        model: &str,
        text: &str,
    ) -> Result<String> {
        let mut history = self.history.lock().await;

        let mut contents = history.clone();
        contents.push(Content::user(vec![Part::text(text)]));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::instruction(self.system_instruction.as_str())),
        };
        let reply = service.generate_content(model, &request).await?;

        let mut contents = request.contents;
        contents.push(Content::model(vec![Part::text(reply.as_str())]));
        *history = contents;

        Ok(reply)
    }

    /// Number of completed turns
    pub async fn turn_count(&self) -> usize {
        self.history.lock().await.len() / 2
    }
}

/// Client-side entry point for every remote request of the app
pub struct AiGateway {
    service: Arc<dyn GenerativeService>,
    config: GatewayConfig,
    conversation: OnceCell<ConversationHandle>,
}

impl AiGateway {
    pub fn new(service: Arc<dyn GenerativeService>, config: GatewayConfig) -> Self {
        Self {
            service,
            config,
            conversation: OnceCell::new(),
        }
    }

    /// Build the gateway over the REST client. Fails without an API key.
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let client = GeminiClient::new(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Whether the conversation handle has been created yet
    pub fn has_conversation(&self) -> bool {
        self.conversation.initialized()
    }

    /// The session's conversation, created on first use
    pub async fn conversation(&self) -> &ConversationHandle {
        self.conversation
            .get_or_init(|| async {
                info!("Creating conversation with model {}", self.config.chat_model);
                ConversationHandle::new(self.config.system_instruction.as_str())
            })
            .await
    }

    /// One conversational turn. Falls back to an apology on any fault.
    pub async fn chat_turn(&self, prompt: &str) -> String {
        let conversation = self.conversation().await;
        match conversation
            .send_message(self.service.as_ref(), &self.config.chat_model, prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error generating chat response: {}", e);
                CHAT_FALLBACK.to_string()
            }
        }
    }

    /// The assistant's self-introduction. Falls back to a canned greeting.
    pub async fn initial_greeting(&self) -> String {
        let conversation = self.conversation().await;
        match conversation
            .send_message(self.service.as_ref(), &self.config.chat_model, GREETING_PROMPT)
            .await
        {
            Ok(greeting) => greeting,
            Err(e) => {
                error!("Error getting initial greeting: {}", e);
                GREETING_FALLBACK.to_string()
            }
        }
    }

    /// Stateless summary of a document's full text
    pub async fn summarize_document(&self, document_text: &str) -> Result<String> {
        debug!("Summarizing document of {} chars", document_text.len());
        let request = GenerateContentRequest::single(vec![Part::text(summary_prompt(
            document_text,
        ))]);

        self.service
            .generate_content(&self.config.chat_model, &request)
            .await
            .map_err(|e| {
                error!("Error summarizing document: {}", e);
                AlexError::SummarizeError(e.to_string())
            })
    }

    /// Stateless question about an image given as a data URI
    ///
    /// An empty payload is rejected before anything is sent.
    pub async fn analyze_image(
        &self,
        image_data_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String> {
        let payload = data_uri_payload(image_data_uri).ok_or(AlexError::InvalidImageData)?;

        let request = GenerateContentRequest::single(vec![
            Part::inline_data(mime_type, payload),
            Part::text(prompt),
        ]);

        self.service
            .generate_content(&self.config.chat_model, &request)
            .await
            .map_err(|e| {
                error!("Error analyzing image: {}", e);
                AlexError::ImageAnalysisError(e.to_string())
            })
    }

    /// Generate exactly one image and return it as a data URI
    pub async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = GenerateImagesRequest::single_image(prompt);

        let images = self
            .service
            .generate_images(&self.config.image_model, &request)
            .await
            .map_err(|e| {
                error!("Error generating image: {}", e);
                AlexError::ImageGenerationError(e.to_string())
            })?;

        let image = images.into_iter().next().ok_or_else(|| {
            error!("Image model returned no images");
            AlexError::NoImageReturned
        })?;

        Ok(wrap_base64(&image.mime_type, &image.bytes_base64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::GeneratedImage;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;

    /// Records requests and answers from a script
    #[derive(Default)]
    struct ScriptedService {
        content_requests: SyncMutex<Vec<GenerateContentRequest>>,
        image_requests: SyncMutex<Vec<GenerateImagesRequest>>,
        replies: SyncMutex<Vec<Result<String>>>,
        images: SyncMutex<Option<Result<Vec<GeneratedImage>>>>,
    }

    impl ScriptedService {
        fn replying(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: SyncMutex::new(replies),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl GenerativeService for ScriptedService {
        async fn generate_content(
            &self,
            _model: &str,
            request: &GenerateContentRequest,
        ) -> Result<String> {
            self.content_requests.lock().push(request.clone());
            let mut replies = self.replies.lock();
            if replies.is_empty() {
                return Err(AlexError::ServiceError("no scripted reply".to_string()));
            }
            replies.remove(0)
        }

        async fn generate_images(
            &self,
            _model: &str,
            request: &GenerateImagesRequest,
        ) -> Result<Vec<GeneratedImage>> {
            self.image_requests.lock().push(request.clone());
            self.images.lock().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn gateway(service: Arc<ScriptedService>) -> AiGateway {
        AiGateway::new(service, GatewayConfig::new("test-key"))
    }

    #[test]
    fn test_from_config_requires_key() {
        let err = AiGateway::from_config(GatewayConfig::default()).err().unwrap();
        assert!(matches!(err, AlexError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_conversation_created_lazily_once() {
        let service = Arc::new(ScriptedService::replying(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
        ]));
        let gateway = gateway(service.clone());
        assert!(!gateway.has_conversation());

        assert_eq!(gateway.chat_turn("hi").await, "first");
        assert!(gateway.has_conversation());
        assert_eq!(gateway.chat_turn("again").await, "second");
        assert_eq!(gateway.conversation().await.turn_count().await, 2);

        // The second turn carries the first one as context
        let requests = service.content_requests.lock();
        assert_eq!(requests[0].contents.len(), 1);
        assert_eq!(requests[1].contents.len(), 3);
        assert!(requests[1].system_instruction.is_some());
    }

    #[tokio::test]
    async fn test_chat_fault_returns_apology() {
        let service = Arc::new(ScriptedService::replying(vec![Err(
            AlexError::ServiceError("offline".to_string()),
        )]));
        let gateway = gateway(service);

        assert_eq!(gateway.chat_turn("hi").await, CHAT_FALLBACK);
        // Failed turns stay out of the history
        assert_eq!(gateway.conversation().await.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_greeting_uses_conversation() {
        let service = Arc::new(ScriptedService::replying(vec![Ok("I'm Alex!".to_string())]));
        let gateway = gateway(service.clone());

        assert_eq!(gateway.initial_greeting().await, "I'm Alex!");
        let requests = service.content_requests.lock();
        assert_eq!(
            requests[0].contents[0].parts[0],
            Part::text(GREETING_PROMPT)
        );
    }

    #[tokio::test]
    async fn test_greeting_fault_returns_fallback() {
        let gateway = gateway(Arc::new(ScriptedService::default()));
        assert_eq!(gateway.initial_greeting().await, GREETING_FALLBACK);
    }

    #[tokio::test]
    async fn test_summary_is_stateless() {
        let service = Arc::new(ScriptedService::replying(vec![Ok("Short.".to_string())]));
        let gateway = gateway(service.clone());

        assert_eq!(gateway.summarize_document("Long text").await.unwrap(), "Short.");
        assert!(!gateway.has_conversation());

        let requests = service.content_requests.lock();
        assert!(requests[0].system_instruction.is_none());
        assert_eq!(
            requests[0].contents[0].parts[0],
            Part::text(summary_prompt("Long text"))
        );
    }

    #[tokio::test]
    async fn test_summary_fault_is_error() {
        let gateway = gateway(Arc::new(ScriptedService::default()));
        let err = gateway.summarize_document("text").await.unwrap_err();
        assert!(matches!(err, AlexError::SummarizeError(_)));
        assert!(err.user_message().contains("couldn't summarize"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_payload_before_request() {
        let service = Arc::new(ScriptedService::default());
        let gateway = gateway(service.clone());

        let err = gateway
            .analyze_image("data:image/png;base64,", "image/png", "What is this?")
            .await
            .unwrap_err();

        assert_eq!(err, AlexError::InvalidImageData);
        assert!(service.content_requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_sends_image_and_prompt() {
        let service = Arc::new(ScriptedService::replying(vec![Ok("A cat.".to_string())]));
        let gateway = gateway(service.clone());

        let answer = gateway
            .analyze_image("data:image/png;base64,iVBOR", "image/png", "What is this?")
            .await
            .unwrap();
        assert_eq!(answer, "A cat.");

        let requests = service.content_requests.lock();
        let parts = &requests[0].contents[0].parts;
        assert_eq!(parts[0], Part::inline_data("image/png", "iVBOR"));
        assert_eq!(parts[1], Part::text("What is this?"));
    }

    #[tokio::test]
    async fn test_generate_image_wraps_data_uri() {
        let service = Arc::new(ScriptedService::default());
        *service.images.lock() = Some(Ok(vec![GeneratedImage {
            bytes_base64: "/9j/4AAQ".to_string(),
            mime_type: "image/jpeg".to_string(),
        }]));
        let gateway = gateway(service.clone());

        let uri = gateway.generate_image("a red fox").await.unwrap();
        assert_eq!(uri, "data:image/jpeg;base64,/9j/4AAQ");

        let requests = service.image_requests.lock();
        assert_eq!(requests[0].parameters.sample_count, 1);
        assert_eq!(requests[0].instances[0].prompt, "a red fox");
    }

    #[tokio::test]
    async fn test_generate_image_zero_images() {
        let gateway = gateway(Arc::new(ScriptedService::default()));
        let err = gateway.generate_image("a red fox").await.unwrap_err();
        assert_eq!(err, AlexError::NoImageReturned);
    }

    #[tokio::test]
    async fn test_generate_image_fault_is_apology() {
        let service = Arc::new(ScriptedService::default());
        *service.images.lock() = Some(Err(AlexError::ServiceError("quota".to_string())));
        let gateway = gateway(service);

        let err = gateway.generate_image("a red fox").await.unwrap_err();
        assert!(matches!(err, AlexError::ImageGenerationError(_)));
        assert!(err.user_message().contains("couldn't create that image"));
    }
}
