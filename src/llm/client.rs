//! REST client for the Gemini / Imagen generative API
//!
//! `GenerativeService` is the seam between the gateway's policy and the
//! wire. `GeminiClient` is the production implementation over `reqwest`.

use crate::llm::config::{GatewayConfig, IMAGE_ASPECT_RATIO, IMAGE_MIME_TYPE};
use crate::{AlexError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The remote generative service
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Run a text (or multimodal) generation and return the response text
    async fn generate_content(&self, model: &str, request: &GenerateContentRequest)
        -> Result<String>;

    /// Run an image generation and return the produced images
    async fn generate_images(
        &self,
        model: &str,
        request: &GenerateImagesRequest,
    ) -> Result<Vec<GeneratedImage>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl GenerateContentRequest {
    /// Single stateless user turn
    pub fn single(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            system_instruction: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Some("model".to_string()),
            parts,
        }
    }

    /// Role-less content, used for the system instruction
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload, without any data-URI header
    pub data: String,
}

/// Body of an image `:predict` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateImagesRequest {
    pub instances: Vec<ImagePrompt>,
    pub parameters: ImageParameters,
}

impl GenerateImagesRequest {
    /// Exactly one JPEG image in a square aspect ratio
    pub fn single_image(prompt: impl Into<String>) -> Self {
        Self {
            instances: vec![ImagePrompt {
                prompt: prompt.into(),
            }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
                output_options: OutputOptions {
                    mime_type: IMAGE_MIME_TYPE.to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePrompt {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
    pub output_options: OutputOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    pub mime_type: String,
}

/// One generated image, payload still base64-encoded
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes_base64: String,
    pub mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// `GenerativeService` over the public REST API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client. Fails when no API key is configured.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AlexError::ConfigError("API key is not set".to_string()))?;

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{model}:{method}?key={api_key}",
            self.base_url,
            api_key = self.api_key
        )
    }

    async fn post<B: Serialize + ?Sized>(&self, url: String, body: &B) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AlexError::ServiceError(format!("Request failed: {e}")))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| AlexError::ServiceError(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body_text));
        }

        Ok(body_text)
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        debug!("generateContent on {} with {} contents", model, request.contents.len());
        let body = self.post(self.endpoint(model, "generateContent"), request).await?;
        parse_content_response(&body)
    }

    async fn generate_images(
        &self,
        model: &str,
        request: &GenerateImagesRequest,
    ) -> Result<Vec<GeneratedImage>> {
        debug!("predict on {}", model);
        let body = self.post(self.endpoint(model, "predict"), request).await?;
        parse_predict_response(&body)
    }
}

/// Concatenated text of the first candidate
fn parse_content_response(body: &str) -> Result<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AlexError::ServiceError(format!("Failed to parse response: {e}")))?;

    let parts = parsed
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.is_empty() {
        return Err(AlexError::ServiceError(
            "Response contained no text".to_string(),
        ));
    }
    Ok(text)
}

/// Images carried by the predictions; filtered entries have no bytes
fn parse_predict_response(body: &str) -> Result<Vec<GeneratedImage>> {
    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|e| AlexError::ServiceError(format!("Failed to parse response: {e}")))?;

    Ok(parsed
        .predictions
        .into_iter()
        .filter_map(|prediction| {
            let bytes_base64 = prediction.bytes_base64_encoded?;
            Some(GeneratedImage {
                bytes_base64,
                mime_type: prediction
                    .mime_type
                    .unwrap_or_else(|| IMAGE_MIME_TYPE.to_string()),
            })
        })
        .collect())
}

fn map_http_error(status: StatusCode, body: &str) -> AlexError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    AlexError::ServiceError(format!("HTTP {}: {}", status.as_u16(), message))
}
