//! Remote generative AI access
//!
//! This module provides:
//! - `AiGateway`: the app's five requests and their fault policy
//! - `GeminiClient`: the REST client behind the `GenerativeService` seam
//! - Data-URI helpers for inline images

pub mod client;
pub mod config;
pub mod data_uri;
pub mod gateway;
pub mod prompts;

// Re-export commonly used types
pub use client::{GeminiClient, GenerativeService};
pub use config::GatewayConfig;
pub use gateway::{AiGateway, ConversationHandle};
