//! Configuration for the integration layer
//!
//! Provides centralized configuration for all components.

use crate::llm::config::GatewayConfig;
use crate::speech::stt::DEFAULT_LOCALE;
use tracing::debug;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const API_KEY_FALLBACK_VAR: &str = "API_KEY";

/// Voice settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Recognition locale
    pub locale: String,

    /// External synthesizer program; `None` means no speech output
    pub tts_command: Option<String>,

    /// Arguments passed before the text to speak
    pub tts_args: Vec<String>,

    /// External dictation program; `None` means no voice input
    pub stt_command: Option<String>,

    pub stt_args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            tts_command: None,
            tts_args: Vec::new(),
            stt_command: None,
            stt_args: Vec::new(),
        }
    }
}

/// Configuration for the complete app
#[derive(Clone, Debug, Default)]
pub struct AlexConfig {
    pub gateway: GatewayConfig,
    pub speech: SpeechConfig,
}

impl AlexConfig {
    /// Read the configuration from the environment, after loading `.env`
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {:?}", path),
            Err(e) => debug!("No .env file loaded: {}", e),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from a variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = Self::default();

        if let Some(key) = var(API_KEY_VAR).or_else(|| var(API_KEY_FALLBACK_VAR)) {
            config.gateway = config.gateway.with_api_key(key);
        }
        if let Some(model) = var("ALEX_CHAT_MODEL") {
            config.gateway = config.gateway.with_chat_model(model);
        }
        if let Some(model) = var("ALEX_IMAGE_MODEL") {
            config.gateway = config.gateway.with_image_model(model);
        }
        if let Some(url) = var("ALEX_API_BASE_URL") {
            config.gateway = config.gateway.with_base_url(url);
        }
        if let Some(locale) = var("ALEX_SPEECH_LOCALE") {
            config.speech.locale = locale;
        }
        if let Some(command) = var("ALEX_TTS_COMMAND") {
            (config.speech.tts_command, config.speech.tts_args) = split_command(&command);
        }
        if let Some(command) = var("ALEX_STT_COMMAND") {
            (config.speech.stt_command, config.speech.stt_args) = split_command(&command);
        }

        config
    }

    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    /// Speak replies through an external program
    pub fn with_tts_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.speech.tts_command = Some(program.into());
        self.speech.tts_args = args;
        self
    }

    /// Dictate through an external program
    pub fn with_stt_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.speech.stt_command = Some(program.into());
        self.speech.stt_args = args;
        self
    }

    /// Text-only mode
    pub fn without_speech_output(mut self) -> Self {
        self.speech.tts_command = None;
        self.speech.tts_args.clear();
        self
    }

    pub fn without_speech_input(mut self) -> Self {
        self.speech.stt_command = None;
        self.speech.stt_args.clear();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.gateway.validate()?;

        if self.speech.locale.trim().is_empty() {
            return Err("Speech locale must not be empty".to_string());
        }

        Ok(())
    }
}

/// Program name and arguments of a command line
fn split_command(command: &str) -> (Option<String>, Vec<String>) {
    let mut words = command.split_whitespace().map(str::to_string);
    (words.next(), words.collect())
}
