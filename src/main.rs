use alex::integration::{AlexConfig, SessionOrchestrator};
use alex::llm::AiGateway;
use alex::messages::SessionLog;
use alex::speech::{CommandRecognizer, CommandSynthesizer, SpeechCapture, SpeechPlayback};
use alex::ui::App;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the conversation on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alex=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Alex study buddy");

    let config = AlexConfig::from_env();
    if let Err(e) = config.validate() {
        warn!("Configuration problem: {}", e);
    }
    let gateway = AiGateway::from_config(config.gateway.clone())
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to create the AI gateway")?;

    let playback = match &config.speech.tts_command {
        Some(program) => {
            info!("Speaking replies with {}", program);
            SpeechPlayback::new(Arc::new(CommandSynthesizer::new(
                program.as_str(),
                config.speech.tts_args.clone(),
            )))
        }
        None => {
            warn!("ALEX_TTS_COMMAND not set, replies will not be spoken");
            SpeechPlayback::unavailable()
        }
    };

    let capture = match &config.speech.stt_command {
        Some(program) => {
            info!("Dictating with {}", program);
            SpeechCapture::new(
                Arc::new(CommandRecognizer::new(
                    program.as_str(),
                    config.speech.stt_args.clone(),
                )),
                config.speech.locale.clone(),
            )
        }
        None => {
            warn!("ALEX_STT_COMMAND not set, voice input is unavailable");
            SpeechCapture::unavailable()
        }
    };

    let orchestrator = Arc::new(SessionOrchestrator::new(
        Arc::new(gateway),
        playback,
        SessionLog::new(),
    ));

    let mut app = App::new(orchestrator, capture, std::io::stdout());
    app.run().await?;

    info!("Alex shut down");
    Ok(())
}
