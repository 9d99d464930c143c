//! Speech playback: one utterance at a time, keyed by message id
//!
//! `SpeechPlayback` is a two-state machine (`Idle`, `Speaking(id)`). Every
//! `speak` cancels whatever is playing first; utterances are never queued.
//! Each utterance gets a generation number, and engine callbacks that
//! belong to an older generation are ignored, so a late "ended" from a
//! preempted utterance cannot clear the state of the current one.

use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// A platform speech synthesizer
pub trait Synthesizer: Send + Sync {
    /// Begin speaking `text`, reporting progress through `events`
    fn speak(&self, text: &str, events: PlaybackEvents);

    /// Stop any utterance in progress. Safe to call when idle.
    fn cancel(&self);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking(String),
}

impl PlaybackState {
    pub fn is_speaking(&self) -> bool {
        matches!(self, PlaybackState::Speaking(_))
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Speaking(id) => Some(id),
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Speaking(id) => write!(f, "Speaking({id})"),
        }
    }
}

#[derive(Debug, Default)]
struct PlaybackInner {
    state: PlaybackState,
    generation: u64,
}

/// Callback sink handed to the synthesizer for one utterance
#[derive(Clone, Debug)]
pub struct PlaybackEvents {
    inner: Arc<Mutex<PlaybackInner>>,
    generation: u64,
    message_id: String,
}

impl PlaybackEvents {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The utterance is audible
    pub fn started(&self) {
        let mut inner = self.inner.lock();
        if inner.generation != self.generation {
            debug!("Ignoring start of preempted utterance {}", self.message_id);
            return;
        }
        inner.state = PlaybackState::Speaking(self.message_id.clone());
    }

    /// The utterance ran to completion
    pub fn finished(&self) {
        self.reset("finished");
    }

    /// The engine gave up on the utterance
    pub fn failed(&self, error: &str) {
        warn!("Speech synthesis error for {}: {}", self.message_id, error);
        self.reset("failed");
    }

    fn reset(&self, reason: &str) {
        let mut inner = self.inner.lock();
        if inner.generation != self.generation {
            return;
        }
        debug!("Utterance {} {}", self.message_id, reason);
        inner.state = PlaybackState::Idle;
    }
}

/// Single-utterance playback over an optional platform synthesizer
#[derive(Clone)]
pub struct SpeechPlayback {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    inner: Arc<Mutex<PlaybackInner>>,
}

impl SpeechPlayback {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            synthesizer: Some(synthesizer),
            inner: Arc::new(Mutex::new(PlaybackInner::default())),
        }
    }

    /// Playback on a platform without speech synthesis
    pub fn unavailable() -> Self {
        Self {
            synthesizer: None,
            inner: Arc::new(Mutex::new(PlaybackInner::default())),
        }
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Speak `text` for `message_id`, preempting anything already playing
    pub fn speak(&self, text: &str, message_id: &str) {
        let Some(synthesizer) = &self.synthesizer else {
            warn!("Text-to-speech not supported on this platform");
            return;
        };

        synthesizer.cancel();

        // The lock must be released before the synthesizer runs: it may
        // report `started` synchronously.
        let events = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.state = PlaybackState::Idle;
            PlaybackEvents {
                inner: Arc::clone(&self.inner),
                generation: inner.generation,
                message_id: message_id.to_string(),
            }
        };

        debug!("Speaking message {}", message_id);
        synthesizer.speak(text, events);
    }

    /// Stop any utterance in progress
    pub fn cancel(&self) {
        if let Some(synthesizer) = &self.synthesizer {
            synthesizer.cancel();
        }
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = PlaybackState::Idle;
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state.clone()
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.lock().state.is_speaking()
    }

    pub fn active_message_id(&self) -> Option<String> {
        self.inner.lock().state.message_id().map(str::to_string)
    }

    /// Whether `message_id` is the one being voiced right now
    pub fn is_speaking_message(&self, message_id: &str) -> bool {
        self.inner.lock().state.message_id() == Some(message_id)
    }
}

/// Synthesizer backed by an external TTS program (e.g. `espeak-ng`)
///
/// The text is passed as the last argument. Cancelling kills the process.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Synthesizer for CommandSynthesizer {
    fn speak(&self, text: &str, events: PlaybackEvents) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                events.failed(&format!("No async runtime: {e}"));
                return;
            }
        };

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                events.failed(&format!("Failed to start {}: {}", self.program, e));
                return;
            }
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        if let Some(previous) = self.current.lock().replace(cancel_tx) {
            let _ = previous.send(());
        }

        events.started();

        runtime.spawn(async move {
            let status = tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel_rx => None,
            };

            match status {
                Some(Ok(status)) if status.success() => events.finished(),
                Some(Ok(status)) => events.failed(&format!("synthesizer exited with {status}")),
                Some(Err(e)) => events.failed(&e.to_string()),
                None => {
                    if let Err(e) = child.kill().await {
                        debug!("Synthesizer already exited: {}", e);
                    }
                }
            }
        });
    }

    fn cancel(&self) {
        if let Some(cancel_tx) = self.current.lock().take() {
            info!("Cancelling speech");
            let _ = cancel_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Starts every utterance at once; finishes only when told to
    #[derive(Default)]
    struct ManualSynthesizer {
        spoken: Mutex<Vec<String>>,
        pending: Mutex<Vec<PlaybackEvents>>,
        cancels: Mutex<usize>,
        start_immediately: bool,
    }

    impl ManualSynthesizer {
        fn immediate() -> Self {
            Self {
                start_immediately: true,
                ..Default::default()
            }
        }
    }

    impl Synthesizer for ManualSynthesizer {
        fn speak(&self, text: &str, events: PlaybackEvents) {
            self.spoken.lock().push(text.to_string());
            if self.start_immediately {
                events.started();
            }
            self.pending.lock().push(events);
        }

        fn cancel(&self) {
            *self.cancels.lock() += 1;
        }
    }

    #[test]
    fn test_speak_sets_active_message() {
        let synth = Arc::new(ManualSynthesizer::immediate());
        let playback = SpeechPlayback::new(synth.clone());

        playback.speak("Hello", "a");
        assert!(playback.is_speaking());
        assert_eq!(playback.active_message_id().as_deref(), Some("a"));
        assert_eq!(synth.spoken.lock().as_slice(), ["Hello".to_string()]);
    }

    #[test]
    fn test_new_speak_preempts_previous() {
        let synth = Arc::new(ManualSynthesizer::immediate());
        let playback = SpeechPlayback::new(synth.clone());

        playback.speak("first", "a");
        playback.speak("second", "b");

        assert_eq!(playback.state(), PlaybackState::Speaking("b".to_string()));
        assert!(!playback.is_speaking_message("a"));
        assert_eq!(*synth.cancels.lock(), 2);
    }

    #[test]
    fn test_stale_end_is_ignored() {
        let synth = Arc::new(ManualSynthesizer::immediate());
        let playback = SpeechPlayback::new(synth.clone());

        playback.speak("first", "a");
        playback.speak("second", "b");

        // The engine reports the preempted utterance as ended afterwards
        let first = synth.pending.lock()[0].clone();
        first.finished();
        assert_eq!(playback.active_message_id().as_deref(), Some("b"));

        let second = synth.pending.lock()[1].clone();
        second.finished();
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_state_set_on_start_not_on_request() {
        let synth = Arc::new(ManualSynthesizer::default());
        let playback = SpeechPlayback::new(synth.clone());

        playback.speak("Hello", "a");
        assert!(!playback.is_speaking());

        synth.pending.lock()[0].started();
        assert!(playback.is_speaking_message("a"));
    }

    #[test]
    fn test_error_resets_state() {
        let synth = Arc::new(ManualSynthesizer::immediate());
        let playback = SpeechPlayback::new(synth.clone());

        playback.speak("Hello", "a");
        synth.pending.lock()[0].failed("audio device lost");
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_cancel_resets_and_ignores_late_start() {
        let synth = Arc::new(ManualSynthesizer::default());
        let playback = SpeechPlayback::new(synth.clone());

        playback.speak("Hello", "a");
        playback.cancel();
        synth.pending.lock()[0].started();

        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_cancel_when_idle_is_safe() {
        let playback = SpeechPlayback::new(Arc::new(ManualSynthesizer::default()));
        playback.cancel();
        playback.cancel();
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_unavailable_platform_is_noop() {
        let playback = SpeechPlayback::unavailable();
        assert!(!playback.is_available());
        playback.speak("Hello", "a");
        assert_eq!(playback.state(), PlaybackState::Idle);
        playback.cancel();
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::Idle.to_string(), "Idle");
        assert_eq!(
            PlaybackState::Speaking("x".to_string()).to_string(),
            "Speaking(x)"
        );
    }

    #[tokio::test]
    async fn test_command_synthesizer_missing_program_fails() {
        let synth = Arc::new(CommandSynthesizer::new(
            "alex-test-no-such-synthesizer",
            Vec::new(),
        ));
        let playback = SpeechPlayback::new(synth);

        playback.speak("Hello", "a");
        assert_eq!(playback.state(), PlaybackState::Idle);
    }
}
