//! Speech capture: continuous dictation as a stream of transcript updates
//!
//! A platform recognizer delivers incremental results, each either final
//! or interim. `SpeechCapture` folds them into the best current guess of
//! the whole utterance: every final segment is kept for the rest of the
//! session, interim segments only until the next update.

use crate::{AlexError, Result};
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

pub const DEFAULT_LOCALE: &str = "en-US";

/// Tells a dictation program which language to expect
pub const LOCALE_ENV_VAR: &str = "ALEX_SPEECH_LOCALE";

/// One recognized span of speech
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionSegment {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// Events a recognizer reports during a session
#[derive(Clone, Debug)]
pub enum RecognizerEvent {
    /// The session's result list; entries before `result_index` are unchanged
    Results {
        result_index: usize,
        results: Vec<RecognitionSegment>,
    },
    /// Speech ended naturally or the session was stopped
    End,
    /// The recognizer failed; the session is over
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub locale: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionOptions {
    pub fn dictation(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            continuous: true,
            interim_results: true,
        }
    }
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self::dictation(DEFAULT_LOCALE)
    }
}

/// A platform speech recognizer
pub trait Recognizer: Send + Sync {
    /// Begin a session, sending its events to `events` until it ends
    fn start(
        &self,
        options: &RecognitionOptions,
        events: UnboundedSender<RecognizerEvent>,
    ) -> Result<()>;

    /// Ask the current session to end
    fn stop(&self);
}

/// Folds recognizer results into the current transcript
#[derive(Debug, Default, Clone)]
pub struct TranscriptAccumulator {
    finalized: String,
}

impl TranscriptAccumulator {
    /// Apply one results event and return the full transcript so far
    pub fn apply(&mut self, result_index: usize, results: &[RecognitionSegment]) -> String {
        let mut interim = String::new();
        for segment in results.iter().skip(result_index) {
            if segment.is_final {
                self.finalized.push_str(&segment.transcript);
            } else {
                interim.push_str(&segment.transcript);
            }
        }
        format!("{}{}", self.finalized, interim).trim().to_string()
    }

    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn clear(&mut self) {
        self.finalized.clear();
    }
}

pub type TranscriptStream = Pin<Box<dyn Stream<Item = String> + Send>>;

struct ActiveSession {
    id: u64,
    events_tx: UnboundedSender<RecognizerEvent>,
}

fn end_session(session: &Mutex<Option<ActiveSession>>, id: u64) -> bool {
    let mut session = session.lock();
    if session.as_ref().map(|s| s.id) != Some(id) {
        return false;
    }
    session.take();
    true
}

/// Moves recognizer events to the transcript stream
///
/// The session is over as soon as the recognizer reports its end, whether
/// or not anyone is polling the stream.
async fn forward_events(
    id: u64,
    session: Arc<Mutex<Option<ActiveSession>>>,
    mut from_recognizer: UnboundedReceiver<RecognizerEvent>,
    to_stream: UnboundedSender<RecognizerEvent>,
) {
    while let Some(event) = from_recognizer.recv().await {
        let ended = matches!(event, RecognizerEvent::End | RecognizerEvent::Error(_));
        if ended && end_session(&session, id) {
            debug!("Recognition session {} over", id);
        }
        if to_stream.send(event).is_err() || ended {
            return;
        }
    }

    // The recognizer went away without reporting an end
    end_session(&session, id);
    let _ = to_stream.send(RecognizerEvent::End);
}

/// Ends the session when the transcript stream goes away
struct SessionGuard {
    id: u64,
    session: Arc<Mutex<Option<ActiveSession>>>,
    recognizer: Arc<dyn Recognizer>,
    ended_by_recognizer: bool,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if end_session(&self.session, self.id) && !self.ended_by_recognizer {
            debug!("Transcript stream dropped, stopping recognition");
            self.recognizer.stop();
        }
    }
}

/// Push-to-talk / continuous dictation over an optional platform recognizer
pub struct SpeechCapture {
    recognizer: Option<Arc<dyn Recognizer>>,
    options: RecognitionOptions,
    session: Arc<Mutex<Option<ActiveSession>>>,
    next_session_id: AtomicU64,
}

impl SpeechCapture {
    pub fn new(recognizer: Arc<dyn Recognizer>, locale: impl Into<String>) -> Self {
        Self {
            recognizer: Some(recognizer),
            options: RecognitionOptions::dictation(locale),
            session: Arc::new(Mutex::new(None)),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Capture on a platform without speech recognition
    pub fn unavailable() -> Self {
        Self {
            recognizer: None,
            options: RecognitionOptions::default(),
            session: Arc::new(Mutex::new(None)),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    pub fn is_listening(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Start a dictation session
    ///
    /// Returns `None` when recognition is unavailable, already running, or
    /// fails to start; those faults are logged, never returned. Must be
    /// called inside a tokio runtime.
    pub fn start_listening(&self) -> Option<TranscriptStream> {
        let Some(recognizer) = &self.recognizer else {
            warn!("Speech recognition not supported on this platform");
            return None;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("Speech capture needs an async runtime");
            return None;
        };

        let (events_tx, mut events_rx) = unbounded_channel();
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut session = self.session.lock();
            if session.is_some() {
                debug!("Already listening");
                return None;
            }
            *session = Some(ActiveSession {
                id,
                events_tx: events_tx.clone(),
            });
        }

        let (recognizer_tx, recognizer_rx) = unbounded_channel();
        if let Err(e) = recognizer.start(&self.options, recognizer_tx) {
            error!("Error starting speech recognition: {}", e);
            end_session(&self.session, id);
            return None;
        }
        info!("Listening ({})", self.options.locale);

        runtime.spawn(forward_events(
            id,
            Arc::clone(&self.session),
            recognizer_rx,
            events_tx,
        ));

        let mut guard = SessionGuard {
            id,
            session: Arc::clone(&self.session),
            recognizer: Arc::clone(recognizer),
            ended_by_recognizer: false,
        };

        let stream = async_stream::stream! {
            let mut transcript = TranscriptAccumulator::default();
            while let Some(event) = events_rx.recv().await {
                match event {
                    RecognizerEvent::Results { result_index, results } => {
                        yield transcript.apply(result_index, &results);
                    }
                    RecognizerEvent::End => {
                        debug!("Recognition session {} ended", id);
                        break;
                    }
                    RecognizerEvent::Error(e) => {
                        error!("Speech recognition error: {}", e);
                        break;
                    }
                }
            }
            transcript.clear();
            guard.ended_by_recognizer = true;
            drop(guard);
        };

        Some(Box::pin(stream))
    }

    /// Stop the current session. Does nothing when not listening.
    pub fn stop_listening(&self) {
        let Some(active) = self.session.lock().take() else {
            return;
        };

        if let Some(recognizer) = &self.recognizer {
            recognizer.stop();
        }
        // Ends the transcript stream even if the recognizer never reports back
        let _ = active.events_tx.send(RecognizerEvent::End);
        info!("Stopped listening");
    }
}

/// Dictation through an external program
///
/// The program runs for one session and prints each recognized phrase as a
/// line on stdout. Its exit ends the session. The locale is passed in
/// `ALEX_SPEECH_LOCALE`.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandRecognizer {
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

impl Recognizer for CommandRecognizer {
    fn start(
        &self,
        options: &RecognitionOptions,
        events: UnboundedSender<RecognizerEvent>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AlexError::RecognitionError(format!("No async runtime: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(LOCALE_ENV_VAR, &options.locale)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AlexError::RecognitionError(format!("Failed to start {}: {}", self.program, e))
            })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AlexError::RecognitionError(format!("{} has no stdout", self.program))
        })?;

        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        if let Some(previous) = self.current.lock().replace(cancel_tx) {
            let _ = previous.send(());
        }

        let program = self.program.clone();
        runtime.spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut results = Vec::new();

            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let phrase = line.trim();
                            if phrase.is_empty() {
                                continue;
                            }
                            results.push(RecognitionSegment::final_text(format!("{phrase} ")));
                            let update = RecognizerEvent::Results {
                                result_index: results.len() - 1,
                                results: results.clone(),
                            };
                            if events.send(update).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("{} closed its output", program);
                            let _ = events.send(RecognizerEvent::End);
                            break;
                        }
                        Err(e) => {
                            let _ = events.send(RecognizerEvent::Error(e.to_string()));
                            break;
                        }
                    },
                    _ = &mut cancel_rx => {
                        let _ = events.send(RecognizerEvent::End);
                        break;
                    }
                }
            }

            if let Err(e) = child.kill().await {
                debug!("Dictation program already exited: {}", e);
            }
        });

        Ok(())
    }

    fn stop(&self) {
        if let Some(cancel_tx) = self.current.lock().take() {
            info!("Stopping dictation program");
            let _ = cancel_tx.send(());
        }
    }
}
