//! Voice input and output
//!
//! This module provides:
//! - Speech capture: dictation as a stream of transcript updates
//! - Speech playback: one utterance at a time, keyed by message id

pub mod stt;
pub mod tts;

// Re-export commonly used types
pub use stt::{
    CommandRecognizer, RecognitionOptions, RecognitionSegment, Recognizer, RecognizerEvent, SpeechCapture,
    TranscriptAccumulator, TranscriptStream,
};
pub use tts::{CommandSynthesizer, PlaybackEvents, PlaybackState, SpeechPlayback, Synthesizer};
