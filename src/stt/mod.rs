//! Streaming speech recognition.

pub mod recognizer;
#[cfg(feature = "aws")]
pub mod transcribe;

pub use recognizer::{RecognitionEvent, Recognizer, ScriptedRecognizer, TranscriptFragment};
