//! Speech synthesis.

#[cfg(feature = "aws")]
pub mod polly;
pub mod synthesizer;

pub use synthesizer::{MockSynthesizer, SpeechSynthesizer, VoiceConfig};
