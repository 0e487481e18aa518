//! parley - hands-free voice conversation with a streaming text-generation model
//!
//! Speech is transcribed into turns, each turn is answered by a streaming
//! model, and the answer is spoken sentence by sentence as it arrives.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod stt;
pub mod tts;

// Composition root - needs everything
#[cfg(all(feature = "cpal-audio", feature = "aws", feature = "cli"))]
pub mod app;

// Collaborator traits
pub use audio::player::{AudioOutput, AudioSink};
pub use audio::recorder::AudioSource;
pub use llm::generator::TextGenerator;
pub use output::Reporter;
pub use stt::recognizer::Recognizer;
pub use tts::synthesizer::SpeechSynthesizer;

// Pipeline
pub use pipeline::orchestrator::{OrchestratorSettings, PipelineOrchestrator};
pub use pipeline::session::SessionFactory;

// Error handling
pub use error::{ParleyError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
