use crate::defaults;
use crate::error::{ParleyError, Result};
use crate::llm::catalog::require_model;
use crate::output::LogLevel;
use crate::pipeline::orchestrator::OrchestratorSettings;
use crate::pipeline::playback::PlaybackSettings;
use crate::pipeline::session::CooldownSettings;
use crate::tts::synthesizer::VoiceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub conversation: ConversationConfig,
    pub model: ModelConfig,
    pub voice: VoiceConfig,
    pub playback: PlaybackConfig,
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub frame_buffer: usize,
    pub poll_interval_ms: u64,
}

/// Turn-taking and console configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationConfig {
    pub silence_polls: u32,
    pub log_level: LogLevel,
    pub farewell_message: String,
    pub language: String,
    pub cooldown_ms: u64,
    pub error_cooldown_ms: u64,
}

/// Generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub model_id: String,
    pub region: String,
}

/// Speaker output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub block_bytes: usize,
    pub drain_delay_ms: u64,
    pub farewell_batch_sentences: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            frame_buffer: defaults::FRAME_BUFFER,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            silence_polls: defaults::SILENCE_POLLS,
            log_level: LogLevel::None,
            farewell_message: defaults::FAREWELL_MESSAGE.to_string(),
            language: defaults::RECOGNITION_LANGUAGE.to_string(),
            cooldown_ms: defaults::COOLDOWN_MS,
            error_cooldown_ms: defaults::ERROR_COOLDOWN_MS,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: defaults::DEFAULT_MODEL_ID.to_string(),
            region: defaults::DEFAULT_REGION.to_string(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            block_bytes: defaults::PLAYBACK_BLOCK_BYTES,
            drain_delay_ms: defaults::DRAIN_DELAY_MS,
            farewell_batch_sentences: defaults::FAREWELL_SENTENCES_PER_REQUEST,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration, or defaults if the file does not exist.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MODEL_ID → model.model_id
    /// - AWS_REGION → model.region
    /// - PARLEY_INPUT_DEVICE → audio.input_device
    /// - PARLEY_OUTPUT_DEVICE → audio.output_device
    /// - PARLEY_VOICE_ID → voice.voice_id
    /// - PARLEY_LOG_LEVEL → conversation.log_level (ignored if not a level)
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(model_id) = non_empty_env("MODEL_ID") {
            self.model.model_id = model_id;
        }
        if let Some(region) = non_empty_env("AWS_REGION") {
            self.model.region = region;
        }
        if let Some(device) = non_empty_env("PARLEY_INPUT_DEVICE") {
            self.audio.input_device = Some(device);
        }
        if let Some(device) = non_empty_env("PARLEY_OUTPUT_DEVICE") {
            self.audio.output_device = Some(device);
        }
        if let Some(voice_id) = non_empty_env("PARLEY_VOICE_ID") {
            self.voice.voice_id = voice_id;
        }
        if let Some(level) = non_empty_env("PARLEY_LOG_LEVEL")
            && let Ok(level) = level.parse()
        {
            self.conversation.log_level = level;
        }
        self
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        require_model(&self.model.model_id)?;

        if self.model.region.trim().is_empty() {
            return Err(invalid("model.region", "must not be empty"));
        }
        if self.conversation.silence_polls == 0 {
            return Err(invalid("conversation.silence_polls", "must be at least 1"));
        }
        if self.conversation.farewell_message.trim().is_empty() {
            return Err(invalid("conversation.farewell_message", "must not be blank"));
        }
        if self.playback.block_bytes < defaults::BYTES_PER_SAMPLE
            || self.playback.block_bytes % defaults::BYTES_PER_SAMPLE != 0
        {
            return Err(invalid(
                "playback.block_bytes",
                "must be a positive multiple of 2 (whole 16-bit samples)",
            ));
        }
        if self.playback.farewell_batch_sentences == 0 {
            return Err(invalid(
                "playback.farewell_batch_sentences",
                "must be at least 1",
            ));
        }
        if self.audio.frame_buffer == 0 {
            return Err(invalid("audio.frame_buffer", "must be at least 1"));
        }
        Ok(())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            silence_polls: self.conversation.silence_polls,
            frame_buffer: self.audio.frame_buffer,
            poll_interval: Duration::from_millis(self.audio.poll_interval_ms),
            farewell_message: self.conversation.farewell_message.clone(),
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            block_bytes: self.playback.block_bytes,
            drain_delay: Duration::from_millis(self.playback.drain_delay_ms),
            farewell_batch_sentences: self.playback.farewell_batch_sentences,
        }
    }

    pub fn cooldown_settings(&self) -> CooldownSettings {
        CooldownSettings {
            after_response: Duration::from_millis(self.conversation.cooldown_ms),
            after_error: Duration::from_millis(self.conversation.error_cooldown_ms),
        }
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/parley/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("config.toml")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn invalid(key: &str, message: &str) -> ParleyError {
    ParleyError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
