use crate::defaults;
use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Voice parameters passed with every synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub engine: String,
    pub language_code: String,
    pub voice_id: String,
    pub output_format: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            engine: defaults::VOICE_ENGINE.to_string(),
            language_code: defaults::VOICE_LANGUAGE.to_string(),
            voice_id: defaults::VOICE_ID.to_string(),
            output_format: defaults::VOICE_OUTPUT_FORMAT.to_string(),
        }
    }
}

/// Linear PCM audio returned by a synthesizer.
pub type AudioStream = Box<dyn Read + Send>;

/// Trait for text-to-speech synthesis.
///
/// The returned stream carries 16-bit mono PCM at [`defaults::SAMPLE_RATE`].
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<AudioStream>;
}

impl<T: SpeechSynthesizer> SpeechSynthesizer for Arc<T> {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<AudioStream> {
        (**self).synthesize(text, voice)
    }
}

/// Mock synthesizer producing a fixed number of audio bytes per character.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    bytes_per_char: usize,
    delay: Duration,
    should_fail: bool,
    texts: Arc<Mutex<Vec<String>>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            bytes_per_char: 64,
            delay: Duration::ZERO,
            should_fail: false,
            texts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Configure how much audio each input character produces.
    pub fn with_bytes_per_char(mut self, bytes: usize) -> Self {
        self.bytes_per_char = bytes;
        self
    }

    /// Simulate service latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Configure the mock to fail on synthesize.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Texts synthesized so far, in call order.
    pub fn texts(&self) -> Arc<Mutex<Vec<String>>> {
        self.texts.clone()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<AudioStream> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.should_fail {
            return Err(ParleyError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        if let Ok(mut texts) = self.texts.lock() {
            texts.push(text.to_string());
        }
        let audio = vec![0u8; text.chars().count() * self.bytes_per_char];
        Ok(Box::new(Cursor::new(audio)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_config_defaults() {
        let voice = VoiceConfig::default();
        assert_eq!(voice.engine, "neural");
        assert_eq!(voice.language_code, "en-US");
        assert_eq!(voice.voice_id, "Joanna");
        assert_eq!(voice.output_format, "pcm");
    }

    #[test]
    fn test_mock_synthesizer_output_length() {
        let synth = MockSynthesizer::new().with_bytes_per_char(10);
        let mut audio = Vec::new();
        synth
            .synthesize("Hello.", &VoiceConfig::default())
            .unwrap()
            .read_to_end(&mut audio)
            .unwrap();
        assert_eq!(audio.len(), 60);
    }

    #[test]
    fn test_mock_synthesizer_records_texts() {
        let synth = MockSynthesizer::new();
        let texts = synth.texts();
        synth.synthesize("one", &VoiceConfig::default()).unwrap();
        synth.synthesize("two", &VoiceConfig::default()).unwrap();
        assert_eq!(*texts.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_mock_synthesizer_failure() {
        let synth = MockSynthesizer::new().with_failure();
        match synth.synthesize("x", &VoiceConfig::default()) {
            Err(ParleyError::Synthesis { message }) => {
                assert_eq!(message, "mock synthesis failure")
            }
            Err(other) => panic!("Expected Synthesis error, got {other:?}"),
            Ok(_) => panic!("Expected Synthesis error"),
        }
    }

    #[test]
    fn test_voice_config_partial_toml() {
        let voice: VoiceConfig = toml::from_str(r#"voice_id = "Matthew""#).unwrap();
        assert_eq!(voice.voice_id, "Matthew");
        assert_eq!(voice.engine, "neural");
    }
}
