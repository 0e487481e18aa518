//! Amazon Polly synthesizer.

use crate::defaults;
use crate::error::{ParleyError, Result};
use crate::tts::synthesizer::{AudioStream, SpeechSynthesizer, VoiceConfig};
use aws_config::SdkConfig;
use aws_sdk_polly::Client;
use aws_sdk_polly::error::DisplayErrorContext;
use aws_sdk_polly::types::{Engine, LanguageCode, OutputFormat, VoiceId};
use std::io::Cursor;
use tokio::runtime::Handle;

pub struct PollySynthesizer {
    client: Client,
    handle: Handle,
}

impl PollySynthesizer {
    pub fn new(handle: Handle, sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            handle,
        }
    }

    async fn synthesize_bytes(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        let output = self
            .client
            .synthesize_speech()
            .text(text)
            .engine(Engine::from(voice.engine.as_str()))
            .language_code(LanguageCode::from(voice.language_code.as_str()))
            .voice_id(VoiceId::from(voice.voice_id.as_str()))
            .output_format(OutputFormat::from(voice.output_format.as_str()))
            .sample_rate(defaults::SAMPLE_RATE.to_string())
            .send()
            .await
            .map_err(|e| ParleyError::Synthesis {
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let audio = output
            .audio_stream
            .collect()
            .await
            .map_err(|e| ParleyError::Synthesis {
                message: format!("Failed to read synthesized audio: {e}"),
            })?;
        Ok(audio.into_bytes().to_vec())
    }
}

impl SpeechSynthesizer for PollySynthesizer {
    /// The whole utterance is buffered before it is returned.
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<AudioStream> {
        let bytes = self.handle.block_on(self.synthesize_bytes(text, voice))?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
