//! Synthesis and playback of response text.

use crate::audio::player::{AudioOutput, AudioSink};
use crate::defaults;
use crate::error::{ParleyError, Result};
use crate::pipeline::interrupt::InterruptSignal;
use crate::pipeline::types::SentenceChunk;
use crate::tts::synthesizer::{SpeechSynthesizer, VoiceConfig};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// How a chunk's playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Finished,
    /// The interrupt signal was observed before all audio was written.
    Cancelled,
}

/// Playback tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// Largest single write to the sink.
    pub block_bytes: usize,
    /// Pause before stopping the sink so the device buffer can play out.
    pub drain_delay: Duration,
    /// Sentences per synthesis request when speaking the farewell.
    pub farewell_batch_sentences: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            block_bytes: defaults::PLAYBACK_BLOCK_BYTES,
            drain_delay: Duration::from_millis(defaults::DRAIN_DELAY_MS),
            farewell_batch_sentences: defaults::FAREWELL_SENTENCES_PER_REQUEST,
        }
    }
}

/// Owns one open playback sink and the synthesizer feeding it.
///
/// [`close`](Self::close) drains then stops the sink. Dropping a controller
/// that is still open stops the sink at once, discarding queued audio.
pub struct PlaybackController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voice: VoiceConfig,
    settings: PlaybackSettings,
    sink: Option<Box<dyn AudioSink>>,
}

impl PlaybackController {
    pub fn open(
        output: &dyn AudioOutput,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voice: VoiceConfig,
        settings: PlaybackSettings,
    ) -> Result<Self> {
        let sink = output.open()?;
        Ok(Self {
            synthesizer,
            voice,
            settings,
            sink: Some(sink),
        })
    }

    /// Synthesize `chunk` and write it to the sink block by block.
    ///
    /// The signal is checked before synthesis, after synthesis and before
    /// every block write.
    pub fn play(&mut self, chunk: &SentenceChunk, signal: &InterruptSignal) -> Result<Playback> {
        if signal.is_set() {
            return Ok(Playback::Cancelled);
        }
        let mut audio = self.synthesizer.synthesize(chunk.as_str(), &self.voice)?;
        if signal.is_set() {
            return Ok(Playback::Cancelled);
        }

        let block_bytes = self.settings.block_bytes.max(1);
        let mut block = vec![0u8; block_bytes];
        let sink = self.sink_mut()?;
        loop {
            let filled = read_block(&mut audio, &mut block)?;
            if filled == 0 {
                return Ok(Playback::Finished);
            }
            if signal.is_set() {
                return Ok(Playback::Cancelled);
            }
            sink.write(&block[..filled])?;
        }
    }

    /// Speak `text` to the end, ignoring interrupts, then close.
    ///
    /// Long text is synthesized in batches of sentences; the audio of all
    /// batches is written in one piece.
    pub fn play_farewell(mut self, text: &str) -> Result<()> {
        let mut pcm = Vec::new();
        for batch in farewell_batches(text, self.settings.farewell_batch_sentences) {
            let mut audio = self.synthesizer.synthesize(&batch, &self.voice)?;
            audio
                .read_to_end(&mut pcm)
                .map_err(|e| ParleyError::Synthesis {
                    message: format!("Failed to read synthesized audio: {e}"),
                })?;
        }
        self.sink_mut()?.write(&pcm)?;
        self.close()?;
        std::thread::sleep(self.settings.drain_delay);
        Ok(())
    }

    /// Wait for queued audio to play out, then stop the sink.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut sink) = self.sink.take() {
            std::thread::sleep(self.settings.drain_delay);
            sink.stop()?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    fn sink_mut(&mut self) -> Result<&mut Box<dyn AudioSink>> {
        self.sink.as_mut().ok_or_else(|| ParleyError::AudioPlayback {
            message: "playback sink is closed".to_string(),
        })
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take()
            && let Err(e) = sink.stop()
        {
            eprintln!("parley: failed to stop playback: {e}");
        }
    }
}

/// Fill `block` from `audio`, tolerating short reads. Returns bytes filled;
/// 0 means end of stream.
fn read_block(audio: &mut dyn Read, block: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match audio.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ParleyError::Synthesis {
                    message: format!("Failed to read synthesized audio: {e}"),
                });
            }
        }
    }
    Ok(filled)
}

/// Split `text` on sentence boundaries (`". "`) into groups of at most
/// `per_batch` sentences, rejoined with `". "`.
pub fn farewell_batches(text: &str, per_batch: usize) -> Vec<String> {
    let sentences: Vec<&str> = text.split(". ").collect();
    sentences
        .chunks(per_batch.max(1))
        .map(|group| group.join(". "))
        .filter(|batch| !batch.trim().is_empty())
        .collect()
}
