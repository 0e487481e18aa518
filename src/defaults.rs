//! Default configuration constants for parley.
//!
//! Shared by the config types, the pipeline and the audio backends so every
//! stage agrees on the same audio format and timings.

/// Audio sample rate in Hz, used for capture, recognition and playback.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels (mono).
pub const CHANNELS: u16 = 1;

/// Bytes per PCM sample (16-bit signed little-endian).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Default generation model identifier.
pub const DEFAULT_MODEL_ID: &str = "amazon.titan-text-express-v1";

/// Default cloud region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Consecutive silent recognition polls that complete a turn.
pub const SILENCE_POLLS: u32 = 4;

/// Message spoken when the user ends the conversation by staying silent.
pub const FAREWELL_MESSAGE: &str =
    "If you have any other questions, please don't hesitate to ask. Have a great day!";

/// Recognition language for the transcription stream.
pub const RECOGNITION_LANGUAGE: &str = "en-US";

/// Synthesis engine.
pub const VOICE_ENGINE: &str = "neural";

/// Synthesis language code.
pub const VOICE_LANGUAGE: &str = "en-US";

/// Synthesis voice.
pub const VOICE_ID: &str = "Joanna";

/// Synthesis output format (raw linear PCM at [`SAMPLE_RATE`]).
pub const VOICE_OUTPUT_FORMAT: &str = "pcm";

/// Size of each playback device write in bytes.
///
/// The interrupt signal is checked before every block, so this bounds how much
/// audio can still be queued after the user interrupts.
pub const PLAYBACK_BLOCK_BYTES: usize = 1024;

/// Delay before stopping the playback device so queued audio is heard.
pub const DRAIN_DELAY_MS: u64 = 1000;

/// Time `speaking` stays set after a response ends.
///
/// Keeps the tail of the assistant's own voice from being transcribed as a
/// new user turn.
pub const COOLDOWN_MS: u64 = 1000;

/// Extra delay after a failed response before listening resumes.
pub const ERROR_COOLDOWN_MS: u64 = 2000;

/// Maximum sentences sent in one synthesis request on the farewell path.
pub const FAREWELL_SENTENCES_PER_REQUEST: usize = 20;

/// Capture frames buffered between the capture thread and the orchestrator.
pub const FRAME_BUFFER: usize = 256;

/// Interval between capture polls and orchestrator ticks in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farewell_message_is_not_empty() {
        assert!(!FAREWELL_MESSAGE.trim().is_empty());
    }

    #[test]
    fn playback_block_is_whole_samples() {
        assert_eq!(PLAYBACK_BLOCK_BYTES % BYTES_PER_SAMPLE, 0);
    }
}
