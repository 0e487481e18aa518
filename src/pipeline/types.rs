//! Data types shared by the conversation pipeline.

use std::fmt;
use std::time::Instant;

/// A frame of captured audio samples.
///
/// Created by the capture thread and handed to the orchestrator through a
/// bounded channel; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM samples (16-bit signed integers, mono, 16 kHz).
    pub samples: Vec<i16>,
    /// Timestamp when this frame was captured.
    pub timestamp: Instant,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
}

impl AudioFrame {
    /// Creates a new audio frame.
    pub fn new(samples: Vec<i16>, timestamp: Instant, sequence: u64) -> Self {
        Self {
            samples,
            timestamp,
            sequence,
        }
    }

    /// Little-endian PCM bytes, the wire format expected by recognition services.
    pub fn pcm_bytes(&self) -> Vec<u8> {
        crate::audio::convert::samples_to_pcm_bytes(&self.samples)
    }

    /// Duration of the frame in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / sample_rate as u64
    }
}

/// A unit of generated text that ends on a sentence delimiter and is ready
/// for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceChunk(String);

impl SentenceChunk {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SentenceChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SentenceChunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How one generation session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stream ended and every chunk was played.
    Completed { chunks: usize },
    /// The interrupt signal was observed; `chunks` were fully played before it.
    Cancelled { chunks: usize },
    /// The request, stream, synthesis or playback failed; the turn is dropped.
    Failed(String),
}

impl SessionOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionOutcome::Cancelled { .. })
    }
}

/// Why the conversation loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user stayed silent with nothing to say; the farewell was played.
    Farewell,
    /// The recognition stream closed.
    RecognitionClosed,
    /// The capture device failed repeatedly.
    CaptureFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frame_creation() {
        let samples = vec![100, 200, 300];
        let timestamp = Instant::now();

        let frame = AudioFrame::new(samples.clone(), timestamp, 42);

        assert_eq!(frame.samples, samples);
        assert_eq!(frame.timestamp, timestamp);
        assert_eq!(frame.sequence, 42);
    }

    #[test]
    fn test_audio_frame_pcm_bytes_little_endian() {
        let frame = AudioFrame::new(vec![1, -2, 0x1234], Instant::now(), 0);
        assert_eq!(frame.pcm_bytes(), vec![0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12]);
    }

    #[test]
    fn test_audio_frame_duration() {
        let frame = AudioFrame::new(vec![0; 4096], Instant::now(), 0);
        assert_eq!(frame.duration_ms(16000), 256);
        assert_eq!(frame.duration_ms(0), 0);
    }

    #[test]
    fn test_sentence_chunk_display() {
        let chunk = SentenceChunk::new("Hello world. ".to_string());
        assert_eq!(chunk.to_string(), "Hello world. ");
        assert_eq!(chunk.as_str(), "Hello world. ");
        assert_eq!(chunk.into_string(), "Hello world. ");
    }

    #[test]
    fn test_session_outcome_is_cancelled() {
        assert!(SessionOutcome::Cancelled { chunks: 0 }.is_cancelled());
        assert!(!SessionOutcome::Completed { chunks: 2 }.is_cancelled());
        assert!(!SessionOutcome::Failed("boom".to_string()).is_cancelled());
    }
}
