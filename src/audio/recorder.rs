use crate::error::{ParleyError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for microphone-like audio sources.
///
/// Sources deliver 16-bit mono PCM at 16 kHz; device-specific conversion
/// happens behind this trait.
pub trait AudioSource: Send {
    /// Start capturing audio.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio.
    fn stop(&mut self) -> Result<()>;

    /// Drain the samples captured since the previous call.
    ///
    /// An empty vector means nothing new has arrived yet.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Mock audio source for testing
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    samples: Vec<i16>,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
    reads: Arc<AtomicUsize>,
}

impl MockAudioSource {
    /// Create a new mock audio source yielding 10 ms of silence per read.
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 160],
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return specific samples
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Shared counter of read attempts.
    pub fn reads(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }

    fn failure(&self) -> ParleyError {
        ParleyError::AudioCapture {
            message: self.error_message.clone(),
        }
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(self.failure());
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.should_fail_read {
            return Err(self.failure());
        }
        Ok(self.samples.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_audio_source_returns_configured_samples() {
        let test_samples = vec![100i16, 200, 300, 400, 500];
        let mut source = MockAudioSource::new().with_samples(test_samples.clone());

        assert_eq!(source.read_samples().unwrap(), test_samples);
    }

    #[test]
    fn test_mock_audio_source_returns_default_silence() {
        let mut source = MockAudioSource::new();

        let samples = source.read_samples().unwrap();
        assert_eq!(samples.len(), 160);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_mock_audio_source_custom_read_error() {
        let mut source = MockAudioSource::new()
            .with_read_failure()
            .with_error_message("buffer overflow");

        match source.read_samples() {
            Err(ParleyError::AudioCapture { message }) => {
                assert_eq!(message, "buffer overflow");
            }
            other => panic!("Expected AudioCapture error, got {other:?}"),
        }
    }

    #[test]
    fn test_mock_audio_source_start_stop_state() {
        let mut source = MockAudioSource::new();
        assert!(!source.is_started());

        source.start().unwrap();
        assert!(source.is_started());

        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_audio_source_start_failure() {
        let mut source = MockAudioSource::new()
            .with_start_failure()
            .with_error_message("device not found");

        assert!(source.start().is_err());
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_audio_source_counts_reads() {
        let mut source = MockAudioSource::new().with_read_failure();
        let reads = source.reads();

        let _ = source.read_samples();
        let _ = source.read_samples();

        assert_eq!(reads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_audio_source_trait_is_object_safe() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_samples(vec![1i16, 2, 3]));

        assert!(source.start().is_ok());
        assert_eq!(source.read_samples().unwrap(), vec![1i16, 2, 3]);
        assert!(source.stop().is_ok());
    }
}
