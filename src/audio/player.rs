use crate::error::{ParleyError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An open playback stream accepting 16-bit mono PCM at 16 kHz.
pub trait AudioSink: Send {
    /// Queue bytes for playback, blocking while the device buffer is full.
    fn write(&mut self, pcm: &[u8]) -> Result<()>;

    /// Halt playback and release the device. Queued audio is discarded.
    fn stop(&mut self) -> Result<()>;
}

/// Factory for playback streams.
pub trait AudioOutput: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioSink>>;
}

impl<T: AudioOutput> AudioOutput for Arc<T> {
    fn open(&self) -> Result<Box<dyn AudioSink>> {
        (**self).open()
    }
}

type WriteHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Mock audio output recording every write, for testing.
///
/// All sinks opened from one mock share the same recording.
#[derive(Clone)]
pub struct MockAudioOutput {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    opens: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    should_fail_open: bool,
    should_fail_write: bool,
    on_write: Option<WriteHook>,
}

impl MockAudioOutput {
    pub fn new() -> Self {
        Self {
            writes: Arc::new(Mutex::new(Vec::new())),
            opens: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
            should_fail_open: false,
            should_fail_write: false,
            on_write: None,
        }
    }

    /// Configure the mock to fail when a sink is opened.
    pub fn with_open_failure(mut self) -> Self {
        self.should_fail_open = true;
        self
    }

    /// Configure opened sinks to fail on write.
    pub fn with_write_failure(mut self) -> Self {
        self.should_fail_write = true;
        self
    }

    /// Call `hook` with the running write count after every write.
    pub fn with_write_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_write = Some(Arc::new(hook));
        self
    }

    /// Every block written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Total number of bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.writes().iter().map(Vec::len).sum()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for MockAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for MockAudioOutput {
    fn open(&self) -> Result<Box<dyn AudioSink>> {
        if self.should_fail_open {
            return Err(ParleyError::AudioPlayback {
                message: "mock output unavailable".to_string(),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAudioSink {
            output: self.clone(),
        }))
    }
}

struct MockAudioSink {
    output: MockAudioOutput,
}

impl AudioSink for MockAudioSink {
    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        if self.output.should_fail_write {
            return Err(ParleyError::AudioPlayback {
                message: "mock write failure".to_string(),
            });
        }
        let count = match self.output.writes.lock() {
            Ok(mut writes) => {
                writes.push(pcm.to_vec());
                writes.len()
            }
            Err(_) => 0,
        };
        if let Some(hook) = &self.output.on_write {
            hook(count);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.output.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_mock_output_records_writes_across_sinks() {
        let output = MockAudioOutput::new();

        let mut first = output.open().unwrap();
        first.write(&[1, 2]).unwrap();
        first.stop().unwrap();

        let mut second = output.open().unwrap();
        second.write(&[3]).unwrap();

        assert_eq!(output.writes(), vec![vec![1, 2], vec![3]]);
        assert_eq!(output.bytes_written(), 3);
        assert_eq!(output.open_count(), 2);
        assert_eq!(output.stop_count(), 1);
    }

    #[test]
    fn test_mock_output_open_failure() {
        let output = MockAudioOutput::new().with_open_failure();
        assert!(matches!(
            output.open(),
            Err(ParleyError::AudioPlayback { .. })
        ));
        assert_eq!(output.open_count(), 0);
    }

    #[test]
    fn test_mock_output_write_failure() {
        let output = MockAudioOutput::new().with_write_failure();
        let mut sink = output.open().unwrap();
        assert!(sink.write(&[0; 4]).is_err());
        assert!(output.writes().is_empty());
    }

    #[test]
    fn test_mock_output_write_hook_sees_running_count() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let output = MockAudioOutput::new().with_write_hook(move |count| {
            if count == 2 {
                flag.store(true, Ordering::SeqCst);
            }
        });

        let mut sink = output.open().unwrap();
        sink.write(&[0]).unwrap();
        assert!(!fired.load(Ordering::SeqCst));
        sink.write(&[0]).unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }
}
