use crate::error::{ParleyError, Result};
use crate::pipeline::types::AudioFrame;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One recognition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    pub text: String,
    /// `false` while the recognizer may still revise the text.
    pub is_final: bool,
}

impl TranscriptFragment {
    pub fn final_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_final: true,
        }
    }

    pub fn partial(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_final: false,
        }
    }
}

/// Event produced by a recognizer poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A result set; an empty set means nothing was recognized in the interval.
    Transcript(Vec<TranscriptFragment>),
    /// Explicit "no result within this polling interval".
    NoResult,
    /// The recognition stream ended.
    Closed,
}

/// Trait for streaming speech recognition.
///
/// Audio is pushed frame by frame; events are pulled without blocking.
pub trait Recognizer: Send {
    /// Forward a captured frame to the recognition stream.
    fn send_audio(&mut self, frame: &AudioFrame) -> Result<()>;

    /// Next available event, or `None` if nothing is ready yet.
    fn poll_event(&mut self) -> Result<Option<RecognitionEvent>>;

    /// Signal end of audio. Default is a no-op.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Recognizer that replays a fixed list of events, for tests and dry runs.
///
/// Once the script is exhausted it reports [`RecognitionEvent::Closed`].
#[derive(Debug, Clone)]
pub struct ScriptedRecognizer {
    script: VecDeque<RecognitionEvent>,
    hold: Option<Arc<AtomicBool>>,
    frames_received: Arc<AtomicUsize>,
    fail_on_send: bool,
}

impl ScriptedRecognizer {
    pub fn new(events: Vec<RecognitionEvent>) -> Self {
        Self {
            script: events.into(),
            hold: None,
            frames_received: Arc::new(AtomicUsize::new(0)),
            fail_on_send: false,
        }
    }

    /// Withhold events while `flag` is set (e.g. the pipeline's speaking flag),
    /// like a user who waits for the assistant to finish.
    pub fn held_while(mut self, flag: Arc<AtomicBool>) -> Self {
        self.hold = Some(flag);
        self
    }

    /// Configure the mock to fail when audio is sent.
    pub fn with_send_failure(mut self) -> Self {
        self.fail_on_send = true;
        self
    }

    /// Shared counter of frames passed to [`Recognizer::send_audio`].
    pub fn frames_received(&self) -> Arc<AtomicUsize> {
        self.frames_received.clone()
    }

    /// Events still queued.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Recognizer for ScriptedRecognizer {
    fn send_audio(&mut self, _frame: &AudioFrame) -> Result<()> {
        if self.fail_on_send {
            return Err(ParleyError::Recognition {
                message: "mock recognition failure".to_string(),
            });
        }
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<RecognitionEvent>> {
        if self
            .hold
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            return Ok(None);
        }
        Ok(Some(
            self.script.pop_front().unwrap_or(RecognitionEvent::Closed),
        ))
    }
}
