//! Turn detection from a stream of transcript events.
//!
//! Final fragments are appended to the current turn. Every recognition poll
//! without results counts down towards turn completion; any fragment, partial
//! or final, restarts the countdown.

use crate::defaults;
use crate::stt::recognizer::{RecognitionEvent, TranscriptFragment};

/// What to do with a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnDecision {
    /// The user said something: start a response for this text.
    Respond(String),
    /// The user stayed silent with an empty turn: say goodbye and stop.
    Farewell,
}

/// Accumulates final transcript text into one user turn.
#[derive(Debug)]
pub struct TurnAggregator {
    parts: Vec<String>,
    silent_polls: u32,
    threshold: u32,
}

impl Default for TurnAggregator {
    fn default() -> Self {
        Self::new(defaults::SILENCE_POLLS)
    }
}

impl TurnAggregator {
    /// Creates an aggregator completing turns after `threshold` silent polls.
    ///
    /// A threshold of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            parts: Vec::new(),
            silent_polls: 0,
            threshold: threshold.max(1),
        }
    }

    /// Records a fragment. Partial fragments only reset the countdown.
    pub fn on_fragment(&mut self, fragment: &TranscriptFragment) {
        self.silent_polls = 0;
        if fragment.is_final {
            let text = fragment.text.trim();
            if !text.is_empty() {
                self.parts.push(text.to_string());
            }
        }
    }

    /// Records one silent recognition poll.
    ///
    /// Returns a decision once the countdown reaches the threshold; the turn
    /// and the countdown are reset at that point.
    pub fn on_silence_tick(&mut self) -> Option<TurnDecision> {
        self.silent_polls += 1;
        if self.silent_polls < self.threshold {
            return None;
        }

        let decision = if self.parts.is_empty() {
            TurnDecision::Farewell
        } else {
            TurnDecision::Respond(self.parts.join(" "))
        };
        self.reset();
        Some(decision)
    }

    /// Routes a recognition event.
    ///
    /// While a response is being spoken, events are discarded, not queued.
    pub fn handle(&mut self, event: &RecognitionEvent, speaking: bool) -> Option<TurnDecision> {
        if speaking {
            return None;
        }
        match event {
            RecognitionEvent::Transcript(fragments) if !fragments.is_empty() => {
                for fragment in fragments {
                    self.on_fragment(fragment);
                }
                None
            }
            RecognitionEvent::Transcript(_) | RecognitionEvent::NoResult => {
                self.on_silence_tick()
            }
            RecognitionEvent::Closed => None,
        }
    }

    /// Clears the turn and the countdown.
    pub fn reset(&mut self) {
        self.parts.clear();
        self.silent_polls = 0;
    }

    /// Text accumulated so far.
    pub fn current_turn(&self) -> String {
        self.parts.join(" ")
    }

    /// Consecutive silent polls since the last fragment.
    pub fn silent_polls(&self) -> u32 {
        self.silent_polls
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
