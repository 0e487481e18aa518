//! One request/response cycle against the generation service.

use crate::audio::player::AudioOutput;
use crate::defaults;
use crate::error::Result;
use crate::llm::family::ModelAdapter;
use crate::llm::generator::TextGenerator;
use crate::output::{ConversationEvent, Reporter};
use crate::pipeline::chunker::SentenceChunker;
use crate::pipeline::interrupt::InterruptSignal;
use crate::pipeline::playback::{Playback, PlaybackController, PlaybackSettings};
use crate::pipeline::types::{SentenceChunk, SessionOutcome};
use crate::tts::synthesizer::{SpeechSynthesizer, VoiceConfig};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Streams a response for one turn and speaks it sentence by sentence.
pub struct GenerationSession {
    adapter: ModelAdapter,
    generator: Arc<dyn TextGenerator>,
    reporter: Arc<dyn Reporter>,
}

impl GenerationSession {
    pub fn new(
        adapter: ModelAdapter,
        generator: Arc<dyn TextGenerator>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            adapter,
            generator,
            reporter,
        }
    }

    /// Run the session to completion, cancellation or failure.
    ///
    /// Errors never escape: they are reported and turned into
    /// [`SessionOutcome::Failed`].
    pub fn run(
        &self,
        turn_text: &str,
        signal: &InterruptSignal,
        playback: &mut PlaybackController,
    ) -> SessionOutcome {
        match self.stream_response(turn_text, signal, playback) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.debug(format!("Generation failed: {e}"));
                SessionOutcome::Failed(e.to_string())
            }
        }
    }

    fn stream_response(
        &self,
        turn_text: &str,
        signal: &InterruptSignal,
        playback: &mut PlaybackController,
    ) -> Result<SessionOutcome> {
        let request = self.adapter.build_request(turn_text)?;
        self.debug(format!("Request body: {}", request.body));

        let stream = self.generator.invoke_stream(&request)?;
        let mut chunker = SentenceChunker::new();
        let mut played = 0;

        for raw in stream {
            if signal.is_set() {
                return Ok(SessionOutcome::Cancelled { chunks: played });
            }
            let raw = raw?;
            self.debug(format!("Chunk: {}", String::from_utf8_lossy(&raw)));
            let delta = self.adapter.extract_delta(&raw)?;

            if let Some(chunk) = chunker.push(&delta) {
                if self.speak(&chunk, signal, playback)? == Playback::Cancelled {
                    return Ok(SessionOutcome::Cancelled { chunks: played });
                }
                played += 1;
            }
        }

        if signal.is_set() {
            return Ok(SessionOutcome::Cancelled { chunks: played });
        }
        if let Some(chunk) = chunker.finish() {
            if self.speak(&chunk, signal, playback)? == Playback::Cancelled {
                return Ok(SessionOutcome::Cancelled { chunks: played });
            }
            played += 1;
        }
        Ok(SessionOutcome::Completed { chunks: played })
    }

    fn speak(
        &self,
        chunk: &SentenceChunk,
        signal: &InterruptSignal,
        playback: &mut PlaybackController,
    ) -> Result<Playback> {
        self.reporter
            .report(&ConversationEvent::Speaking(chunk.to_string()));
        playback.play(chunk, signal)
    }

    fn debug(&self, message: String) {
        self.reporter.report(&ConversationEvent::Debug(message));
    }
}

/// Holds the speaking flag set for the lifetime of a session worker.
///
/// On drop, on every exit path including panics, the guard waits out the
/// cooldown and then clears the flag.
pub struct SpeakingGuard {
    flag: Arc<AtomicBool>,
    cooldown: Duration,
}

impl SpeakingGuard {
    pub fn engage(flag: Arc<AtomicBool>, cooldown: Duration) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag, cooldown }
    }

    /// Lengthen the cooldown, e.g. after a failure.
    pub fn extend(&mut self, extra: Duration) {
        self.cooldown += extra;
    }

    /// Release the flag without waiting, e.g. after an interrupt.
    pub fn skip_cooldown(&mut self) {
        self.cooldown = Duration::ZERO;
    }
}

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        if !self.cooldown.is_zero() {
            thread::sleep(self.cooldown);
        }
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Cooldowns applied after each session.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownSettings {
    pub after_response: Duration,
    pub after_error: Duration,
}

impl Default for CooldownSettings {
    fn default() -> Self {
        Self {
            after_response: Duration::from_millis(defaults::COOLDOWN_MS),
            after_error: Duration::from_millis(defaults::ERROR_COOLDOWN_MS),
        }
    }
}

/// A session's outcome, tagged with the id it was spawned under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: u64,
    pub outcome: SessionOutcome,
}

/// Everything a session worker needs, shared across sessions.
#[derive(Clone)]
pub struct SessionFactory {
    pub adapter: ModelAdapter,
    pub generator: Arc<dyn TextGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub output: Arc<dyn AudioOutput>,
    pub voice: VoiceConfig,
    pub playback: PlaybackSettings,
    pub cooldown: CooldownSettings,
    pub reporter: Arc<dyn Reporter>,
}

impl SessionFactory {
    /// Open a playback controller on the configured output.
    pub fn open_playback(&self) -> Result<PlaybackController> {
        PlaybackController::open(
            self.output.as_ref(),
            self.synthesizer.clone(),
            self.voice.clone(),
            self.playback.clone(),
        )
    }

    /// Run one session on a new worker thread.
    ///
    /// `speaking` is set before this returns and cleared by the worker after
    /// its cooldown. A cancelled session skips the cooldown and clears the
    /// flag before its report is sent; other reports are sent first.
    pub fn spawn(
        &self,
        id: u64,
        turn_text: String,
        signal: InterruptSignal,
        speaking: Arc<AtomicBool>,
        reports: Sender<SessionReport>,
    ) -> JoinHandle<()> {
        let mut guard = SpeakingGuard::engage(speaking, self.cooldown.after_response);
        let factory = self.clone();

        thread::spawn(move || {
            let outcome = factory.run_session(&turn_text, &signal);
            let cancelled = outcome.is_cancelled();
            match &outcome {
                SessionOutcome::Cancelled { .. } => guard.skip_cooldown(),
                SessionOutcome::Failed(_) => guard.extend(factory.cooldown.after_error),
                SessionOutcome::Completed { .. } => {}
            }
            let report = SessionReport { id, outcome };
            if cancelled {
                drop(guard);
                send_report(&reports, report);
            } else {
                send_report(&reports, report);
                drop(guard);
            }
        })
    }

    fn run_session(&self, turn_text: &str, signal: &InterruptSignal) -> SessionOutcome {
        let mut playback = match self.open_playback() {
            Ok(playback) => playback,
            Err(e) => {
                self.reporter
                    .report(&ConversationEvent::Debug(format!("Playback unavailable: {e}")));
                return SessionOutcome::Failed(e.to_string());
            }
        };

        let session = GenerationSession::new(
            self.adapter.clone(),
            self.generator.clone(),
            self.reporter.clone(),
        );
        let outcome = session.run(turn_text, signal, &mut playback);

        // Cancelled and failed sessions cut playback at once when dropped.
        if let SessionOutcome::Completed { .. } = outcome
            && let Err(e) = playback.close()
        {
            return SessionOutcome::Failed(e.to_string());
        }
        outcome
    }
}

fn send_report(reports: &Sender<SessionReport>, report: SessionReport) {
    if reports.send(report).is_err() {
        eprintln!("parley: session outcome dropped, orchestrator gone");
    }
}
