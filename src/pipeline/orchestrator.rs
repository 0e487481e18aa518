//! Conversation loop: capture, turn detection, response dispatch.

use crate::audio::recorder::AudioSource;
use crate::defaults;
use crate::error::Result;
use crate::output::{ConversationEvent, Reporter};
use crate::pipeline::aggregator::{TurnAggregator, TurnDecision};
use crate::pipeline::interrupt::{InterruptSignal, spawn_line_listener};
use crate::pipeline::session::{SessionFactory, SessionReport};
use crate::pipeline::types::{AudioFrame, ExitReason};
use crate::stt::recognizer::{RecognitionEvent, Recognizer};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Consecutive capture read failures before the conversation gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Silent recognition polls that complete a turn.
    pub silence_polls: u32,
    /// Capacity of the capture frame channel.
    pub frame_buffer: usize,
    /// Capture poll interval, also the loop's receive timeout.
    pub poll_interval: Duration,
    /// Spoken when the user ends the conversation by staying silent.
    pub farewell_message: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            silence_polls: defaults::SILENCE_POLLS,
            frame_buffer: defaults::FRAME_BUFFER,
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            farewell_message: defaults::FAREWELL_MESSAGE.to_string(),
        }
    }
}

/// Where the conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Aggregating the user's turn.
    Listening,
    /// A session worker is generating and speaking a response.
    Responding,
    /// Saying goodbye before exit.
    Terminating,
}

/// Drives one conversation from the first captured frame to exit.
pub struct PipelineOrchestrator {
    settings: OrchestratorSettings,
    factory: SessionFactory,
    reporter: Arc<dyn Reporter>,
    signal: InterruptSignal,
    speaking: Arc<AtomicBool>,
    interrupt_input: Option<Box<dyn BufRead + Send>>,
    state: ConversationState,
    /// Id of the most recently spawned session.
    session_id: u64,
}

impl PipelineOrchestrator {
    pub fn new(factory: SessionFactory, settings: OrchestratorSettings) -> Self {
        let reporter = factory.reporter.clone();
        Self {
            settings,
            factory,
            reporter,
            signal: InterruptSignal::new(),
            speaking: Arc::new(AtomicBool::new(false)),
            interrupt_input: None,
            state: ConversationState::Listening,
            session_id: 0,
        }
    }

    /// Read interrupt requests from `input`, one per line (usually stdin).
    pub fn with_interrupt_input(mut self, input: Box<dyn BufRead + Send>) -> Self {
        self.interrupt_input = Some(input);
        self
    }

    /// Handle on the interrupt signal shared with the session workers.
    pub fn interrupt_signal(&self) -> InterruptSignal {
        self.signal.clone()
    }

    /// Flag set while a response is in flight, including its cooldown.
    pub fn speaking_flag(&self) -> Arc<AtomicBool> {
        self.speaking.clone()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Run the conversation until farewell, recognition end or capture failure.
    ///
    /// Only startup and recognition errors are returned; session failures are
    /// reported and the conversation continues.
    pub fn run(
        mut self,
        mut source: Box<dyn AudioSource>,
        mut recognizer: Box<dyn Recognizer>,
    ) -> Result<ExitReason> {
        if let Some(input) = self.interrupt_input.take() {
            // Detached: blocks on its input for the rest of the process.
            drop(spawn_line_listener(input, self.signal.clone()));
        }

        source.start()?;
        let running = Arc::new(AtomicBool::new(true));
        let (frame_rx, capture_handle) = self.spawn_capture(source, running.clone());
        let (report_tx, report_rx) = bounded::<SessionReport>(4);
        let mut aggregator = TurnAggregator::new(self.settings.silence_polls);
        let mut worker: Option<JoinHandle<()>> = None;

        let result = loop {
            match self.forward_frames(&frame_rx, recognizer.as_mut()) {
                Ok(true) => {}
                Ok(false) => break Ok(ExitReason::CaptureFailed),
                Err(e) => break Err(e),
            }

            while let Ok(report) = report_rx.try_recv() {
                self.finish_session(report, &mut aggregator);
            }

            match self.drain_events(recognizer.as_mut(), &mut aggregator) {
                Ok(None) => {}
                Ok(Some(TurnDecision::Respond(text))) => {
                    if let Some(previous) = worker.take() {
                        join_worker(previous);
                    }
                    self.reporter
                        .report(&ConversationEvent::TurnComplete(text.clone()));
                    // A stale interrupt must not cancel the new response.
                    self.signal.clear();
                    self.session_id += 1;
                    worker = Some(self.factory.spawn(
                        self.session_id,
                        text,
                        self.signal.clone(),
                        self.speaking.clone(),
                        report_tx.clone(),
                    ));
                    self.transition(ConversationState::Responding);
                }
                Ok(Some(TurnDecision::Farewell)) => {
                    self.transition(ConversationState::Terminating);
                    self.farewell();
                    break Ok(ExitReason::Farewell);
                }
                Err(ExitOn::Closed) => break Ok(ExitReason::RecognitionClosed),
                Err(ExitOn::Error(e)) => break Err(e),
            }
        };

        running.store(false, Ordering::SeqCst);
        if let Err(e) = recognizer.finish() {
            self.debug(format!("Failed to finish recognition stream: {e}"));
        }
        if let Some(handle) = worker.take() {
            join_worker(handle);
        }
        while let Ok(report) = report_rx.try_recv() {
            self.finish_session(report, &mut aggregator);
        }
        if capture_handle.join().is_err() {
            eprintln!("parley: capture thread panicked");
        }
        result
    }

    /// Poll `source` on a thread, sending frames until `running` clears or
    /// the source fails repeatedly.
    fn spawn_capture(
        &self,
        mut source: Box<dyn AudioSource>,
        running: Arc<AtomicBool>,
    ) -> (Receiver<AudioFrame>, JoinHandle<()>) {
        let (frame_tx, frame_rx) = bounded(self.settings.frame_buffer.max(1));
        let poll_interval = self.settings.poll_interval;
        let sequence = AtomicU64::new(0);

        let handle = thread::spawn(move || {
            let mut consecutive_errors: u32 = 0;

            while running.load(Ordering::SeqCst) {
                let samples = match source.read_samples() {
                    Ok(s) => {
                        consecutive_errors = 0;
                        s
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            eprintln!(
                                "parley: audio capture failed {consecutive_errors} times in a row: {e}"
                            );
                            eprintln!("parley: check your microphone connection and try again");
                            break;
                        }
                        thread::sleep(poll_interval);
                        continue;
                    }
                };

                if !samples.is_empty() {
                    let frame = AudioFrame::new(
                        samples,
                        Instant::now(),
                        sequence.fetch_add(1, Ordering::Relaxed),
                    );
                    // Full channel: drop the frame rather than stall capture.
                    if let Err(crossbeam_channel::TrySendError::Disconnected(_)) =
                        frame_tx.try_send(frame)
                    {
                        break;
                    }
                }

                thread::sleep(poll_interval);
            }

            if let Err(e) = source.stop() {
                eprintln!("parley: failed to stop audio capture: {e}");
            }
        });

        (frame_rx, handle)
    }

    /// Forward every pending frame to the recognizer, waiting up to one poll
    /// interval for the first. Returns `false` once capture has stopped.
    fn forward_frames(
        &self,
        frames: &Receiver<AudioFrame>,
        recognizer: &mut dyn Recognizer,
    ) -> Result<bool> {
        match frames.recv_timeout(self.settings.poll_interval) {
            Ok(frame) => recognizer.send_audio(&frame)?,
            Err(RecvTimeoutError::Timeout) => return Ok(true),
            Err(RecvTimeoutError::Disconnected) => return Ok(false),
        }
        while let Ok(frame) = frames.try_recv() {
            recognizer.send_audio(&frame)?;
        }
        Ok(true)
    }

    /// Feed ready recognition events to the aggregator until one completes a
    /// turn or none are left.
    fn drain_events(
        &self,
        recognizer: &mut dyn Recognizer,
        aggregator: &mut TurnAggregator,
    ) -> std::result::Result<Option<TurnDecision>, ExitOn> {
        loop {
            let event = match recognizer.poll_event() {
                Ok(Some(event)) => event,
                Ok(None) => return Ok(None),
                Err(e) => return Err(ExitOn::Error(e)),
            };
            if event == RecognitionEvent::Closed {
                return Err(ExitOn::Closed);
            }

            let speaking = self.speaking.load(Ordering::SeqCst);
            if !speaking && let RecognitionEvent::Transcript(fragments) = &event {
                for fragment in fragments.iter().filter(|f| f.is_final) {
                    self.reporter
                        .report(&ConversationEvent::Heard(fragment.text.clone()));
                }
            }

            if let Some(decision) = aggregator.handle(&event, speaking) {
                return Ok(Some(decision));
            }
        }
    }

    fn finish_session(&mut self, report: SessionReport, aggregator: &mut TurnAggregator) {
        let SessionReport { id, outcome } = report;
        let current = id == self.session_id;
        // A previous session's report must not touch the current one.
        if current && outcome.is_cancelled() {
            self.signal.clear();
            aggregator.reset();
            self.reporter.report(&ConversationEvent::Interrupted);
        }
        self.reporter.report(&ConversationEvent::ResponseEnd(outcome));
        if current && self.state == ConversationState::Responding {
            self.transition(ConversationState::Listening);
        }
    }

    fn farewell(&self) {
        let message = &self.settings.farewell_message;
        self.reporter
            .report(&ConversationEvent::Farewell(message.clone()));
        let spoken = self
            .factory
            .open_playback()
            .and_then(|playback| playback.play_farewell(message));
        if let Err(e) = spoken {
            self.debug(format!("Farewell playback failed: {e}"));
        }
    }

    fn transition(&mut self, to: ConversationState) {
        self.debug(format!("State {:?} -> {:?}", self.state, to));
        self.state = to;
    }

    fn debug(&self, message: String) {
        self.reporter.report(&ConversationEvent::Debug(message));
    }
}

/// Why event draining stopped the loop.
enum ExitOn {
    Closed,
    Error(crate::error::ParleyError),
}

fn join_worker(handle: JoinHandle<()>) {
    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        eprintln!("parley: session worker panicked: {msg}");
    }
}
