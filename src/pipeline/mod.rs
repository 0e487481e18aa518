//! Conversation pipeline.
//!
//! Capture, turn aggregation, generation and playback run on separate
//! threads connected by bounded crossbeam channels. At most one generation
//! session is active at a time.

pub mod aggregator;
pub mod chunker;
pub mod interrupt;
pub mod orchestrator;
pub mod playback;
pub mod session;
pub mod types;

pub use aggregator::{TurnAggregator, TurnDecision};
pub use chunker::SentenceChunker;
pub use interrupt::{InterruptSignal, spawn_line_listener};
pub use orchestrator::{ConversationState, OrchestratorSettings, PipelineOrchestrator};
pub use playback::{Playback, PlaybackController, PlaybackSettings};
pub use session::{CooldownSettings, GenerationSession, SessionFactory, SessionReport};
pub use types::{AudioFrame, ExitReason, SentenceChunk, SessionOutcome};
