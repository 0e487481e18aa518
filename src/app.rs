//! Voice conversation entry point.
//!
//! Wires microphone, Transcribe, Bedrock, Polly and the speaker into one
//! [`PipelineOrchestrator`] and runs it to completion.

use crate::audio::capture::CpalAudioSource;
use crate::audio::playback::CpalAudioOutput;
use crate::aws::load_sdk_config;
use crate::config::Config;
use crate::error::Result;
use crate::llm::bedrock::BedrockGenerator;
use crate::llm::family::ModelAdapter;
use crate::output::{ConsoleReporter, ConversationEvent, LogLevel, Reporter, startup_banner};
use crate::pipeline::orchestrator::PipelineOrchestrator;
use crate::pipeline::session::SessionFactory;
use crate::pipeline::types::ExitReason;
use crate::stt::transcribe::TranscribeRecognizer;
use crate::tts::polly::PollySynthesizer;
use std::io::BufReader;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Run one conversation with the configured devices and services.
///
/// Blocks until the user says goodbye or a fatal error occurs. Must be
/// called from a thread that may block on `handle` (not a runtime worker).
///
/// # Arguments
/// * `config` - Fully merged configuration (file, environment, CLI)
/// * `quiet` - Suppress the banner and conversation echo
/// * `verbosity` - `-v` count, raising the configured log level
pub fn run_conversation(
    config: Config,
    quiet: bool,
    verbosity: u8,
    handle: Handle,
) -> Result<ExitReason> {
    config.validate()?;

    let level = LogLevel::from_verbosity(verbosity, config.conversation.log_level);
    let reporter = Arc::new(ConsoleReporter::new(level).with_quiet(quiet));
    if !quiet {
        eprintln!("{}", startup_banner(&config, level));
    }

    reporter.report(&ConversationEvent::Info(format!(
        "parley {}",
        crate::version_string()
    )));

    let adapter = ModelAdapter::for_model(&config.model.model_id)?;
    let sdk_config = load_sdk_config(&handle, &config.model.region);
    reporter.report(&ConversationEvent::Debug(format!(
        "Region {} loaded, model family {}",
        config.model.region,
        adapter.family().as_str()
    )));

    let source = CpalAudioSource::new(config.audio.input_device.as_deref())?;
    let output = CpalAudioOutput::new(config.audio.output_device.as_deref());

    let factory = SessionFactory {
        adapter,
        generator: Arc::new(BedrockGenerator::new(handle.clone(), &sdk_config)),
        synthesizer: Arc::new(PollySynthesizer::new(handle.clone(), &sdk_config)),
        output: Arc::new(output),
        voice: config.voice.clone(),
        playback: config.playback_settings(),
        cooldown: config.cooldown_settings(),
        reporter: reporter.clone(),
    };

    let recognizer =
        TranscribeRecognizer::start(&handle, &sdk_config, &config.conversation.language);

    let orchestrator = PipelineOrchestrator::new(factory, config.orchestrator_settings())
        .with_interrupt_input(Box::new(BufReader::new(std::io::stdin())));

    reporter.report(&ConversationEvent::Info("Listening...".to_string()));
    let reason = orchestrator.run(Box::new(source), Box::new(recognizer))?;
    reporter.report(&ConversationEvent::Debug(format!(
        "Conversation ended: {reason:?}"
    )));
    Ok(reason)
}
