//! Console rendering of conversation events.
//!
//! Conversation text (what the user said, what the assistant says) goes to
//! stdout. Diagnostics go to stderr, gated by [`LogLevel`].

use crate::config::Config;
use crate::error::ParleyError;
use crate::llm::catalog::model_ids;
use crate::pipeline::types::SessionOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Mutex;

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Diagnostic verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    None,
    Info,
    Debug,
}

impl LogLevel {
    /// Level for a `-v` count: 0 keeps `base`, 1 is info, 2+ is debug.
    pub fn from_verbosity(verbose: u8, base: LogLevel) -> LogLevel {
        match verbose {
            0 => base,
            1 => base.max(LogLevel::Info),
            _ => LogLevel::Debug,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LogLevel::None),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(ParleyError::ConfigInvalidValue {
                key: "conversation.log_level".to_string(),
                message: format!("'{other}' is not one of: none, info, debug"),
            }),
        }
    }
}

/// Something worth telling the person at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// A final transcript fragment, echoed as the user speaks.
    Heard(String),
    /// A completed user turn about to be answered.
    TurnComplete(String),
    /// A sentence chunk about to be spoken.
    Speaking(String),
    /// The spoken response ended.
    ResponseEnd(SessionOutcome),
    /// The user interrupted the response.
    Interrupted,
    /// The closing message before exit.
    Farewell(String),
    Info(String),
    Debug(String),
}

impl ConversationEvent {
    /// Minimum level at which the event is shown; `None` means always.
    pub fn level(&self) -> LogLevel {
        match self {
            ConversationEvent::Heard(_)
            | ConversationEvent::Speaking(_)
            | ConversationEvent::Farewell(_) => LogLevel::None,
            ConversationEvent::TurnComplete(_)
            | ConversationEvent::Interrupted
            | ConversationEvent::Info(_) => LogLevel::Info,
            ConversationEvent::ResponseEnd(_) | ConversationEvent::Debug(_) => LogLevel::Debug,
        }
    }
}

/// Trait for reporting conversation events.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &ConversationEvent);
}

/// Reporter writing to the terminal.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    level: LogLevel,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            quiet: false,
        }
    }

    /// Suppress the conversation echo; diagnostics still follow the level.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn shows(&self, event: &ConversationEvent) -> bool {
        match event.level() {
            LogLevel::None => !self.quiet,
            level => level <= self.level,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &ConversationEvent) {
        if !self.shows(event) {
            return;
        }
        match event {
            ConversationEvent::Heard(text) => {
                print!("{text} ");
                io::stdout().flush().ok();
            }
            ConversationEvent::Speaking(text) => {
                print!("{text}");
                io::stdout().flush().ok();
            }
            ConversationEvent::Farewell(text) => println!("{text}"),
            ConversationEvent::TurnComplete(text) => {
                println!();
                eprintln!("{GREEN}[INFO] User input: {text}{RESET}");
            }
            ConversationEvent::Interrupted => {
                println!();
                eprintln!("{YELLOW}[INFO] Response interrupted{RESET}");
            }
            ConversationEvent::ResponseEnd(outcome) => {
                println!();
                eprintln!("{DIM}[DEBUG] {}{RESET}", describe_outcome(outcome));
            }
            ConversationEvent::Info(message) => eprintln!("[INFO] {message}"),
            ConversationEvent::Debug(message) => eprintln!("{DIM}[DEBUG] {message}{RESET}"),
        }
    }
}

/// One-line summary of a session outcome.
pub fn describe_outcome(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Completed { chunks } => format!("Response completed ({chunks} chunks)"),
        SessionOutcome::Cancelled { chunks } => {
            format!("Response cancelled after {chunks} chunks")
        }
        SessionOutcome::Failed(message) => format!("Response failed: {message}"),
    }
}

/// Startup banner describing the active configuration.
pub fn startup_banner(config: &Config, level: LogLevel) -> String {
    let rule = "*".repeat(61);
    format!(
        "{rule}\n\
         [INFO] Supported models: {models}.\n\
         [INFO] Change model with --model or the MODEL_ID environment variable.\n\
         \n\
         [INFO] AWS region: {region}\n\
         [INFO] Model: {model}\n\
         [INFO] Voice: engine {engine}, voice {voice}\n\
         [INFO] Log level: {level}\n\
         \n\
         [INFO] Hit ENTER to interrupt a response, then continue speaking.\n\
         [INFO] Stay silent to end the conversation.\n\
         {rule}",
        models = model_ids().join(", "),
        region = config.model.region,
        model = config.model.model_id,
        engine = config.voice.engine,
        voice = config.voice.voice_id,
    )
}

/// Reporter that keeps every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<ConversationEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConversationEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Texts of all [`ConversationEvent::Speaking`] events, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ConversationEvent::Speaking(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, event: &ConversationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
