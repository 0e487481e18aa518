//! Streaming text generation.

#[cfg(feature = "aws")]
pub mod bedrock;
pub mod catalog;
pub mod family;
pub mod generator;

pub use family::{ModelAdapter, ModelFamily, ModelRequest};
pub use generator::{ScriptedGenerator, TextGenerator};
