//! Error types for parley.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParleyError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Unknown model id '{model_id}'. Supported models: {supported}")]
    UnknownModel { model_id: String, supported: String },

    #[error("Unknown model provider '{provider}'")]
    UnknownProvider { provider: String },

    // Audio device errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // Collaborator service errors
    #[error("Speech recognition failed: {message}")]
    Recognition { message: String },

    #[error("Text generation failed: {message}")]
    Generation { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Malformed generation chunk: {0}")]
    DeltaDecode(#[from] serde_json::Error),

    #[error("Generation chunk is missing field '{field}'")]
    DeltaMissingField { field: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParleyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = ParleyError::ConfigInvalidValue {
            key: "conversation.silence_polls".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for conversation.silence_polls: must be at least 1"
        );
    }

    #[test]
    fn test_unknown_model_display_lists_supported() {
        let error = ParleyError::UnknownModel {
            model_id: "openai.gpt".to_string(),
            supported: "amazon.titan-text-express-v1, meta.llama2-13b-chat-v1".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("openai.gpt"));
        assert!(msg.contains("amazon.titan-text-express-v1"));
    }

    #[test]
    fn test_unknown_provider_display() {
        let error = ParleyError::UnknownProvider {
            provider: "mistral".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown model provider 'mistral'");
    }

    #[test]
    fn test_service_errors_display() {
        let recognition = ParleyError::Recognition {
            message: "stream reset".to_string(),
        };
        assert_eq!(
            recognition.to_string(),
            "Speech recognition failed: stream reset"
        );

        let generation = ParleyError::Generation {
            message: "throttled".to_string(),
        };
        assert_eq!(generation.to_string(), "Text generation failed: throttled");

        let synthesis = ParleyError::Synthesis {
            message: "voice unavailable".to_string(),
        };
        assert_eq!(
            synthesis.to_string(),
            "Speech synthesis failed: voice unavailable"
        );
    }

    #[test]
    fn test_audio_playback_display() {
        let error = ParleyError::AudioPlayback {
            message: "underrun".to_string(),
        };
        assert_eq!(error.to_string(), "Audio playback failed: underrun");
    }

    #[test]
    fn test_missing_field_display() {
        let error = ParleyError::DeltaMissingField {
            field: "outputText".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Generation chunk is missing field 'outputText'"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let error: ParleyError = json_error.into();
        assert!(error.to_string().starts_with("Malformed generation chunk"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: ParleyError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: ParleyError = io_error.into();
        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ParleyError>();
        assert_sync::<ParleyError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<i32> {
            Err(ParleyError::DeltaMissingField {
                field: "generation".to_string(),
            })
        }
        assert!(returns_error().is_err());
    }
}
