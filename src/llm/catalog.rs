//! Catalog of supported generation models.
//!
//! Each entry is a request template: the model identifier, the content and
//! accept types, and a JSON body whose prompt field is filled in per turn by
//! the model family adapter.

use crate::error::{ParleyError, Result};
use serde_json::Value;

/// Request template for one generation model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTemplate {
    /// Model identifier; the part before the first `.` names the provider.
    pub model_id: &'static str,
    pub content_type: &'static str,
    pub accept: &'static str,
    /// JSON body with an empty prompt field.
    pub body: &'static str,
}

impl ModelTemplate {
    /// Parses the template body.
    pub fn body_json(&self) -> Result<Value> {
        serde_json::from_str(self.body).map_err(|e| ParleyError::ConfigParse {
            message: format!("template body for {}: {e}", self.model_id),
        })
    }
}

const TITAN_BODY: &str = r#"{
    "inputText": "",
    "textGenerationConfig": {
        "maxTokenCount": 4096,
        "stopSequences": [],
        "temperature": 0,
        "topP": 1
    }
}"#;

const CLAUDE_BODY: &str = r#"{
    "prompt": "",
    "max_tokens_to_sample": 300,
    "temperature": 0.5,
    "top_k": 250,
    "top_p": 1,
    "stop_sequences": ["\n\nHuman:"],
    "anthropic_version": "bedrock-2023-05-31"
}"#;

const LLAMA_BODY: &str = r#"{
    "prompt": "",
    "max_gen_len": 512,
    "temperature": 0.2,
    "top_p": 0.9
}"#;

const COMMAND_BODY: &str = r#"{
    "prompt": "",
    "max_tokens": 1024,
    "temperature": 0.8
}"#;

const JSON: &str = "application/json";
const ANY: &str = "*/*";

/// All registered models.
pub const MODELS: &[ModelTemplate] = &[
    ModelTemplate {
        model_id: "amazon.titan-text-express-v1",
        content_type: JSON,
        accept: ANY,
        body: TITAN_BODY,
    },
    ModelTemplate {
        model_id: "amazon.titan-text-lite-v1",
        content_type: JSON,
        accept: ANY,
        body: TITAN_BODY,
    },
    ModelTemplate {
        model_id: "anthropic.claude-v2:1",
        content_type: JSON,
        accept: ANY,
        body: CLAUDE_BODY,
    },
    ModelTemplate {
        model_id: "anthropic.claude-v2",
        content_type: JSON,
        accept: ANY,
        body: CLAUDE_BODY,
    },
    ModelTemplate {
        model_id: "meta.llama2-13b-chat-v1",
        content_type: JSON,
        accept: ANY,
        body: LLAMA_BODY,
    },
    ModelTemplate {
        model_id: "meta.llama2-70b-chat-v1",
        content_type: JSON,
        accept: ANY,
        body: LLAMA_BODY,
    },
    ModelTemplate {
        model_id: "cohere.command-text-v14",
        content_type: JSON,
        accept: ANY,
        body: COMMAND_BODY,
    },
    ModelTemplate {
        model_id: "cohere.command-light-text-v14",
        content_type: JSON,
        accept: ANY,
        body: COMMAND_BODY,
    },
];

/// Find a model template by identifier (case sensitive).
pub fn get_model(model_id: &str) -> Option<&'static ModelTemplate> {
    MODELS.iter().find(|m| m.model_id == model_id)
}

/// Identifiers of all registered models, in catalog order.
pub fn model_ids() -> Vec<&'static str> {
    MODELS.iter().map(|m| m.model_id).collect()
}

/// Resolve a model id or fail with the list of supported ids.
pub fn require_model(model_id: &str) -> Result<&'static ModelTemplate> {
    get_model(model_id).ok_or_else(|| ParleyError::UnknownModel {
        model_id: model_id.to_string(),
        supported: model_ids().join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_eight_models() {
        assert_eq!(MODELS.len(), 8);
        assert_eq!(
            model_ids(),
            vec![
                "amazon.titan-text-express-v1",
                "amazon.titan-text-lite-v1",
                "anthropic.claude-v2:1",
                "anthropic.claude-v2",
                "meta.llama2-13b-chat-v1",
                "meta.llama2-70b-chat-v1",
                "cohere.command-text-v14",
                "cohere.command-light-text-v14",
            ]
        );
    }

    #[test]
    fn test_get_model_exists() {
        let model = get_model("meta.llama2-70b-chat-v1").unwrap();
        assert_eq!(model.content_type, "application/json");
        assert_eq!(model.accept, "*/*");
    }

    #[test]
    fn test_get_model_case_sensitive() {
        assert!(get_model("amazon.titan-text-lite-v1").is_some());
        assert!(get_model("Amazon.Titan-Text-Lite-V1").is_none());
    }

    #[test]
    fn test_require_model_lists_supported_ids() {
        match require_model("openai.gpt-4") {
            Err(ParleyError::UnknownModel {
                model_id,
                supported,
            }) => {
                assert_eq!(model_id, "openai.gpt-4");
                assert!(supported.contains("cohere.command-text-v14"));
            }
            other => panic!("Expected UnknownModel, got {other:?}"),
        }
    }

    #[test]
    fn test_all_template_bodies_parse() {
        for model in MODELS {
            let body = model.body_json().unwrap();
            assert!(body.is_object(), "{} body is not an object", model.model_id);
        }
    }

    #[test]
    fn test_template_parameters() {
        let titan = get_model("amazon.titan-text-express-v1")
            .unwrap()
            .body_json()
            .unwrap();
        assert_eq!(titan["textGenerationConfig"]["maxTokenCount"], 4096);

        let claude = get_model("anthropic.claude-v2").unwrap().body_json().unwrap();
        assert_eq!(claude["max_tokens_to_sample"], 300);
        assert_eq!(claude["stop_sequences"][0], "\n\nHuman:");
        assert_eq!(claude["anthropic_version"], "bedrock-2023-05-31");

        let llama = get_model("meta.llama2-13b-chat-v1")
            .unwrap()
            .body_json()
            .unwrap();
        assert_eq!(llama["max_gen_len"], 512);

        let command = get_model("cohere.command-light-text-v14")
            .unwrap()
            .body_json()
            .unwrap();
        assert_eq!(command["max_tokens"], 1024);
    }

    #[test]
    fn test_model_ids_are_unique() {
        let mut ids = model_ids();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
