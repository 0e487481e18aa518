//! Provider family adapters.
//!
//! Providers disagree on where the prompt goes in the request body and where
//! the generated text sits in each streamed chunk. Each family knows both.

use crate::error::{ParleyError, Result};
use crate::llm::catalog::{ModelTemplate, require_model};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Model provider family, taken from the model id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Amazon,
    Meta,
    Anthropic,
    Cohere,
}

impl ModelFamily {
    /// Family of a model id such as `meta.llama2-13b-chat-v1`.
    pub fn from_model_id(model_id: &str) -> Result<Self> {
        let provider = model_id.split('.').next().unwrap_or_default();
        provider.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Amazon => "amazon",
            ModelFamily::Meta => "meta",
            ModelFamily::Anthropic => "anthropic",
            ModelFamily::Cohere => "cohere",
        }
    }

    /// Fills the prompt field of a template body with the user's text.
    pub fn build_body(&self, template: &Value, text: &str) -> Value {
        let mut body = template.clone();
        let (field, prompt) = match self {
            ModelFamily::Amazon => ("inputText", text.to_string()),
            ModelFamily::Meta | ModelFamily::Cohere => ("prompt", text.to_string()),
            ModelFamily::Anthropic => ("prompt", format!("\n\nHuman: {text}\n\nAssistant:")),
        };
        if let Value::Object(map) = &mut body {
            map.insert(field.to_string(), Value::String(prompt));
        }
        body
    }

    /// Decodes one raw stream chunk into its generated text.
    pub fn extract_delta(&self, raw: &[u8]) -> Result<String> {
        let chunk: Value = serde_json::from_slice(raw)?;
        match self {
            ModelFamily::Amazon => text_field(&chunk, "outputText"),
            ModelFamily::Meta => text_field(&chunk, "generation"),
            ModelFamily::Anthropic => text_field(&chunk, "completion"),
            ModelFamily::Cohere => {
                let generations = chunk
                    .get("generations")
                    .and_then(Value::as_array)
                    .ok_or_else(|| missing("generations"))?;
                let texts = generations
                    .iter()
                    .map(|g| g.get("text").and_then(Value::as_str).unwrap_or_default())
                    .collect::<Vec<_>>();
                Ok(texts.join(" "))
            }
        }
    }
}

fn text_field(chunk: &Value, field: &str) -> Result<String> {
    match chunk.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) => Ok(String::new()),
        _ => Err(missing(field)),
    }
}

fn missing(field: &str) -> ParleyError {
    ParleyError::DeltaMissingField {
        field: field.to_string(),
    }
}

impl FromStr for ModelFamily {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amazon" => Ok(ModelFamily::Amazon),
            "meta" => Ok(ModelFamily::Meta),
            "anthropic" => Ok(ModelFamily::Anthropic),
            "cohere" => Ok(ModelFamily::Cohere),
            other => Err(ParleyError::UnknownProvider {
                provider: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ready-to-send generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model_id: String,
    pub content_type: String,
    pub accept: String,
    pub body: Value,
}

impl ModelRequest {
    /// Serialized request body.
    pub fn body_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.body)?)
    }
}

/// Request builder and chunk decoder for one configured model.
#[derive(Debug, Clone)]
pub struct ModelAdapter {
    template: &'static ModelTemplate,
    family: ModelFamily,
}

impl ModelAdapter {
    /// Adapter for a catalog model; fails for unknown ids or providers.
    pub fn for_model(model_id: &str) -> Result<Self> {
        let template = require_model(model_id)?;
        let family = ModelFamily::from_model_id(template.model_id)?;
        Ok(Self { template, family })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn model_id(&self) -> &'static str {
        self.template.model_id
    }

    /// Builds the request for one user turn.
    pub fn build_request(&self, text: &str) -> Result<ModelRequest> {
        let template = self.template.body_json()?;
        Ok(ModelRequest {
            model_id: self.template.model_id.to_string(),
            content_type: self.template.content_type.to_string(),
            accept: self.template.accept.to_string(),
            body: self.family.build_body(&template, text),
        })
    }

    /// Decodes one raw stream chunk.
    pub fn extract_delta(&self, raw: &[u8]) -> Result<String> {
        self.family.extract_delta(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_family_from_model_id() {
        assert_eq!(
            ModelFamily::from_model_id("amazon.titan-text-lite-v1").unwrap(),
            ModelFamily::Amazon
        );
        assert_eq!(
            ModelFamily::from_model_id("meta.llama2-70b-chat-v1").unwrap(),
            ModelFamily::Meta
        );
        assert_eq!(
            ModelFamily::from_model_id("anthropic.claude-v2:1").unwrap(),
            ModelFamily::Anthropic
        );
        assert_eq!(
            ModelFamily::from_model_id("cohere.command-text-v14").unwrap(),
            ModelFamily::Cohere
        );
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        match ModelFamily::from_model_id("mistral.mistral-7b") {
            Err(ParleyError::UnknownProvider { provider }) => assert_eq!(provider, "mistral"),
            other => panic!("Expected UnknownProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_build_body_amazon_sets_input_text() {
        let body = ModelFamily::Amazon.build_body(&json!({"inputText": ""}), "hi there");
        assert_eq!(body["inputText"], "hi there");
    }

    #[test]
    fn test_build_body_meta_and_cohere_set_prompt() {
        let template = json!({"prompt": "", "temperature": 0.2});
        let meta = ModelFamily::Meta.build_body(&template, "question");
        assert_eq!(meta["prompt"], "question");
        assert_eq!(meta["temperature"], 0.2);

        let cohere = ModelFamily::Cohere.build_body(&template, "question");
        assert_eq!(cohere["prompt"], "question");
    }

    #[test]
    fn test_build_body_anthropic_wraps_prompt() {
        let body = ModelFamily::Anthropic.build_body(&json!({"prompt": ""}), "hello");
        assert_eq!(body["prompt"], "\n\nHuman: hello\n\nAssistant:");
    }

    #[test]
    fn test_build_body_does_not_touch_template() {
        let template = json!({"prompt": ""});
        let _ = ModelFamily::Meta.build_body(&template, "changed");
        assert_eq!(template["prompt"], "");
    }

    #[test]
    fn test_extract_delta_per_family() {
        assert_eq!(
            ModelFamily::Amazon
                .extract_delta(br#"{"outputText": "Hi.", "index": 0}"#)
                .unwrap(),
            "Hi."
        );
        assert_eq!(
            ModelFamily::Meta
                .extract_delta(br#"{"generation": " there"}"#)
                .unwrap(),
            " there"
        );
        assert_eq!(
            ModelFamily::Anthropic
                .extract_delta(br#"{"completion": " Sure", "stop_reason": null}"#)
                .unwrap(),
            " Sure"
        );
        assert_eq!(
            ModelFamily::Cohere
                .extract_delta(br#"{"generations": [{"text": "one"}, {"text": "two"}]}"#)
                .unwrap(),
            "one two"
        );
    }

    #[test]
    fn test_extract_delta_null_text_is_empty() {
        assert_eq!(
            ModelFamily::Meta
                .extract_delta(br#"{"generation": null}"#)
                .unwrap(),
            ""
        );
    }

    #[test]
    fn test_extract_delta_missing_field() {
        match ModelFamily::Amazon.extract_delta(br#"{"generation": "x"}"#) {
            Err(ParleyError::DeltaMissingField { field }) => assert_eq!(field, "outputText"),
            other => panic!("Expected DeltaMissingField, got {other:?}"),
        }
        assert!(matches!(
            ModelFamily::Cohere.extract_delta(br#"{"text": "x"}"#),
            Err(ParleyError::DeltaMissingField { .. })
        ));
    }

    #[test]
    fn test_extract_delta_rejects_invalid_json() {
        assert!(matches!(
            ModelFamily::Anthropic.extract_delta(b"not json"),
            Err(ParleyError::DeltaDecode(_))
        ));
    }

    #[test]
    fn test_adapter_builds_request_from_catalog() {
        let adapter = ModelAdapter::for_model("anthropic.claude-v2").unwrap();
        assert_eq!(adapter.family(), ModelFamily::Anthropic);

        let request = adapter.build_request("What is Rust?").unwrap();
        assert_eq!(request.model_id, "anthropic.claude-v2");
        assert_eq!(request.content_type, "application/json");
        assert_eq!(request.accept, "*/*");
        assert_eq!(
            request.body["prompt"],
            "\n\nHuman: What is Rust?\n\nAssistant:"
        );
        assert_eq!(request.body["max_tokens_to_sample"], 300);

        let bytes = request.body_bytes().unwrap();
        let round: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(round, request.body);
    }

    #[test]
    fn test_adapter_rejects_unknown_model() {
        assert!(matches!(
            ModelAdapter::for_model("amazon.titan-unknown"),
            Err(ParleyError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_every_catalog_model_has_an_adapter() {
        for id in crate::llm::catalog::model_ids() {
            let adapter = ModelAdapter::for_model(id).unwrap();
            assert_eq!(adapter.model_id(), id);
            assert!(adapter.build_request("x").is_ok());
        }
    }

    #[test]
    fn test_family_display_roundtrip() {
        for family in [
            ModelFamily::Amazon,
            ModelFamily::Meta,
            ModelFamily::Anthropic,
            ModelFamily::Cohere,
        ] {
            assert_eq!(family.to_string().parse::<ModelFamily>().unwrap(), family);
        }
    }
}
