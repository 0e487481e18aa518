use crate::error::{ParleyError, Result};
use crate::llm::family::{ModelFamily, ModelRequest};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Raw chunk payloads of one streaming generation call, in arrival order.
pub type RawChunkStream<'a> = Box<dyn Iterator<Item = Result<Vec<u8>>> + Send + 'a>;

/// Trait for streaming text generation.
///
/// Implementations return the provider's raw chunk bytes; decoding them into
/// text is the job of the model family adapter.
pub trait TextGenerator: Send + Sync {
    /// Open a streaming call for the request.
    fn invoke_stream(&self, request: &ModelRequest) -> Result<RawChunkStream<'_>>;
}

impl<T: TextGenerator> TextGenerator for Arc<T> {
    fn invoke_stream(&self, request: &ModelRequest) -> Result<RawChunkStream<'_>> {
        (**self).invoke_stream(request)
    }
}

/// Encode `text` the way `family` streams it.
pub fn encode_delta(family: ModelFamily, text: &str) -> Vec<u8> {
    let chunk = match family {
        ModelFamily::Amazon => json!({ "outputText": text }),
        ModelFamily::Meta => json!({ "generation": text }),
        ModelFamily::Anthropic => json!({ "completion": text }),
        ModelFamily::Cohere => json!({ "generations": [{ "text": text }] }),
    };
    chunk.to_string().into_bytes()
}

/// Generator that replays scripted chunks, for tests and dry runs.
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    chunks: Vec<Vec<u8>>,
    chunk_delay: Duration,
    fail_open: bool,
    fail_after: Option<usize>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedGenerator {
    /// Stream the given deltas encoded for `family`.
    pub fn with_deltas(family: ModelFamily, deltas: &[&str]) -> Self {
        Self::with_raw_chunks(deltas.iter().map(|d| encode_delta(family, d)).collect())
    }

    /// Stream the given raw payloads unchanged.
    pub fn with_raw_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            chunk_delay: Duration::ZERO,
            fail_open: false,
            fail_after: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep before yielding each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Configure the mock to fail when the stream is opened.
    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Configure the stream to fail after yielding `count` chunks.
    pub fn with_failure_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<ModelRequest>>> {
        self.requests.clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn invoke_stream(&self, request: &ModelRequest) -> Result<RawChunkStream<'_>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.fail_open {
            return Err(ParleyError::Generation {
                message: "mock generation failure".to_string(),
            });
        }

        let delay = self.chunk_delay;
        let fail_after = self.fail_after;
        let stream = self
            .chunks
            .iter()
            .cloned()
            .enumerate()
            .map(move |(index, chunk)| {
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                if fail_after.is_some_and(|limit| index >= limit) {
                    return Err(ParleyError::Generation {
                        message: "mock stream interrupted".to_string(),
                    });
                }
                Ok(chunk)
            });
        Ok(Box::new(stream))
    }
}
