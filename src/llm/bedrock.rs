//! Amazon Bedrock streaming generator.

use crate::error::{ParleyError, Result};
use crate::llm::family::ModelRequest;
use crate::llm::generator::{RawChunkStream, TextGenerator};
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::primitives::event_stream::EventReceiver;
use aws_sdk_bedrockruntime::types::ResponseStream;
use aws_sdk_bedrockruntime::types::error::ResponseStreamError;
use tokio::runtime::Handle;

pub struct BedrockGenerator {
    client: Client,
    handle: Handle,
}

impl BedrockGenerator {
    pub fn new(handle: Handle, sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            handle,
        }
    }
}

impl TextGenerator for BedrockGenerator {
    fn invoke_stream(&self, request: &ModelRequest) -> Result<RawChunkStream<'_>> {
        let body = request.body_bytes()?;
        let output = self
            .handle
            .block_on(
                self.client
                    .invoke_model_with_response_stream()
                    .model_id(&request.model_id)
                    .content_type(&request.content_type)
                    .accept(&request.accept)
                    .body(Blob::new(body))
                    .send(),
            )
            .map_err(|e| ParleyError::Generation {
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(Box::new(BedrockChunks {
            handle: &self.handle,
            receiver: output.body,
            done: false,
        }))
    }
}

/// Blocking iterator over the payload parts of one response stream.
struct BedrockChunks<'a> {
    handle: &'a Handle,
    receiver: EventReceiver<ResponseStream, ResponseStreamError>,
    done: bool,
}

impl Iterator for BedrockChunks<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.handle.block_on(self.receiver.recv()) {
                Ok(Some(ResponseStream::Chunk(part))) => {
                    if let Some(bytes) = part.bytes() {
                        return Some(Ok(bytes.as_ref().to_vec()));
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(ParleyError::Generation {
                        message: DisplayErrorContext(&e).to_string(),
                    }));
                }
            }
        }
        None
    }
}
