//! Bedrock Runtime embedding client.

use std::sync::Arc;

use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use tokio::runtime::Runtime;

use super::{parse_embedding_response, Embedder, EmbeddingError, EmbeddingInput};

const CONTENT_TYPE: &str = "application/json";

/// Invokes a Bedrock embedding model, one request per input.
pub struct BedrockEmbedder {
    client: Client,
    model_id: String,
    runtime: Arc<Runtime>,
}

impl BedrockEmbedder {
    pub fn new(runtime: Arc<Runtime>, region: &str, model_id: &str) -> Self {
        let sdk_config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region.to_string()))
                .load(),
        );

        Self {
            client: Client::new(&sdk_config),
            model_id: model_id.to_string(),
            runtime,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl Embedder for BedrockEmbedder {
    fn embed(&self, input: EmbeddingInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        let body = serde_json::to_vec(&input.request_body())?;

        log::debug!(
            "invoking {} (input={}, bytes={})",
            self.model_id,
            input.kind(),
            body.len()
        );

        let request = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type(CONTENT_TYPE)
            .accept(CONTENT_TYPE)
            .body(Blob::new(body))
            .send();

        let output = self
            .runtime
            .block_on(request)
            .map_err(|e| EmbeddingError::InvokeFailed(DisplayErrorContext(e).to_string()))?;

        parse_embedding_response(output.body().as_ref())
    }
}
