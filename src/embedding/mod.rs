//! Embedding generation through an external multimodal model.
//!
//! - `Embedder`: the seam every stage depends on
//! - `bedrock`: the Bedrock Runtime implementation
//!
//! Request bodies and response parsing live here so that any transport
//! shares the same wire format and validation.

pub mod bedrock;

use base64::Engine;
use serde_json::{json, Value};

pub use bedrock::BedrockEmbedder;

/// Maximum number of characters of a raw response kept in error messages.
const RESPONSE_SNIPPET_LIMIT: usize = 300;

/// Field of the model response holding the vector.
const EMBEDDING_FIELD: &str = "embedding";

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Unexpected embedding response: {snippet}")]
    UnexpectedResponseFormat { snippet: String },

    #[error("Embedding response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Model invocation failed: {0}")]
    InvokeFailed(String),
}

/// What gets embedded. The model accepts either modality.
#[derive(Debug, Clone, Copy)]
pub enum EmbeddingInput<'a> {
    Image(&'a [u8]),
    Text(&'a str),
}

impl EmbeddingInput<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            EmbeddingInput::Image(_) => "image",
            EmbeddingInput::Text(_) => "text",
        }
    }

    /// JSON body understood by the embedding model.
    pub fn request_body(&self) -> Value {
        match self {
            EmbeddingInput::Image(bytes) => json!({
                "inputImage": base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
            EmbeddingInput::Text(text) => json!({ "inputText": text }),
        }
    }
}

/// Turns inputs into vectors. Implementations must return a non-empty vector
/// or an error; no retries are expected.
pub trait Embedder {
    fn embed(&self, input: EmbeddingInput<'_>) -> Result<Vec<f32>, EmbeddingError>;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn embed(&self, input: EmbeddingInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(input)
    }
}

/// Extract the vector from a raw model response.
///
/// The response is treated as an open mapping: the `embedding` field must be
/// present and hold a non-empty array of numbers, anything else is reported
/// with a truncated copy of the response.
pub fn parse_embedding_response(raw: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
    let value: Value = serde_json::from_slice(raw)?;

    value
        .get(EMBEDDING_FIELD)
        .and_then(as_vector)
        .ok_or_else(|| EmbeddingError::UnexpectedResponseFormat {
            snippet: snippet(&value.to_string()),
        })
}

/// Interpret a JSON value as a vector: a non-empty array of numbers that fit
/// in an `f32`.
pub fn as_vector(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }

    items
        .iter()
        .map(|item| {
            item.as_f64()
                .map(|n| n as f32)
                .filter(|f| f.is_finite())
        })
        .collect()
}

fn snippet(raw: &str) -> String {
    raw.chars().take(RESPONSE_SNIPPET_LIMIT).collect()
}
