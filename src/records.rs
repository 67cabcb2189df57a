//! Records persisted between pipeline stages.
//!
//! File naming is load-bearing: `<key>-embed.json` for embeddings and
//! `<key>-vectors.json` for ingestion records. Later stages recover the key
//! from these names.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::embedding::as_vector;
use crate::errors::{PipelineError, PipelineResult};

pub const IMAGE_EXTENSION: &str = "jpg";
pub const RECORD_EXTENSION: &str = "json";

const EMBED_SUFFIX: &str = "-embed";
const VECTORS_SUFFIX: &str = "-vectors";

/// Stage 1 output: one per image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRecord {
    pub file_name: String,
    pub embedding: Vec<f32>,
    pub dim: usize,
}

impl EmbeddingRecord {
    pub fn new(file_name: &str, embedding: Vec<f32>) -> Self {
        Self {
            file_name: file_name.to_string(),
            dim: embedding.len(),
            embedding,
        }
    }
}

/// Vector payload in the store's typed form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    pub float32: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Stage 2 output: the vector store's bulk-load format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub key: String,
    pub data: VectorPayload,
    pub metadata: RecordMetadata,
}

/// A persisted embedding record read back leniently: only the vector is
/// required.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEmbedding {
    pub file_name: Option<String>,
    pub embedding: Vec<f32>,
}

impl StoredEmbedding {
    /// Validate a raw record. `source` names the file in errors.
    pub fn parse(raw: &[u8], source: &str) -> PipelineResult<Self> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| PipelineError::json(source, e))?;

        let invalid = || PipelineError::InvalidEmbedding {
            file: source.to_string(),
        };

        let embedding = value.get("embedding").and_then(as_vector).ok_or_else(invalid)?;

        // dim is optional, but must agree when present
        if let Some(dim) = value.get("dim") {
            if dim.as_u64() != Some(embedding.len() as u64) {
                return Err(invalid());
            }
        }

        Ok(Self {
            file_name: value
                .get("fileName")
                .and_then(Value::as_str)
                .map(str::to_string),
            embedding,
        })
    }

    pub fn into_ingestion(self, key: String) -> IngestionRecord {
        IngestionRecord {
            key,
            data: VectorPayload {
                float32: self.embedding,
            },
            metadata: RecordMetadata {
                file_name: self.file_name,
            },
        }
    }
}

/// `image_01.jpg` -> `image_01`
pub fn image_key(file_name: &str) -> String {
    file_stem(file_name)
}

/// `image_01-embed.json` -> `image_01`
pub fn embedding_key(file_name: &str) -> String {
    let stem = file_stem(file_name);
    match stem.strip_suffix(EMBED_SUFFIX) {
        Some(key) => key.to_string(),
        None => stem,
    }
}

pub fn embedding_file_name(key: &str) -> String {
    format!("{key}{EMBED_SUFFIX}.{RECORD_EXTENSION}")
}

pub fn vectors_file_name(key: &str) -> String {
    format!("{key}{VECTORS_SUFFIX}.{RECORD_EXTENSION}")
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
