use std::path::PathBuf;

use crate::embedding::EmbeddingError;
use crate::vector_store::VectorStoreError;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No {kind} files found in directory: {}", .dir.display())]
    NoInputFiles { kind: &'static str, dir: PathBuf },

    #[error("Invalid embedding in file: {file}")]
    InvalidEmbedding { file: String },

    #[error("Required environment variables are not set ({})", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding JSON not found: {}", .0.display())]
    EmbeddingNotFound(PathBuf),

    #[error("Unknown query type: {0}")]
    UnknownQueryType(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("embedding failed for {file}: {source}")]
    EmbedFailed {
        file: String,
        #[source]
        source: EmbeddingError,
    },

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("json error in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

impl PipelineError {
    pub fn json(file: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            file: file.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
