//! Nearest-neighbour lookup against an external vector index.

pub mod s3vectors;

pub use s3vectors::S3VectorsStore;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("Vector query failed: {0}")]
    QueryFailed(String),
}

/// A top-K similarity request.
#[derive(Debug, Clone)]
pub struct VectorQuery<'a> {
    pub bucket: &'a str,
    pub index: &'a str,
    pub top_k: u32,
    pub vector: &'a [f32],
}

/// One ranked match, as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub key: String,
    pub distance: Option<f32>,
    pub file_name: Option<String>,
}

/// Answers similarity queries. Results come back nearest first; callers do not
/// re-rank them.
pub trait VectorStore {
    fn query(&self, request: &VectorQuery<'_>) -> Result<Vec<QueryMatch>, VectorStoreError>;
}

impl<S: VectorStore + ?Sized> VectorStore for &S {
    fn query(&self, request: &VectorQuery<'_>) -> Result<Vec<QueryMatch>, VectorStoreError> {
        (**self).query(request)
    }
}
