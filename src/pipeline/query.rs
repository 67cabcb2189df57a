use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{Config, VectorTarget};
use crate::embedding::{Embedder, EmbeddingInput};
use crate::errors::{PipelineError, PipelineResult};
use crate::records::StoredEmbedding;
use crate::staging::StagingDir;
use crate::vector_store::{QueryMatch, VectorQuery, VectorStore};

pub const DEFAULT_TOP_K: u32 = 5;

/// Shape of an embedding record file name: `image_NN-<anything>.json`
static EMBEDDING_FILE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^image_[0-9]{2}-.*\.json$").expect("Failed to compile embedding file regex")
});

/// The variant names accepted for an explicit query type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Image,
    Text,
}

impl FromStr for QueryType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(QueryType::Image),
            "text" => Ok(QueryType::Text),
            _ => Err(PipelineError::UnknownQueryType(s.to_string())),
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::Image => write!(f, "image"),
            QueryType::Text => write!(f, "text"),
        }
    }
}

/// A classified query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Names a persisted embedding record whose vector is reused as-is.
    Image { file_name: String },
    /// Free text, embedded on demand.
    Text(String),
}

impl QueryKind {
    /// Build a query of an explicitly chosen type.
    pub fn with_type(query: &str, query_type: QueryType) -> PipelineResult<Self> {
        let query = non_empty(query)?;

        Ok(match query_type {
            QueryType::Image => QueryKind::Image {
                file_name: query.to_string(),
            },
            QueryType::Text => QueryKind::Text(query.to_string()),
        })
    }

    pub fn query_type(&self) -> QueryType {
        match self {
            QueryKind::Image { .. } => QueryType::Image,
            QueryKind::Text(_) => QueryType::Text,
        }
    }
}

/// Structural classification: anything shaped like an embedding record file
/// name is an image query, everything else is text.
pub fn classify_query(query: &str) -> PipelineResult<QueryKind> {
    let query = non_empty(query)?;

    let query_type = if EMBEDDING_FILE_REGEX.is_match(query) {
        QueryType::Image
    } else {
        QueryType::Text
    };

    QueryKind::with_type(query, query_type)
}

fn non_empty(query: &str) -> PipelineResult<&str> {
    if query.trim().is_empty() {
        return Err(PipelineError::InvalidQuery(
            "query must be a non-empty string".to_string(),
        ));
    }
    Ok(query)
}

/// Resolves queries to vectors and runs them against the vector store.
pub struct QueryEngine<E, S> {
    embedder: E,
    store: S,
    embed_dir: StagingDir,
    target: VectorTarget,
    top_k: u32,
}

impl<E: Embedder, S: VectorStore> QueryEngine<E, S> {
    pub fn new(embedder: E, store: S, embed_dir: StagingDir, target: VectorTarget) -> Self {
        Self {
            embedder,
            store,
            embed_dir,
            target,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: u32) -> PipelineResult<Self> {
        self.top_k = check_top_k(top_k)?;
        Ok(self)
    }

    /// Vector for a query: the stored embedding for image queries, a fresh
    /// embedding for text.
    pub fn query_vector(&self, query: &QueryKind) -> PipelineResult<Vec<f32>> {
        match query {
            QueryKind::Image { file_name } => self.stored_vector(file_name),
            QueryKind::Text(text) => Ok(self.embedder.embed(EmbeddingInput::Text(text))?),
        }
    }

    fn stored_vector(&self, file_name: &str) -> PipelineResult<Vec<f32>> {
        // must stay inside the staging directory
        if file_name.contains(['/', '\\']) || file_name == ".." {
            return Err(PipelineError::InvalidQuery(format!(
                "not a plain file name: {file_name}"
            )));
        }

        if !self.embed_dir.exists(file_name) {
            return Err(PipelineError::EmbeddingNotFound(self.embed_dir.path(file_name)));
        }

        let raw = self.embed_dir.read(file_name)?;
        Ok(StoredEmbedding::parse(&raw, file_name)?.embedding)
    }

    /// Run one top-K similarity query. Matches keep the store's order.
    pub fn search(&self, query: &QueryKind) -> PipelineResult<Vec<QueryMatch>> {
        let vector = self.query_vector(query)?;

        log::info!(
            "query embedding created (type={}, dim={})",
            query.query_type(),
            vector.len()
        );

        let request = VectorQuery {
            bucket: &self.target.bucket,
            index: &self.target.index,
            top_k: self.top_k,
            vector: &vector,
        };

        Ok(self.store.query(&request)?)
    }
}

fn check_top_k(top_k: u32) -> PipelineResult<u32> {
    if top_k == 0 {
        return Err(PipelineError::InvalidQuery(
            "top-k must be at least 1".to_string(),
        ));
    }
    Ok(top_k)
}

/// Validate settings and the query, then connect and search.
///
/// `connect` builds the service clients and is only called once everything
/// local checks out, so a misconfigured run never reaches the network.
pub fn run_query<E, S, F>(
    config: &Config,
    query: &str,
    kind: Option<&str>,
    top_k: u32,
    embed_dir: StagingDir,
    connect: F,
) -> PipelineResult<Vec<QueryMatch>>
where
    E: Embedder,
    S: VectorStore,
    F: FnOnce() -> PipelineResult<(E, S)>,
{
    let target = config.vector_target()?;
    let query = match kind {
        Some(kind) => QueryKind::with_type(query, kind.parse::<QueryType>()?)?,
        None => classify_query(query)?,
    };
    let top_k = check_top_k(top_k)?;

    let (embedder, store) = connect()?;
    QueryEngine::new(embedder, store, embed_dir, target)
        .with_top_k(top_k)?
        .search(&query)
}

/// One line per match, in rank order.
pub fn render_results(matches: &[QueryMatch]) -> Vec<String> {
    matches
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let distance = item
                .distance
                .map(|d| format!("{d:.4}"))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}. key={}, distance={distance}, fileName={}",
                i + 1,
                item.key,
                item.file_name.as_deref().unwrap_or("-")
            )
        })
        .collect()
}
