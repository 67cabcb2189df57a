use crate::errors::{PipelineError, PipelineResult};

/// `amazon.titan-embed-image-v1` is not offered in every region, so the
/// embedding and vector services get separate regions.
const DEFAULT_BEDROCK_REGION: &str = "us-east-1";
/// Multimodal model: embeds both images and text into the same space
const DEFAULT_BEDROCK_EMBED_MODEL: &str = "amazon.titan-embed-image-v1";
const DEFAULT_S3_VECTORS_REGION: &str = "ap-northeast-1";

pub const ENV_BEDROCK_REGION: &str = "BEDROCK_REGION";
pub const ENV_BEDROCK_EMBED_MODEL: &str = "BEDROCK_EMBED_MODEL";
pub const ENV_S3_VECTORS_REGION: &str = "S3_VECTORS_REGION";
pub const ENV_VECTOR_BUCKET_NAME: &str = "VECTOR_BUCKET_NAME";
pub const ENV_VECTOR_INDEX_NAME: &str = "VECTOR_INDEX_NAME";

/// Service settings. Sourced from the environment only.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bedrock_region: String,
    pub bedrock_embed_model: String,
    pub s3_vectors_region: String,
    pub vector_bucket_name: Option<String>,
    pub vector_index_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bedrock_region: DEFAULT_BEDROCK_REGION.to_string(),
            bedrock_embed_model: DEFAULT_BEDROCK_EMBED_MODEL.to_string(),
            s3_vectors_region: DEFAULT_S3_VECTORS_REGION.to_string(),
            vector_bucket_name: None,
            vector_index_name: None,
        }
    }
}

/// Bucket and index a similarity query runs against.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorTarget {
    pub bucket: String,
    pub index: String,
}

impl Config {
    /// Load from the process environment, after merging a `.env` file from the
    /// working directory if one exists.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("ignoring .env: {e}"),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            bedrock_region: get(ENV_BEDROCK_REGION).unwrap_or(defaults.bedrock_region),
            bedrock_embed_model: get(ENV_BEDROCK_EMBED_MODEL)
                .unwrap_or(defaults.bedrock_embed_model),
            s3_vectors_region: get(ENV_S3_VECTORS_REGION).unwrap_or(defaults.s3_vectors_region),
            vector_bucket_name: get(ENV_VECTOR_BUCKET_NAME),
            vector_index_name: get(ENV_VECTOR_INDEX_NAME),
        }
    }

    /// Both identifiers are required before any query can be issued.
    pub fn vector_target(&self) -> PipelineResult<VectorTarget> {
        match (&self.vector_bucket_name, &self.vector_index_name) {
            (Some(bucket), Some(index)) => Ok(VectorTarget {
                bucket: bucket.clone(),
                index: index.clone(),
            }),
            (bucket, index) => {
                let mut missing = Vec::new();
                if bucket.is_none() {
                    missing.push(ENV_VECTOR_BUCKET_NAME);
                }
                if index.is_none() {
                    missing.push(ENV_VECTOR_INDEX_NAME);
                }
                Err(PipelineError::MissingConfiguration(missing))
            }
        }
    }
}
