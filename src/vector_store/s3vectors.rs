//! Amazon S3 Vectors query client.

use std::sync::Arc;

use aws_sdk_s3vectors::error::DisplayErrorContext;
use aws_sdk_s3vectors::types::VectorData;
use aws_sdk_s3vectors::Client;
use aws_smithy_types::Document;
use tokio::runtime::Runtime;

use super::{QueryMatch, VectorQuery, VectorStore, VectorStoreError};

/// Metadata key written by the ingestion records.
const FILE_NAME_KEY: &str = "fileName";

pub struct S3VectorsStore {
    client: Client,
    runtime: Arc<Runtime>,
}

impl S3VectorsStore {
    pub fn new(runtime: Arc<Runtime>, region: &str) -> Self {
        let sdk_config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region.to_string()))
                .load(),
        );

        Self {
            client: Client::new(&sdk_config),
            runtime,
        }
    }
}

impl VectorStore for S3VectorsStore {
    fn query(&self, request: &VectorQuery<'_>) -> Result<Vec<QueryMatch>, VectorStoreError> {
        let top_k = i32::try_from(request.top_k)
            .map_err(|_| VectorStoreError::QueryFailed(format!("topK out of range: {}", request.top_k)))?;

        let call = self
            .client
            .query_vectors()
            .vector_bucket_name(request.bucket)
            .index_name(request.index)
            .top_k(top_k)
            .query_vector(VectorData::Float32(request.vector.to_vec()))
            .return_distance(true)
            .return_metadata(true)
            .send();

        let output = self
            .runtime
            .block_on(call)
            .map_err(|e| VectorStoreError::QueryFailed(DisplayErrorContext(e).to_string()))?;

        Ok(output
            .vectors()
            .iter()
            .map(|item| QueryMatch {
                key: item.key().to_string(),
                distance: item.distance(),
                file_name: item.metadata().and_then(metadata_file_name),
            })
            .collect())
    }
}

fn metadata_file_name(metadata: &Document) -> Option<String> {
    match metadata {
        Document::Object(fields) => match fields.get(FILE_NAME_KEY) {
            Some(Document::String(name)) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}
