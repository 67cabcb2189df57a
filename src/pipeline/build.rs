use crate::errors::{PipelineError, PipelineResult};
use crate::records::{embedding_key, vectors_file_name, StoredEmbedding, RECORD_EXTENSION};
use crate::staging::StagingDir;

/// Reshape every embedding record in `source` into an ingestion record in
/// `dest`. No network access. Returns the number of records written.
pub fn build_vector_records(source: &StagingDir, dest: &StagingDir) -> PipelineResult<usize> {
    source.require()?;
    dest.ensure()?;

    let records = source.list(RECORD_EXTENSION)?;
    if records.is_empty() {
        return Err(PipelineError::NoInputFiles {
            kind: "json",
            dir: source.base_dir.clone(),
        });
    }

    for file_name in &records {
        let raw = source.read(file_name)?;
        let stored = StoredEmbedding::parse(&raw, file_name)?;
        let dim = stored.embedding.len();

        let key = embedding_key(file_name);
        let out_path = dest.write_json(&vectors_file_name(&key), &stored.into_ingestion(key.clone()))?;

        log::info!(
            "saved S3 Vectors input: {} (key={key}, dim={dim})",
            out_path.display()
        );
    }

    log::info!("Done.");
    Ok(records.len())
}
