use crate::embedding::{Embedder, EmbeddingInput};
use crate::errors::{PipelineError, PipelineResult};
use crate::records::{embedding_file_name, image_key, EmbeddingRecord, IMAGE_EXTENSION};
use crate::staging::StagingDir;

/// Embed every `.jpg` in `source` and write one `<key>-embed.json` per image to
/// `dest`. Returns the number of records written.
pub fn generate_embeddings<E: Embedder>(
    embedder: &E,
    source: &StagingDir,
    dest: &StagingDir,
) -> PipelineResult<usize> {
    source.require()?;
    dest.ensure()?;

    let images = source.list(IMAGE_EXTENSION)?;
    if images.is_empty() {
        return Err(PipelineError::NoInputFiles {
            kind: "image",
            dir: source.base_dir.clone(),
        });
    }

    for file_name in &images {
        let bytes = source.read(file_name)?;
        let embedding = embedder
            .embed(EmbeddingInput::Image(&bytes))
            .map_err(|source| PipelineError::EmbedFailed {
                file: file_name.clone(),
                source,
            })?;
        if embedding.is_empty() {
            return Err(PipelineError::InvalidEmbedding {
                file: file_name.clone(),
            });
        }

        let record = EmbeddingRecord::new(file_name, embedding);
        let key = image_key(file_name);
        dest.write_json(&embedding_file_name(&key), &record)?;

        log::info!("Embedding saved for {key} (dim={})", record.dim);
    }

    Ok(images.len())
}
