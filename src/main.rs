use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod embedding;
mod errors;
mod pipeline;
mod records;
mod staging;
#[cfg(test)]
mod tests;
mod vector_store;

use cli::{Command, DirArgs};
use config::Config;
use embedding::BedrockEmbedder;
use staging::StagingDir;
use vector_store::S3VectorsStore;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_runtime() -> std::io::Result<Arc<tokio::runtime::Runtime>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(Arc::new(runtime))
}

fn main() {
    let args = cli::Args::parse();
    init_logging();

    if let Err(err) = run(args) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: cli::Args) -> anyhow::Result<()> {
    let config = Config::load();
    log::debug!("{config:?}");

    let DirArgs {
        images_dir,
        embed_dir,
        vectors_dir,
    } = args.dirs;
    let images = StagingDir::new(images_dir);
    let embeds = StagingDir::new(embed_dir);
    let vectors = StagingDir::new(vectors_dir);

    match args.command {
        Command::Embed {} => {
            embed(&config, &images, &embeds)?;
        }
        Command::Vectors {} => {
            let _span = tracing::info_span!("vectors").entered();
            pipeline::build_vector_records(&embeds, &vectors)?;
        }
        Command::Run {} => {
            embed(&config, &images, &embeds)?;
            let _span = tracing::info_span!("vectors").entered();
            pipeline::build_vector_records(&embeds, &vectors)?;
        }
        Command::Query { query, kind, top_k } => {
            let _span = tracing::info_span!("query").entered();

            let matches = pipeline::run_query(&config, &query, kind.as_deref(), top_k, embeds, || {
                let runtime = build_runtime()?;
                let embedder = BedrockEmbedder::new(
                    runtime.clone(),
                    &config.bedrock_region,
                    &config.bedrock_embed_model,
                );
                let store = S3VectorsStore::new(runtime, &config.s3_vectors_region);
                Ok((embedder, store))
            })?;

            println!("Search results:");
            for line in pipeline::render_results(&matches) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn embed(config: &Config, images: &StagingDir, embeds: &StagingDir) -> anyhow::Result<()> {
    let _span = tracing::info_span!("embed").entered();

    // fail on a missing source before building any client
    images.require()?;

    let runtime = build_runtime()?;
    let embedder = BedrockEmbedder::new(runtime, &config.bedrock_region, &config.bedrock_embed_model);
    log::info!(
        "embedding images from {} with {}",
        images.base_dir.display(),
        embedder.model_id()
    );

    let count = pipeline::generate_embeddings(&embedder, images, embeds)?;
    log::info!("{count} embeddings written to {}", embeds.base_dir.display());
    Ok(())
}
