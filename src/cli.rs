use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::pipeline::DEFAULT_TOP_K;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(flatten)]
    pub dirs: DirArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Staging directories, relative to the working directory by default.
#[derive(ClapArgs, Debug, Clone)]
pub struct DirArgs {
    /// Source images (.jpg)
    #[clap(long, global = true, default_value = "images")]
    pub images_dir: PathBuf,

    /// Embedding records (<key>-embed.json)
    #[clap(long, global = true, default_value = "images-embed")]
    pub embed_dir: PathBuf,

    /// Vector store ingestion records (<key>-vectors.json)
    #[clap(long, global = true, default_value = "images-vectors")]
    pub vectors_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an embedding record for every image.
    Embed {},

    /// Convert embedding records into vector store input.
    Vectors {},

    /// Embed, then convert.
    Run {},

    /// Search the vector index.
    ///
    /// A query shaped like an embedding file name (e.g. image_01-embed.json)
    /// reuses that stored embedding; anything else is embedded as text.
    Query {
        /// Embedding file name or free text
        query: String,

        /// Force the query type: "image" or "text"
        #[clap(long)]
        kind: Option<String>,

        /// Number of matches to return
        #[clap(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: u32,
    },
}
