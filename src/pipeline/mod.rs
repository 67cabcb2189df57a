//! The three batch stages.
//!
//! - `generate`: images -> embedding records
//! - `build`: embedding records -> vector store ingestion records
//! - `query`: query string -> ranked matches
//!
//! Stages run sequentially, one item at a time, and stop at the first error.
//! Output already written by a failed run stays on disk; re-running overwrites it.

pub mod build;
pub mod generate;
pub mod query;

pub use build::build_vector_records;
pub use generate::generate_embeddings;
pub use query::{render_results, run_query, DEFAULT_TOP_K};
