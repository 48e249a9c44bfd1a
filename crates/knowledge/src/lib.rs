//! Placement corpus knowledge system.
//!
//! Loads the placement documents, chunks and embeds them into a persisted
//! SQLite index, and answers questions over it with multi-query retrieval
//! and a grounded, safety-filtered prompt.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use placement_core::AppConfig;
//! use placement_knowledge::embeddings::{create_provider, EmbeddingConfig};
//! use placement_knowledge::{initialize, IngestOptions, RagPipeline};
//!
//! # async fn example() -> placement_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let embedder = create_provider(&EmbeddingConfig::from_app_config(&config))?;
//! let (index, _stats) = initialize(&IngestOptions::from_config(&config), embedder.clone()).await?;
//!
//! let client = placement_llm::create_client(
//!     &config.provider,
//!     None,
//!     config.resolve_api_key(&config.provider).as_deref(),
//!     Some(config.rag.request_timeout()),
//! )?;
//! let pipeline = RagPipeline::from_config(&config, index, embedder, client)?;
//! let result = pipeline.ask("What CGPA is required for placements?").await?;
//! println!("{}", result.answer());
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod rag;
pub mod resume;
pub mod retry;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use ingest::{initialize, IngestOptions, ReadyIndex};
pub use rag::{AnswerOutcome, AnswerResult, ChatReply, RagPipeline, RetrievalParams, SourceRef};
pub use resume::{DetailedMatch, QuickMatch, ResumeMatcher};
pub use retry::RetryPolicy;
pub use types::{Chunk, Document, IndexEntry, IndexStats, IngestStats, RetrievedChunk, RetrievedSet};
pub use vector_index::{MemoryIndex, MetadataFilter, VectorIndex};

use placement_core::{AppError, AppResult};
use std::path::Path;

/// Statistics of the persisted index without loading it.
pub fn index_stats(index_path: &Path) -> AppResult<IndexStats> {
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "No index at {:?}. Run 'placement ingest' first.",
            index_path
        )));
    }

    let conn = index::open_store(index_path)?;
    index::get_stats(&conn, index_path)
}
