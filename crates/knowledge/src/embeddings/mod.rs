//! Text embedding for chunks and queries.
//!
//! Chunks and query variants must be embedded by the same provider and
//! model; the index records both and refuses to mix them.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crate::types::Chunk;
use placement_core::{AppError, AppResult};

/// Embed chunk texts in groups of `batch_size`, preserving order.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} chunks using provider '{}' (model: {})",
        chunks.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut embeddings = Vec::with_capacity(chunks.len());
    for group in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = group.iter().map(|c| c.text.clone()).collect();
        let vectors = provider.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        embeddings.extend(vectors);
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
