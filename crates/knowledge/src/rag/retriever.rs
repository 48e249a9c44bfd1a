//! Multi-query retrieval over the ready index.

use std::collections::HashMap;
use std::sync::Arc;

use placement_core::{AppError, AppResult, RagConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::embeddings::EmbeddingProvider;
use crate::ingest::ReadyIndex;
use crate::rag::expand::QueryExpander;
use crate::types::{RetrievedChunk, RetrievedSet};
use crate::vector_index::sort_by_score;

/// How many variants to search and how many chunks to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Query variants, the original included
    pub variants: usize,
    pub k_per_variant: usize,
    pub total_k: usize,
}

impl RetrievalParams {
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            variants: config.query_variants,
            k_per_variant: config.k_per_variant,
            total_k: config.total_k,
        }
    }
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

/// Variants searched and the merged result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Retrieval {
    pub variants: Vec<String>,
    pub set: RetrievedSet,
}

pub struct Retriever {
    index: ReadyIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    expander: QueryExpander,
    params: RetrievalParams,
}

impl Retriever {
    pub fn new(
        index: ReadyIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        expander: QueryExpander,
        params: RetrievalParams,
    ) -> Self {
        Self {
            index,
            embedder,
            expander,
            params,
        }
    }

    pub fn params(&self) -> RetrievalParams {
        self.params
    }

    pub fn index(&self) -> &ReadyIndex {
        &self.index
    }

    /// Retrieve with the configured parameters.
    pub async fn retrieve(&self, question: &str) -> AppResult<RetrievedSet> {
        Ok(self.retrieve_with(question, self.params).await?.set)
    }

    /// Expand, search each variant, merge by chunk id keeping the best
    /// score, and keep the top `total_k`.
    #[instrument(skip(self, question), fields(variants = params.variants, k = params.k_per_variant, total_k = params.total_k))]
    pub async fn retrieve_with(&self, question: &str, params: RetrievalParams) -> AppResult<Retrieval> {
        let variants = self.expander.expand(question, params.variants).await;

        let embeddings = self.embedder.embed_batch(&variants).await?;
        if embeddings.len() != variants.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} query variants",
                embeddings.len(),
                variants.len()
            )));
        }

        let mut per_variant = Vec::with_capacity(variants.len());
        for (variant, embedding) in variants.iter().zip(&embeddings) {
            let hits = self.index.search(embedding, params.k_per_variant)?;
            debug!("Variant {:?} matched {} chunks", variant, hits.len());
            per_variant.push(hits);
        }

        let set = merge_results(per_variant, params.total_k);

        info!(
            "Retrieved {} chunks for {} variants (max score: {:.3})",
            set.len(),
            variants.len(),
            set.max_score()
        );

        Ok(Retrieval { variants, set })
    }
}

/// Union of per-variant hits, deduplicated by chunk id with the max score,
/// sorted by score then insertion position, truncated to `total_k`.
pub fn merge_results(per_variant: Vec<Vec<RetrievedChunk>>, total_k: usize) -> RetrievedSet {
    let mut merged: Vec<RetrievedChunk> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for hit in per_variant.into_iter().flatten() {
        match by_id.get(&hit.chunk.id) {
            Some(&i) => {
                if hit.score > merged[i].score {
                    merged[i].score = hit.score;
                }
            }
            None => {
                by_id.insert(hit.chunk.id.clone(), merged.len());
                merged.push(hit);
            }
        }
    }

    sort_by_score(&mut merged);
    merged.truncate(total_k);

    RetrievedSet { chunks: merged }
}
