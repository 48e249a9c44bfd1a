//! Vector index abstraction and the in-memory implementation used at query time.

use std::collections::{BTreeMap, HashMap};

use placement_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::types::{Chunk, IndexEntry, RetrievedChunk};

/// Exact key/value predicate over chunk metadata. All pairs must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub equals: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to equal `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    pub fn matches(&self, metadata: &BTreeMap<String, String>) -> bool {
        self.equals
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }
}

/// Trait for vector index backends.
pub trait VectorIndex: Send + Sync {
    /// Insert entries; entries whose id is already present replace the
    /// stored one in place. Returns the number of newly added entries.
    fn upsert(&mut self, entries: Vec<IndexEntry>) -> AppResult<usize>;

    /// Top-k entries by descending cosine similarity, ties in insertion order.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievedChunk>> {
        self.search_filtered(query, k, &MetadataFilter::default())
    }

    /// Like `search`, restricted to entries matching `filter`.
    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<RetrievedChunk>>;

    /// Every entry matching `filter`, in insertion order.
    fn find(&self, filter: &MetadataFilter) -> Vec<Chunk>;

    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension, once the first entry is stored.
    fn dimensions(&self) -> Option<usize>;
}

/// Append-only in-memory index with brute-force cosine search.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
    dimensions: Option<usize>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from entries already in insertion order.
    pub fn from_entries(entries: Vec<IndexEntry>) -> AppResult<Self> {
        let mut index = Self::new();
        index.upsert(entries)?;
        Ok(index)
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&mut self, entries: Vec<IndexEntry>) -> AppResult<usize> {
        let mut added = 0;

        for entry in entries {
            let dims = entry.embedding.len();
            match self.dimensions {
                Some(expected) if expected != dims => {
                    return Err(AppError::Knowledge(format!(
                        "Embedding dimension mismatch for '{}': got {}, index holds {}",
                        entry.id(),
                        dims,
                        expected
                    )));
                }
                None => self.dimensions = Some(dims),
                _ => {}
            }

            match self.positions.get(entry.id()) {
                Some(&pos) => self.entries[pos] = entry,
                None => {
                    self.positions
                        .insert(entry.id().to_string(), self.entries.len());
                    self.entries.push(entry);
                    added += 1;
                }
            }
        }

        Ok(added)
    }

    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<RetrievedChunk>> {
        if let Some(expected) = self.dimensions {
            if query.len() != expected {
                return Err(AppError::Knowledge(format!(
                    "Query embedding has {} dimensions, index holds {}",
                    query.len(),
                    expected
                )));
            }
        }

        let mut results: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| filter.matches(entry.metadata()))
            .map(|(position, entry)| RetrievedChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query, &entry.embedding),
                position,
            })
            .collect();

        sort_by_score(&mut results);
        results.truncate(k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            k
        );

        Ok(results)
    }

    fn find(&self, filter: &MetadataFilter) -> Vec<Chunk> {
        self.entries
            .iter()
            .filter(|entry| filter.matches(entry.metadata()))
            .map(|entry| entry.chunk.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

/// Descending score, then ascending insertion position.
pub fn sort_by_score(results: &mut [RetrievedChunk]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.position.cmp(&b.position))
    });
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
