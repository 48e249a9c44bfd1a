//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata keys shared by documents and chunks.
pub mod meta {
    /// File name of the source, e.g. `quicklinks.pdf`
    pub const SOURCE: &str = "source";
    /// Full path of the source file
    pub const PATH: &str = "path";
    /// Loader kind: `pdf`, `csv`, `text`, `markdown`
    pub const KIND: &str = "kind";
    /// 1-based page number (PDF)
    pub const PAGE: &str = "page";
    /// 0-based data row index (CSV)
    pub const ROW: &str = "row";
    /// Position of the chunk within its document
    pub const CHUNK_INDEX: &str = "chunk_index";
}

/// A loaded unit of source text: one PDF page, one CSV row or one text file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier derived from the source label, e.g. `quicklinks.pdf#p3`
    pub id: String,

    /// Extracted text
    pub content: String,

    /// Provenance (source, path, kind, page/row)
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A window of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identity: `<document id>/<chunk index>`
    pub id: String,

    /// Owning document
    pub document_id: String,

    /// Position within the document
    pub chunk_index: u32,

    /// Chunk text
    pub text: String,

    /// Document metadata plus `chunk_index`
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// Human-readable provenance tag, e.g. `quicklinks.pdf p.3 #0`.
    pub fn label(&self) -> String {
        let source = self
            .metadata
            .get(meta::SOURCE)
            .map(String::as_str)
            .unwrap_or(self.document_id.as_str());

        let location = if let Some(page) = self.metadata.get(meta::PAGE) {
            format!(" p.{}", page)
        } else if let Some(row) = self.metadata.get(meta::ROW) {
            format!(" row {}", row)
        } else {
            String::new()
        };

        format!("{}{} #{}", source, location, self.chunk_index)
    }
}

/// A chunk paired with its embedding, as stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,

    /// Embedding vector (fixed dimension for the whole index)
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn id(&self) -> &str {
        &self.chunk.id
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.chunk.metadata
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,

    /// Cosine similarity to the query variant that found it (max over variants)
    pub score: f32,

    /// Insertion position in the index, used to break score ties
    pub position: usize,
}

/// Ordered, deduplicated top-k chunks for one question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedSet {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievedSet {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.chunk.id.as_str()).collect()
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.chunks.iter().any(|c| c.chunk.id == chunk_id)
    }

    pub fn max_score(&self) -> f32 {
        self.chunks.first().map(|c| c.score).unwrap_or(0.0)
    }
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Source files read
    pub sources_count: u32,

    /// Documents produced by the loaders
    pub documents_count: u32,

    /// Chunks produced by the chunker
    pub chunks_count: u32,

    /// Chunks whose embedding had to be computed
    pub embedded_count: u32,

    /// Entries that were new to the index
    pub added_count: u32,

    /// Total entries in the index after ingestion
    pub entries_count: u32,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for the persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub sources_count: u32,
    pub chunks_count: u32,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    pub dimensions: Option<usize>,
    pub db_size_bytes: u64,
    pub last_ingest_at: Option<String>,
}
