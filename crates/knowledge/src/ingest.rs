//! Ingestion barrier: load, chunk, embed and index the corpus.
//!
//! `initialize` runs to completion before any question is answered and hands
//! back a read-only [`ReadyIndex`]. Chunks already stored with identical text
//! are not embedded again, so re-running ingestion over an unchanged corpus
//! adds nothing and makes no provider calls.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use placement_core::{AppConfig, AppError, AppResult};
use tracing::{info, instrument};

use crate::chunker::chunk_documents;
use crate::embeddings::{embed_chunks, EmbeddingProvider};
use crate::index;
use crate::parser::load_sources;
use crate::types::{Chunk, IndexEntry, IngestStats, RetrievedChunk};
use crate::vector_index::{MemoryIndex, MetadataFilter, VectorIndex};

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Corpus files or directories
    pub documents: Vec<PathBuf>,
    /// SQLite index file
    pub index_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Drop the persisted index before ingesting
    pub reset: bool,
    /// Texts per embedding call
    pub batch_size: usize,
}

impl IngestOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            documents: config.document_paths(),
            index_path: config.index_path(),
            chunk_size: config.rag.chunk_size,
            chunk_overlap: config.rag.chunk_overlap,
            reset: false,
            batch_size: 100,
        }
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }
}

/// Read-only handle to the built index. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct ReadyIndex {
    index: Arc<MemoryIndex>,
}

impl ReadyIndex {
    /// Wrap entries that are already embedded, in insertion order.
    pub fn from_entries(entries: Vec<IndexEntry>) -> AppResult<Self> {
        Ok(Self {
            index: Arc::new(MemoryIndex::from_entries(entries)?),
        })
    }

    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievedChunk>> {
        self.index.search(query, k)
    }

    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<RetrievedChunk>> {
        self.index.search_filtered(query, k, filter)
    }

    pub fn find(&self, filter: &MetadataFilter) -> Vec<Chunk> {
        self.index.find(filter)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.index.dimensions()
    }
}

/// Build the index. Any failure here is fatal for the caller.
#[instrument(skip(options, embedder), fields(documents = options.documents.len(), provider = embedder.provider_name()))]
pub async fn initialize(
    options: &IngestOptions,
    embedder: Arc<dyn EmbeddingProvider>,
) -> AppResult<(ReadyIndex, IngestStats)> {
    let start = Instant::now();

    if options.chunk_overlap >= options.chunk_size {
        return Err(AppError::Config(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            options.chunk_overlap, options.chunk_size
        )));
    }

    let conn = index::open_store(&options.index_path)?;
    if options.reset {
        index::reset_index(&conn)?;
    }
    index::check_embedding_meta(
        &conn,
        embedder.provider_name(),
        embedder.model_name(),
        embedder.dimensions(),
    )?;

    let sources = load_sources(&options.documents)?;
    let mut stats = IngestStats {
        sources_count: sources.len() as u32,
        ..Default::default()
    };

    let mut chunks = Vec::new();
    for source in &sources {
        index::record_source(
            &conn,
            &source.path,
            source.content_type.as_str(),
            source.documents.len(),
        )?;
        stats.documents_count += source.documents.len() as u32;
        chunks.extend(chunk_documents(
            &source.documents,
            options.chunk_size,
            options.chunk_overlap,
        ));
    }
    stats.chunks_count = chunks.len() as u32;

    let stored = index::content_hashes(&conn)?;
    let pending: Vec<Chunk> = chunks
        .into_iter()
        .filter(|chunk| stored.get(&chunk.id) != Some(&index::content_hash(&chunk.text)))
        .collect();

    info!(
        "{} of {} chunks need embedding",
        pending.len(),
        stats.chunks_count
    );

    if !pending.is_empty() {
        let embeddings = embed_chunks(embedder.as_ref(), &pending, options.batch_size).await?;
        let entries: Vec<IndexEntry> = pending
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        stats.embedded_count = entries.len() as u32;
        stats.added_count = index::upsert_entries(&conn, &entries)? as u32;
    }

    let ready = ReadyIndex::from_entries(index::load_entries(&conn)?)?;
    stats.entries_count = ready.len() as u32;
    stats.duration_secs = start.elapsed().as_secs_f64();

    info!(
        "Index ready: {} entries ({} new, {} embedded) from {} sources in {:.2}s",
        stats.entries_count,
        stats.added_count,
        stats.embedded_count,
        stats.sources_count,
        stats.duration_secs
    );

    Ok((ready, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use tempfile::TempDir;

    fn options(temp: &TempDir) -> IngestOptions {
        IngestOptions {
            documents: vec![temp.path().join("corpus")],
            index_path: temp.path().join(".placement/index.sqlite"),
            chunk_size: 40,
            chunk_overlap: 5,
            reset: false,
            batch_size: 3,
        }
    }

    fn write_corpus(temp: &TempDir) {
        let corpus = temp.path().join("corpus");
        std::fs::create_dir_all(&corpus).unwrap();
        std::fs::write(
            corpus.join("placement_details.csv"),
            "Company,CTC,Eligibility\nAcme,12 LPA,CGPA 7.0\nGlobex,8 LPA,No backlogs\n",
        )
        .unwrap();
        std::fs::write(
            corpus.join("rules.txt"),
            "Students must register on the portal before the drive. Offers are final.",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_initialize_builds_index() {
        let temp = TempDir::new().unwrap();
        write_corpus(&temp);

        let (ready, stats) = initialize(&options(&temp), Arc::new(TrigramProvider::new(64)))
            .await
            .unwrap();

        assert_eq!(stats.sources_count, 2);
        assert_eq!(stats.documents_count, 3);
        assert_eq!(stats.added_count, stats.chunks_count);
        assert_eq!(ready.len() as u32, stats.chunks_count);
        assert_eq!(ready.dimensions(), Some(64));
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let temp = TempDir::new().unwrap();
        write_corpus(&temp);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(64));

        let (first, _) = initialize(&options(&temp), embedder.clone()).await.unwrap();
        let (second, stats) = initialize(&options(&temp), embedder).await.unwrap();

        assert_eq!(stats.added_count, 0);
        assert_eq!(stats.embedded_count, 0);
        assert_eq!(second.len(), first.len());
    }

    #[tokio::test]
    async fn test_model_change_requires_reset() {
        let temp = TempDir::new().unwrap();
        write_corpus(&temp);

        initialize(&options(&temp), Arc::new(TrigramProvider::new(64)))
            .await
            .unwrap();

        let mismatch = initialize(&options(&temp), Arc::new(TrigramProvider::new(32))).await;
        assert!(matches!(mismatch, Err(AppError::Knowledge(_))));

        let (ready, _) = initialize(
            &options(&temp).with_reset(true),
            Arc::new(TrigramProvider::new(32)),
        )
        .await
        .unwrap();
        assert_eq!(ready.dimensions(), Some(32));
    }

    #[tokio::test]
    async fn test_same_named_files_keep_their_chunks() {
        let temp = TempDir::new().unwrap();
        let corpus = temp.path().join("corpus");
        for (year, text) in [("2023", "Backlogs allowed: one."), ("2024", "Backlogs allowed: none.")] {
            std::fs::create_dir_all(corpus.join(year)).unwrap();
            std::fs::write(corpus.join(year).join("rules.txt"), text).unwrap();
        }
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(64));

        let (first, stats) = initialize(&options(&temp), embedder.clone()).await.unwrap();
        assert_eq!(stats.chunks_count, 2);
        assert_eq!(stats.added_count, 2);
        assert_eq!(first.len(), 2);

        let (second, stats) = initialize(&options(&temp), embedder).await.unwrap();
        assert_eq!(stats.embedded_count, 0);
        assert_eq!(stats.added_count, 0);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_document_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = initialize(&options(&temp), Arc::new(TrigramProvider::new(64))).await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }
}
