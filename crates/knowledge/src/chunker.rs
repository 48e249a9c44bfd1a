//! Text chunking with configurable size and overlap.
//!
//! Windows are measured in characters, not bytes. Consecutive chunks of a
//! document share exactly `overlap` characters and the last window is kept
//! even when short, so dropping each chunk's leading overlap and
//! concatenating gives back the original content.

use crate::types::{meta, Chunk, Document};

/// Chunk every document, preserving document order.
pub fn chunk_documents(documents: &[Document], size: usize, overlap: usize) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents
        .iter()
        .flat_map(|doc| chunk_document(doc, size, overlap))
        .collect();

    tracing::debug!(
        "Chunked {} documents into {} chunks (size: {}, overlap: {})",
        documents.len(),
        chunks.len(),
        size,
        overlap
    );

    chunks
}

/// Chunk one document.
///
/// Whitespace-only content yields no chunks. `overlap` must be smaller than
/// `size`; this is enforced when the configuration is validated, and a bad
/// pair here falls back to non-overlapping windows.
pub fn chunk_document(document: &Document, size: usize, overlap: usize) -> Vec<Chunk> {
    if document.content.trim().is_empty() || size == 0 {
        return vec![];
    }

    let step = if overlap < size { size - overlap } else { size };

    // Byte offset of every char boundary, plus the end of the string
    let boundaries: Vec<usize> = document
        .content
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(document.content.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + size).min(char_count);
        let text = &document.content[boundaries[start]..boundaries[end]];
        let chunk_index = chunks.len() as u32;

        let mut metadata = document.metadata.clone();
        metadata.insert(meta::CHUNK_INDEX.to_string(), chunk_index.to_string());

        chunks.push(Chunk {
            id: format!("{}/{}", document.id, chunk_index),
            document_id: document.id.clone(),
            chunk_index,
            text: text.to_string(),
            metadata,
        });

        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}
