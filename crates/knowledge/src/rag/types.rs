//! RAG response types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{meta, RetrievedSet};

/// Maximum snippet length for source references, in characters.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// A single source reference used to answer a question.
///
/// This is the user-facing representation of where information came from:
/// file name, page or row, and a short piece of the passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source file name (e.g., "quicklinks.pdf", "placement_details_complete.csv")
    pub source: String,

    /// Human-readable location within the source, e.g. "page 2" or "row 14"
    pub location: String,

    /// Short snippet showing the relevant evidence (truncated if needed)
    pub snippet: String,
}

/// Source references for a retrieved set, one per (source, location), in rank order.
pub fn source_refs(set: &RetrievedSet) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for retrieved in &set.chunks {
        let chunk = &retrieved.chunk;
        let source = chunk
            .metadata
            .get(meta::SOURCE)
            .cloned()
            .unwrap_or_else(|| chunk.document_id.clone());

        let location = if let Some(page) = chunk.metadata.get(meta::PAGE) {
            format!("page {}", page)
        } else if let Some(row) = chunk.metadata.get(meta::ROW) {
            format!("row {}", row)
        } else {
            format!("part {}", chunk.chunk_index + 1)
        };

        if seen.insert((source.clone(), location.clone())) {
            sources.push(SourceRef {
                source,
                location,
                snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
            });
        }
    }

    sources
}

/// Collapse whitespace and cut to `max_len` characters, adding an ellipsis.
pub fn truncate_snippet(text: &str, max_len: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_len {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(max_len).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, RetrievedChunk};
    use std::collections::BTreeMap;

    fn retrieved(id: &str, meta: &[(&str, &str)], text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: id.to_string(),
                document_id: id.to_string(),
                chunk_index: 0,
                text: text.to_string(),
                metadata: meta
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            },
            score: 0.5,
            position: 0,
        }
    }

    #[test]
    fn test_source_refs_dedup_by_location() {
        let set = RetrievedSet {
            chunks: vec![
                retrieved("a", &[(meta::SOURCE, "quicklinks.pdf"), (meta::PAGE, "2")], "first"),
                retrieved("b", &[(meta::SOURCE, "quicklinks.pdf"), (meta::PAGE, "2")], "second"),
                retrieved("c", &[(meta::SOURCE, "details.csv"), (meta::ROW, "7")], "third"),
            ],
        };

        let refs = source_refs(&set);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].location, "page 2");
        assert_eq!(refs[0].snippet, "first");
        assert_eq!(refs[1].source, "details.csv");
        assert_eq!(refs[1].location, "row 7");
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("short\n text", 150), "short text");

        let long = "é".repeat(200);
        let snippet = truncate_snippet(&long, 10);
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 13);
    }

    #[test]
    fn test_source_ref_serialization() {
        let source_ref = SourceRef {
            source: "quicklinks.pdf".to_string(),
            location: "page 1".to_string(),
            snippet: "Test snippet".to_string(),
        };

        let json = serde_json::to_value(&source_ref).unwrap();
        assert_eq!(json["source"], "quicklinks.pdf");
        assert_eq!(json["location"], "page 1");
    }
}
