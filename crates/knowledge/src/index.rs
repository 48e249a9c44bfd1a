//! SQLite persistence for the vector index.
//!
//! The database holds every embedded chunk so that a restart, or a re-run of
//! ingestion over unchanged documents, does not call the embedding provider
//! again. Rows keep their insertion order (`rowid`), which is the tie-break
//! order of the in-memory index rebuilt from them.

use crate::types::{Chunk, IndexEntry, IndexStats};
use chrono::Utc;
use placement_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const META_PROVIDER: &str = "embedding_provider";
const META_MODEL: &str = "embedding_model";
const META_DIMENSIONS: &str = "dimensions";

/// Open (and create if needed) the index database.
pub fn open_store(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sources (
            path TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            documents INTEGER NOT NULL,
            ingested_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Opened SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Record the embedding identity of the index, or verify it matches.
///
/// Vectors from different models are not comparable, so a mismatch is fatal
/// until the index is rebuilt.
pub fn check_embedding_meta(
    conn: &Connection,
    provider: &str,
    model: &str,
    dimensions: usize,
) -> AppResult<()> {
    let expected = [
        (META_PROVIDER, provider.to_string()),
        (META_MODEL, model.to_string()),
        (META_DIMENSIONS, dimensions.to_string()),
    ];

    for (key, value) in &expected {
        match get_meta(conn, key)? {
            Some(stored) if &stored != value => {
                return Err(AppError::Knowledge(format!(
                    "Index was built with {} '{}' but the current configuration uses '{}'. \
                     Rebuild it with `placement ingest --reset`.",
                    key, stored, value
                )));
            }
            Some(_) => {}
            None => set_meta(conn, key, value)?,
        }
    }

    Ok(())
}

/// Content hash of each stored chunk, keyed by chunk id.
pub fn content_hashes(conn: &Connection) -> AppResult<HashMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT id, content_hash FROM chunks")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunk hashes: {}", e)))?;

    rows.collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| AppError::Knowledge(format!("Failed to read chunk hashes: {}", e)))
}

/// Insert or replace entries in one transaction. Returns how many were new.
pub fn upsert_entries(conn: &Connection, entries: &[IndexEntry]) -> AppResult<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

    let mut added = 0;
    for entry in entries {
        let exists = tx
            .query_row(
                "SELECT 1 FROM chunks WHERE id = ?1",
                params![entry.chunk.id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to look up chunk: {}", e)))?
            .is_some();

        let metadata_json = serde_json::to_string(&entry.chunk.metadata)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize metadata: {}", e)))?;

        tx.execute(
            "INSERT INTO chunks (id, document_id, chunk_index, text, content_hash, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 text = excluded.text,
                 content_hash = excluded.content_hash,
                 embedding = excluded.embedding,
                 metadata = excluded.metadata",
            params![
                entry.chunk.id,
                entry.chunk.document_id,
                entry.chunk.chunk_index as i64,
                entry.chunk.text,
                content_hash(&entry.chunk.text),
                embedding_to_bytes(&entry.embedding),
                metadata_json,
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to upsert chunk: {}", e)))?;

        if !exists {
            added += 1;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))?;

    Ok(added)
}

/// Every stored entry, in insertion order.
pub fn load_entries(conn: &Connection) -> AppResult<Vec<IndexEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, document_id, chunk_index, text, embedding, metadata
             FROM chunks ORDER BY rowid",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, document_id, chunk_index, text, embedding, metadata) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;

        let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)
            .map_err(|e| AppError::Serialization(format!("Invalid metadata for '{}': {}", id, e)))?;

        entries.push(IndexEntry {
            embedding: bytes_to_embedding(&embedding)?,
            chunk: Chunk {
                id,
                document_id,
                chunk_index: chunk_index as u32,
                text,
                metadata,
            },
        });
    }

    Ok(entries)
}

/// Record that a source file was ingested.
pub fn record_source(conn: &Connection, path: &Path, kind: &str, documents: usize) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (path, kind, documents, ingested_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            path.to_string_lossy().to_string(),
            kind,
            documents as i64,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to record source: {}", e)))?;

    Ok(())
}

/// Get statistics for the index.
pub fn get_stats(conn: &Connection, db_path: &Path) -> AppResult<IndexStats> {
    let count = |sql: &str| -> AppResult<u32> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as u32))
            .map_err(|e| AppError::Knowledge(format!("Failed to count rows: {}", e)))
    };

    let last_ingest_at: Option<String> = conn
        .query_row("SELECT MAX(ingested_at) FROM sources", [], |row| row.get(0))
        .map_err(|e| AppError::Knowledge(format!("Failed to read ingest time: {}", e)))?;

    Ok(IndexStats {
        sources_count: count("SELECT COUNT(*) FROM sources")?,
        chunks_count: count("SELECT COUNT(*) FROM chunks")?,
        embedding_provider: get_meta(conn, META_PROVIDER)?,
        embedding_model: get_meta(conn, META_MODEL)?,
        dimensions: get_meta(conn, META_DIMENSIONS)?.and_then(|d| d.parse().ok()),
        db_size_bytes: std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0),
        last_ingest_at,
    })
}

/// Reset the index (delete all data, embedding identity included).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM sources; DELETE FROM index_meta;")
        .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset placement index");
    Ok(())
}

/// Hex SHA-256 of chunk text.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn get_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM index_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to write index metadata: {}", e)))?;
    Ok(())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, text: &str, embedding: Vec<f32>) -> IndexEntry {
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), "quicklinks.pdf".to_string());
        IndexEntry {
            chunk: Chunk {
                id: id.to_string(),
                document_id: "quicklinks.pdf#p1".to_string(),
                chunk_index: 0,
                text: text.to_string(),
                metadata,
            },
            embedding,
        }
    }

    #[test]
    fn test_open_creates_tables() {
        let temp = TempDir::new().unwrap();
        let conn = open_store(&temp.path().join("nested/index.sqlite")).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 3);
    }

    #[test]
    fn test_upsert_and_load_preserve_order() {
        let temp = TempDir::new().unwrap();
        let conn = open_store(&temp.path().join("index.sqlite")).unwrap();

        let added = upsert_entries(
            &conn,
            &[
                entry("b", "second", vec![0.0, 1.0]),
                entry("a", "first", vec![1.0, 0.0]),
            ],
        )
        .unwrap();
        assert_eq!(added, 2);

        // Replacing keeps the row position
        let added = upsert_entries(&conn, &[entry("b", "second, edited", vec![0.5, 0.5])]).unwrap();
        assert_eq!(added, 0);

        let loaded = load_entries(&conn).unwrap();
        let ids: Vec<&str> = loaded.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(loaded[0].chunk.text, "second, edited");
        assert_eq!(loaded[0].embedding, vec![0.5, 0.5]);
        assert_eq!(
            loaded[1].metadata().get("source").map(String::as_str),
            Some("quicklinks.pdf")
        );

        let hashes = content_hashes(&conn).unwrap();
        assert_eq!(hashes.get("a"), Some(&content_hash("first")));
    }

    #[test]
    fn test_embedding_meta_mismatch() {
        let temp = TempDir::new().unwrap();
        let conn = open_store(&temp.path().join("index.sqlite")).unwrap();

        check_embedding_meta(&conn, "gemini", "models/embedding-001", 768).unwrap();
        check_embedding_meta(&conn, "gemini", "models/embedding-001", 768).unwrap();

        let err = check_embedding_meta(&conn, "trigram", "trigram-v1", 384).unwrap_err();
        assert!(err.to_string().contains("--reset"));

        reset_index(&conn).unwrap();
        check_embedding_meta(&conn, "trigram", "trigram-v1", 384).unwrap();
    }

    #[test]
    fn test_stats() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("index.sqlite");
        let conn = open_store(&db_path).unwrap();

        check_embedding_meta(&conn, "trigram", "trigram-v1", 2).unwrap();
        record_source(&conn, Path::new("quicklinks.pdf"), "pdf", 3).unwrap();
        upsert_entries(&conn, &[entry("a", "text", vec![1.0, 0.0])]).unwrap();

        let stats = get_stats(&conn, &db_path).unwrap();
        assert_eq!(stats.sources_count, 1);
        assert_eq!(stats.chunks_count, 1);
        assert_eq!(stats.embedding_model.as_deref(), Some("trigram-v1"));
        assert_eq!(stats.dimensions, Some(2));
        assert!(stats.last_ingest_at.is_some());
    }

    #[test]
    fn test_embedding_bytes() {
        let bytes = embedding_to_bytes(&[1.5, -2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.5, -2.0]);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
