//! SQLite-backed vector store
//!
//! Documents are keyed by resource id and hold the embedded text, the raw
//! embedding and a small JSON metadata blob. Nearest-neighbour search is an
//! exact cosine scan, which is plenty for a directory-sized corpus.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use super::embedder::cosine_similarity;
use crate::core::error::Error;
use crate::core::resource::Resource;

/// Display metadata kept next to each embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: i64,
    pub name: String,
    pub system: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// The indexed form of a resource
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub id: i64,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl IndexedDocument {
    /// `None` when the resource has no text worth embedding
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        let text = resource.document_text();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: resource.id,
            text,
            metadata: DocumentMetadata {
                id: resource.id,
                name: resource.name.clone(),
                system: resource.system.clone(),
                tags: resource.tags.clone(),
            },
        })
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub document_count: i64,
    pub dimension: Option<usize>,
    pub last_indexed: Option<i64>,
}

pub struct VectorDB {
    conn: Connection,
    dimension: usize,
}

impl VectorDB {
    /// Open or create the store at `path`
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create index directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open vector store: {}", path.display()))?;
        Self::with_connection(conn, dimension)
    }

    /// In-memory store (for testing)
    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, dimension)
    }

    fn with_connection(conn: Connection, dimension: usize) -> Result<Self> {
        let db = Self { conn, dimension };
        db.init_schema()?;
        db.check_dimension()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                indexed_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Embeddings from a different model cannot be compared; drop them
    fn check_dimension(&self) -> Result<()> {
        let stored = self
            .get_meta("dimension")?
            .and_then(|d| d.parse::<usize>().ok());

        if let Some(stored) = stored {
            if stored != self.dimension {
                warn!(
                    stored,
                    current = self.dimension,
                    "Embedding dimension changed, clearing vector store"
                );
                self.conn.execute("DELETE FROM documents", [])?;
            }
        }

        self.set_meta("dimension", &self.dimension.to_string())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert or overwrite the document with the same id
    pub fn upsert(&self, doc: &IndexedDocument, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "document {} has dimension {}, expected {}",
                doc.id,
                embedding.len(),
                self.dimension
            ))
            .into());
        }

        let metadata = serde_json::to_string(&doc.metadata)?;
        self.conn.execute(
            r#"
            INSERT INTO documents (id, text, embedding, metadata, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                embedding = excluded.embedding,
                metadata = excluded.metadata,
                indexed_at = excluded.indexed_at
            "#,
            params![
                doc.id,
                doc.text,
                embedding_to_bytes(embedding),
                metadata,
                chrono::Utc::now().timestamp()
            ],
        )?;

        Ok(())
    }

    /// Top `limit` documents by descending cosine similarity
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(DocumentMetadata, f32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, embedding, metadata FROM documents ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                let metadata: String = row.get(2)?;
                Ok((id, blob, metadata))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut scored = Vec::with_capacity(rows.len());
        for (id, blob, metadata) in rows {
            let metadata: DocumentMetadata = serde_json::from_str(&metadata)
                .with_context(|| format!("Corrupt metadata for document {}", id))?;
            let score = cosine_similarity(query, &bytes_to_embedding(&blob));
            scored.push((metadata, score));
        }

        // stable sort keeps id order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Delete every document whose id is not in `keep`
    pub fn retain(&self, keep: &HashSet<i64>) -> Result<usize> {
        let mut stmt = self.conn.prepare("SELECT id FROM documents")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut removed = 0;
        for id in ids.into_iter().filter(|id| !keep.contains(id)) {
            removed += self.conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
        }
        Ok(removed)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            document_count: self.count()?,
            dimension: Some(self.dimension),
            last_indexed: self
                .get_meta("last_full_index")?
                .and_then(|ts| ts.parse().ok()),
        })
    }
}

/// Convert f32 vector to bytes for storage
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes back to f32 vector
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::seed_resources;

    fn doc(id: i64, name: &str) -> IndexedDocument {
        IndexedDocument {
            id,
            text: name.to_string(),
            metadata: DocumentMetadata {
                id,
                name: name.to_string(),
                system: None,
                tags: None,
            },
        }
    }

    #[test]
    fn test_embedding_conversion() {
        let original = vec![0.1, 0.2, 0.3, -0.5];
        let recovered = bytes_to_embedding(&embedding_to_bytes(&original));
        assert_eq!(original, recovered);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let db = VectorDB::open_in_memory(2).unwrap();
        db.upsert(&doc(1, "east"), &[1.0, 0.0]).unwrap();
        db.upsert(&doc(2, "north"), &[0.0, 1.0]).unwrap();
        db.upsert(&doc(3, "north-east"), &[0.7, 0.7]).unwrap();

        let results = db.search(&[0.0, 1.0], 5).unwrap();
        let ids: Vec<i64> = results.iter().map(|(m, _)| m.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let limited = db.search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_upsert_overwrites() {
        let db = VectorDB::open_in_memory(2).unwrap();
        db.upsert(&doc(1, "old"), &[1.0, 0.0]).unwrap();
        db.upsert(&doc(1, "new"), &[0.0, 1.0]).unwrap();

        assert_eq!(db.count().unwrap(), 1);
        let results = db.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(results[0].0.name, "new");
    }

    #[test]
    fn test_retain_drops_unlisted_documents() {
        let db = VectorDB::open_in_memory(2).unwrap();
        for id in 1..=4 {
            db.upsert(&doc(id, "x"), &[1.0, 0.0]).unwrap();
        }

        let keep: HashSet<i64> = [1, 3].into_iter().collect();
        assert_eq!(db.retain(&keep).unwrap(), 2);
        assert_eq!(db.count().unwrap(), 2);

        let ids: Vec<i64> = db
            .search(&[1.0, 0.0], 10)
            .unwrap()
            .into_iter()
            .map(|(m, _)| m.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let db = VectorDB::open_in_memory(3).unwrap();
        assert!(db.upsert(&doc(1, "x"), &[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/index.db");

        {
            let db = VectorDB::open(&path, 2).unwrap();
            db.upsert(&doc(7, "kept"), &[1.0, 0.0]).unwrap();
        }

        let db = VectorDB::open(&path, 2).unwrap();
        assert_eq!(db.count().unwrap(), 1);

        let db = VectorDB::open(&path, 4).unwrap();
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_document_from_resource() {
        let mut resource = seed_resources().remove(0);
        let doc = IndexedDocument::from_resource(&resource).unwrap();
        assert_eq!(doc.id, 1);
        assert_eq!(
            doc.text,
            "Resource One\nFirst example resource\nTeens aged 13 to 18 and their families"
        );
        assert_eq!(doc.metadata.system.as_deref(), Some("Healthcare"));

        resource.name = " ".to_string();
        resource.description = None;
        resource.eligibility = None;
        assert!(IndexedDocument::from_resource(&resource).is_none());
    }
}
