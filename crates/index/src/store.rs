//! SQLite-backed article store.
//!
//! Articles are keyed by their derived id, so re-ingesting an article
//! overwrites the stored row instead of appending a duplicate. A cached
//! embedding survives re-ingestion only while title and body are unchanged.

use crate::types::{Article, Category, Region};
use chrono::{DateTime, Utc};
use newsdesk_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    region TEXT NOT NULL,
    category TEXT NOT NULL,
    published_at TEXT NOT NULL,
    embedding BLOB,
    embedding_fingerprint TEXT,
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_bucket ON articles(region, category);
"#;

const SELECT_COLUMNS: &str = "id, title, body, source, url, region, category, published_at, \
                              embedding, embedding_fingerprint";

/// Durable, deduplicated article collection.
pub struct ArticleStore {
    conn: Mutex<Connection>,
}

impl ArticleStore {
    /// Open (creating if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("Failed to open article store: {}", e)))?;

        tracing::debug!("Opened article store at {:?}", db_path);
        Self::init(conn)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Storage(format!("Failed to open in-memory store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Storage(format!("Failed to create tables: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Storage("Article store lock poisoned".to_string()))
    }

    /// Insert or overwrite a batch of articles in one transaction.
    ///
    /// Returns the number of rows written.
    pub fn upsert_batch(&self, articles: &[Article]) -> AppResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO articles (id, title, body, source, url, region, category, \
                     published_at, embedding, embedding_fingerprint, ingested_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(id) DO UPDATE SET
                        embedding = CASE WHEN articles.title = excluded.title
                                          AND articles.body = excluded.body
                                          AND excluded.embedding IS NULL
                                     THEN articles.embedding ELSE excluded.embedding END,
                        embedding_fingerprint = CASE WHEN articles.title = excluded.title
                                          AND articles.body = excluded.body
                                          AND excluded.embedding IS NULL
                                     THEN articles.embedding_fingerprint
                                     ELSE excluded.embedding_fingerprint END,
                        title = excluded.title,
                        body = excluded.body,
                        source = excluded.source,
                        url = excluded.url,
                        region = excluded.region,
                        category = excluded.category,
                        published_at = excluded.published_at,
                        ingested_at = excluded.ingested_at",
                )
                .map_err(|e| AppError::Storage(format!("Failed to prepare upsert: {}", e)))?;

            for article in articles {
                let embedding = article.embedding.as_deref().map(embedding_to_bytes);
                stmt.execute(params![
                    article.id,
                    article.title,
                    article.body,
                    article.source,
                    article.url,
                    article.region.as_str(),
                    article.category.as_str(),
                    article.published_at.to_rfc3339(),
                    embedding,
                    article.embedding_fingerprint,
                    now,
                ])
                .map_err(|e| AppError::Storage(format!("Failed to upsert article: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit articles: {}", e)))?;

        tracing::debug!("Upserted {} articles", articles.len());
        Ok(articles.len())
    }

    /// Read-only copy of every stored article, ordered by id.
    pub fn snapshot(&self) -> AppResult<Vec<Article>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM articles ORDER BY id", SELECT_COLUMNS))
            .map_err(|e| AppError::Storage(format!("Failed to prepare snapshot: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_article)
            .map_err(|e| AppError::Storage(format!("Failed to read articles: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Storage(format!("Failed to decode article: {}", e)))
    }

    /// Look up one article by id.
    pub fn get(&self, id: &str) -> AppResult<Option<Article>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM articles WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            row_to_article,
        )
        .optional()
        .map_err(|e| AppError::Storage(format!("Failed to read article {}: {}", id, e)))
    }

    /// Write computed embeddings back so later builds can reuse them.
    pub fn cache_embeddings(
        &self,
        embeddings: &[(String, Vec<f32>)],
        fingerprint: &str,
    ) -> AppResult<usize> {
        if embeddings.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let mut updated = 0;
        {
            let mut stmt = tx
                .prepare(
                    "UPDATE articles SET embedding = ?1, embedding_fingerprint = ?2 WHERE id = ?3",
                )
                .map_err(|e| AppError::Storage(format!("Failed to prepare update: {}", e)))?;

            for (id, embedding) in embeddings {
                updated += stmt
                    .execute(params![embedding_to_bytes(embedding), fingerprint, id])
                    .map_err(|e| AppError::Storage(format!("Failed to cache embedding: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit embeddings: {}", e)))?;

        tracing::debug!("Cached {} embeddings ({})", updated, fingerprint);
        Ok(updated)
    }

    /// Number of stored articles.
    pub fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM articles", [], |row| {
            row.get::<_, i64>(0).map(|v| v as usize)
        })
        .map_err(|e| AppError::Storage(format!("Failed to count articles: {}", e)))
    }

    /// Number of articles with a cached embedding from the given provider.
    pub fn count_embedded(&self, fingerprint: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE embedding IS NOT NULL AND embedding_fingerprint = ?1",
            params![fingerprint],
            |row| row.get::<_, i64>(0).map(|v| v as usize),
        )
        .map_err(|e| AppError::Storage(format!("Failed to count embeddings: {}", e)))
    }
}

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<Article> {
    let region: String = row.get(5)?;
    let category: String = row.get(6)?;
    let published_at: String = row.get(7)?;
    let embedding: Option<Vec<u8>> = row.get(8)?;

    let region = Region::parse(&region).ok_or_else(|| {
        conversion_error(5, AppError::Storage(format!("unknown region '{}'", region)))
    })?;
    let category = Category::parse(&category).ok_or_else(|| {
        conversion_error(6, AppError::Storage(format!("unknown category '{}'", category)))
    })?;
    let published_at = DateTime::parse_from_rfc3339(&published_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(7, AppError::Storage(e.to_string())))?;
    let embedding = embedding
        .map(|bytes| bytes_to_embedding(&bytes))
        .transpose()
        .map_err(|e| conversion_error(8, e))?;

    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        source: row.get(3)?,
        url: row.get(4)?,
        region,
        category,
        published_at,
        embedding,
        embedding_fingerprint: row.get(9)?,
    })
}

fn conversion_error(column: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Storage(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn article(url: &str, title: &str) -> Article {
        let published_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        Article {
            id: Article::compute_id("Reuters", url, &published_at),
            title: title.to_string(),
            body: "Body text long enough to index".to_string(),
            source: "Reuters".to_string(),
            url: url.to_string(),
            region: Region::Global,
            category: Category::Technology,
            published_at,
            embedding: None,
            embedding_fingerprint: None,
        }
    }

    #[test]
    fn test_upsert_and_snapshot() {
        let store = ArticleStore::open_in_memory().unwrap();
        store
            .upsert_batch(&[article("https://r/1", "First"), article("https://r/2", "Second")])
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_duplicate_ids_overwrite() {
        let store = ArticleStore::open_in_memory().unwrap();
        store.upsert_batch(&[article("https://r/1", "Original")]).unwrap();
        store.upsert_batch(&[article("https://r/1", "Corrected")]).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Corrected");
    }

    #[test]
    fn test_cached_embedding_survives_identical_reingest() {
        let store = ArticleStore::open_in_memory().unwrap();
        let a = article("https://r/1", "Same");
        store.upsert_batch(&[a.clone()]).unwrap();
        store
            .cache_embeddings(&[(a.id.clone(), vec![0.6, 0.8])], "trigram/trigram-v1/2")
            .unwrap();

        store.upsert_batch(&[a.clone()]).unwrap();
        let stored = store.get(&a.id).unwrap().unwrap();
        assert_eq!(stored.embedding, Some(vec![0.6, 0.8]));
        assert!(stored.has_embedding_for("trigram/trigram-v1/2"));

        // A content change invalidates the cache
        store.upsert_batch(&[article("https://r/1", "Edited")]).unwrap();
        let stored = store.get(&a.id).unwrap().unwrap();
        assert!(stored.embedding.is_none());
    }

    #[test]
    fn test_counts_and_persistence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".newsdesk/articles.sqlite");
        let a = article("https://r/1", "Persisted");
        {
            let store = ArticleStore::open(&path).unwrap();
            store.upsert_batch(&[a.clone()]).unwrap();
            store.cache_embeddings(&[(a.id.clone(), vec![1.0])], "fp").unwrap();
        }

        let store = ArticleStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.count_embedded("fp").unwrap(), 1);
        assert_eq!(store.count_embedded("other").unwrap(), 0);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.1, -2.5, 3.75];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }
}
