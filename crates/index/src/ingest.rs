//! Article ingestion: source adapters, quality gate, normalisation.

use crate::classify::{detect_category, detect_region};
use crate::config::BuildConfig;
use crate::store::ArticleStore;
use crate::types::{Article, Category, RawArticle, Region};
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SPAM_PHRASES: &[&str] = &["click here", "buy now", "limited time", "free money"];

/// Where raw articles come from.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch the next batch. Malformed items are reported in the batch, not
    /// as an error; `Err` means the source itself was unreachable.
    ///
    /// Fetching has no side effects: a batch that is never acknowledged is
    /// delivered again by the next fetch.
    async fn fetch(&self) -> AppResult<SourceBatch>;

    /// Mark the files of a fetched batch as stored.
    async fn acknowledge(&self, _consumed: &[PathBuf]) -> AppResult<()> {
        Ok(())
    }
}

/// One delivery from an [`ArticleSource`].
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub articles: Vec<RawArticle>,
    pub files: usize,
    pub malformed: usize,
    /// Files read into `articles`, handed back to `acknowledge`
    pub consumed: Vec<PathBuf>,
}

/// Reads collector drop files: `*.json` (array of articles) and `*.jsonl`
/// (one article per line).
pub struct JsonDirSource {
    dir: PathBuf,
    archive: bool,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            archive: false,
        }
    }

    /// Move acknowledged files into `processed/` so they are read only once.
    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    fn batch_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|s| s.to_str()),
                    Some("json" | "jsonl")
                )
            })
            .collect();
        files.sort();
        files
    }

    fn archive_file(&self, path: &Path) -> AppResult<()> {
        let processed = self.dir.join("processed");
        fs::create_dir_all(&processed)?;
        if let Some(name) = path.file_name() {
            fs::rename(path, processed.join(name))?;
        }
        Ok(())
    }
}

fn parse_file(path: &Path, batch: &mut SourceBatch) -> AppResult<()> {
    let content = fs::read_to_string(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawArticle>(line) {
                Ok(article) => batch.articles.push(article),
                Err(e) => {
                    tracing::warn!("Skipping malformed line {} in {:?}: {}", line_no + 1, path, e);
                    batch.malformed += 1;
                }
            }
        }
    } else {
        let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        for value in values {
            match serde_json::from_value::<RawArticle>(value) {
                Ok(article) => batch.articles.push(article),
                Err(e) => {
                    tracing::warn!("Skipping malformed article in {:?}: {}", path, e);
                    batch.malformed += 1;
                }
            }
        }
    }

    Ok(())
}

#[async_trait::async_trait]
impl ArticleSource for JsonDirSource {
    fn name(&self) -> &str {
        "json-dir"
    }

    async fn fetch(&self) -> AppResult<SourceBatch> {
        let mut batch = SourceBatch::default();

        if !self.dir.exists() {
            tracing::debug!("Inbox {:?} does not exist, nothing to ingest", self.dir);
            return Ok(batch);
        }

        for path in self.batch_files() {
            match parse_file(&path, &mut batch) {
                Ok(()) => {
                    batch.files += 1;
                    batch.consumed.push(path);
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable batch file {:?}: {}", path, e);
                    batch.malformed += 1;
                }
            }
        }

        tracing::debug!(
            "Read {} articles from {} files in {:?}",
            batch.articles.len(),
            batch.files,
            self.dir
        );
        Ok(batch)
    }

    async fn acknowledge(&self, consumed: &[PathBuf]) -> AppResult<()> {
        if !self.archive {
            return Ok(());
        }
        for path in consumed {
            self.archive_file(path)?;
        }
        Ok(())
    }
}

/// One explicit batch file, as passed to `newsdesk ingest <file>`.
pub struct BatchFileSource {
    path: PathBuf,
}

impl BatchFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ArticleSource for BatchFileSource {
    fn name(&self) -> &str {
        "batch-file"
    }

    async fn fetch(&self) -> AppResult<SourceBatch> {
        read_batch_file(&self.path)
    }
}

/// Why an item was turned away at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ShortTitle,
    ShortText,
    Spam,
}

/// Outcome counts of one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub files: usize,
    pub received: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
}

/// Apply the quality gate to a raw article.
pub fn check_quality(raw: &RawArticle, config: &BuildConfig) -> Result<(), Rejection> {
    let title = raw.title.trim();
    if title.chars().count() < config.min_title_len {
        return Err(Rejection::ShortTitle);
    }

    let text = format!("{} {}", title, raw.body.trim());
    if text.trim().chars().count() < config.min_text_len {
        return Err(Rejection::ShortText);
    }

    let lower = text.to_lowercase();
    if SPAM_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return Err(Rejection::Spam);
    }

    Ok(())
}

/// Turn a raw article into a stored article, detecting missing metadata.
///
/// A supplied region/category that does not parse is treated as missing.
pub fn normalize(raw: RawArticle) -> Article {
    let region = raw
        .region
        .as_deref()
        .and_then(Region::parse)
        .unwrap_or_else(|| {
            detect_region(raw.country.as_deref(), &raw.source, &raw.title, &raw.body)
        });

    let category = raw
        .category
        .as_deref()
        .and_then(Category::parse)
        .unwrap_or_else(|| detect_category(&raw.title, &raw.body));

    let title = raw.title.trim().to_string();
    let source = raw.source.trim().to_string();
    let url = raw.url.trim().to_string();

    Article {
        id: Article::compute_id(&source, &url, &raw.published_at),
        title,
        body: raw.body.trim().to_string(),
        source,
        url,
        region,
        category,
        published_at: raw.published_at,
        embedding: None,
        embedding_fingerprint: None,
    }
}

/// Pull one batch from `source`, gate and normalise it, and upsert it.
///
/// The batch is acknowledged only after the store write commits; a failed
/// write leaves it with the source for the next run.
pub async fn ingest(
    store: &ArticleStore,
    source: &dyn ArticleSource,
    config: &BuildConfig,
) -> AppResult<IngestStats> {
    let mut batch = source.fetch().await?;
    let consumed = std::mem::take(&mut batch.consumed);

    let mut stats = IngestStats {
        files: batch.files,
        received: batch.articles.len(),
        malformed: batch.malformed,
        ..Default::default()
    };

    let mut accepted = Vec::with_capacity(batch.articles.len());
    for raw in batch.articles {
        match check_quality(&raw, config) {
            Ok(()) => accepted.push(normalize(raw)),
            Err(reason) => {
                tracing::debug!("Rejected '{}': {:?}", raw.title, reason);
                stats.rejected += 1;
            }
        }
    }

    stats.accepted = store.upsert_batch(&accepted)?;

    // Re-delivery only overwrites rows with identical content
    if let Err(e) = source.acknowledge(&consumed).await {
        tracing::warn!("Failed to acknowledge batch from {}: {}", source.name(), e);
    }

    tracing::info!(
        "Ingested {} of {} articles from {} ({} rejected, {} malformed)",
        stats.accepted,
        stats.received,
        source.name(),
        stats.rejected,
        stats.malformed
    );

    Ok(stats)
}

/// Parse a single batch file into raw articles.
pub fn read_batch_file(path: &Path) -> AppResult<SourceBatch> {
    if !path.is_file() {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("batch file not found: {}", path.display()),
        )));
    }
    let mut batch = SourceBatch::default();
    parse_file(path, &mut batch)?;
    batch.files = 1;
    batch.consumed.push(path.to_path_buf());
    Ok(batch)
}
