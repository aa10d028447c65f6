//! Index builder: article snapshot in, Ready index version out.

use crate::config::{BuildConfig, EmbeddingConfig};
use crate::embeddings::EmbeddingProvider;
use crate::trending::compute_buckets;
use crate::types::Article;
use crate::vector::FlatIndex;
use crate::version::IndexVersion;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Counters reported by one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    pub version_id: u64,
    pub articles: usize,
    /// Articles whose cached embedding was reused
    pub reused: usize,
    /// Articles embedded during this build
    pub embedded: usize,
    /// Articles left out because their embedding failed
    pub failed: usize,
    pub duration_secs: f64,
}

/// A built version plus the embeddings worth caching in the store.
#[derive(Debug)]
pub struct BuildOutput {
    pub version: IndexVersion,
    pub new_embeddings: Vec<(String, Vec<f32>)>,
    pub stats: BuildStats,
}

pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    build: BuildConfig,
    embedding: EmbeddingConfig,
}

impl IndexBuilder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        build: BuildConfig,
        embedding: EmbeddingConfig,
    ) -> Self {
        Self {
            provider,
            build,
            embedding,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Build a new version from a snapshot.
    ///
    /// Articles are indexed in ascending id order, so identical snapshots
    /// give identical `id_map`s. Fails when the snapshot is empty (unless
    /// `allow_empty`) or when more than `max_failure_ratio` of the articles
    /// could not be embedded; nothing is published in either case.
    pub async fn build(&self, snapshot: Vec<Article>, version_id: u64) -> AppResult<BuildOutput> {
        let start = Instant::now();

        if snapshot.is_empty() && !self.build.allow_empty {
            return Err(AppError::Build("article snapshot is empty".to_string()));
        }

        let mut articles = snapshot;
        articles.sort_by(|a, b| a.id.cmp(&b.id));
        articles.dedup_by(|a, b| a.id == b.id);

        let fingerprint = self.provider.fingerprint();
        let dimensions = self.provider.dimensions();

        tracing::info!(
            "Building index version {} from {} articles ({})",
            version_id,
            articles.len(),
            fingerprint
        );

        let pending: Vec<usize> = articles
            .iter()
            .enumerate()
            .filter(|(_, a)| {
                !a.has_embedding_for(&fingerprint)
                    || a.embedding.as_ref().map(Vec::len) != Some(dimensions)
            })
            .map(|(i, _)| i)
            .collect();
        let reused = articles.len() - pending.len();

        let (new_embeddings, failed) = self.embed_pending(&articles, &pending).await;

        let failure_ratio = if articles.is_empty() {
            0.0
        } else {
            failed.len() as f64 / articles.len() as f64
        };
        if failure_ratio > self.build.max_failure_ratio {
            return Err(AppError::Build(format!(
                "embedding failed for {} of {} articles ({:.1}% > {:.1}% allowed)",
                failed.len(),
                articles.len(),
                failure_ratio * 100.0,
                self.build.max_failure_ratio * 100.0
            )));
        }
        if !failed.is_empty() {
            tracing::warn!(
                "Leaving {} articles out of version {}: embedding failed",
                failed.len(),
                version_id
            );
        }

        for (position, embedding) in &new_embeddings {
            articles[*position].embedding = Some(embedding.clone());
            articles[*position].embedding_fingerprint = Some(fingerprint.clone());
        }

        let mut index = FlatIndex::new(dimensions);
        let mut included = Vec::with_capacity(articles.len() - failed.len());
        for (position, article) in articles.iter().enumerate() {
            if failed.contains(&position) {
                continue;
            }
            let Some(embedding) = &article.embedding else {
                continue;
            };
            index.add(embedding)?;
            included.push(article.clone());
        }

        let buckets = compute_buckets(&included, &self.build);

        let version =
            IndexVersion::new(version_id, Utc::now(), fingerprint, index, included, buckets)?;
        version.mark_ready()?;

        let stats = BuildStats {
            version_id,
            articles: version.article_count(),
            reused,
            embedded: new_embeddings.len(),
            failed: failed.len(),
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Version {} ready: {} articles ({} reused, {} embedded, {} failed) in {:.2}s",
            version_id,
            stats.articles,
            stats.reused,
            stats.embedded,
            stats.failed,
            stats.duration_secs
        );

        let new_embeddings = new_embeddings
            .into_iter()
            .map(|(position, embedding)| (articles[position].id.clone(), embedding))
            .collect();

        Ok(BuildOutput {
            version,
            new_embeddings,
            stats,
        })
    }

    /// Embed the articles at `pending` positions in bounded-concurrency batches.
    ///
    /// Returns (position, vector) for successes and the set of failed positions.
    async fn embed_pending(
        &self,
        articles: &[Article],
        pending: &[usize],
    ) -> (Vec<(usize, Vec<f32>)>, HashSet<usize>) {
        let batch_size = self.embedding.effective_batch_size();
        let concurrency = self.embedding.effective_concurrency();
        let dimensions = self.provider.dimensions();

        let batches: Vec<(Vec<usize>, Vec<String>)> = pending
            .chunks(batch_size)
            .map(|positions| {
                let texts = positions
                    .iter()
                    .map(|p| articles[*p].embedding_text())
                    .collect();
                (positions.to_vec(), texts)
            })
            .collect();

        tracing::debug!(
            "Embedding {} articles in {} batches (concurrency {})",
            pending.len(),
            batches.len(),
            concurrency
        );

        let provider = &self.provider;
        let results: Vec<(Vec<usize>, AppResult<Vec<Vec<f32>>>)> = stream::iter(batches)
            .map(|(positions, texts)| async move {
                let result = provider.embed_batch(&texts).await;
                (positions, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut embedded = Vec::with_capacity(pending.len());
        let mut failed = HashSet::new();

        for (positions, result) in results {
            match result {
                Ok(vectors) if vectors.len() == positions.len() => {
                    for (position, vector) in positions.into_iter().zip(vectors) {
                        if vector.len() == dimensions {
                            embedded.push((position, vector));
                        } else {
                            tracing::debug!(
                                "Embedding for {} has {} dimensions, expected {}",
                                articles[position].id,
                                vector.len(),
                                dimensions
                            );
                            failed.insert(position);
                        }
                    }
                }
                Ok(vectors) => {
                    tracing::warn!(
                        "Embedding batch returned {} vectors for {} texts",
                        vectors.len(),
                        positions.len()
                    );
                    failed.extend(positions);
                }
                Err(e) => {
                    tracing::warn!("Embedding batch of {} failed: {}", positions.len(), e);
                    failed.extend(positions);
                }
            }
        }

        (embedded, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{article, FailingProvider, TopicProvider};
    use crate::types::{Category, Region};
    use crate::version::VersionStatus;

    fn builder(provider: Arc<dyn EmbeddingProvider>, build: BuildConfig) -> IndexBuilder {
        IndexBuilder::new(provider, build, EmbeddingConfig::default())
    }

    fn snapshot(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| {
                article(
                    &format!("id-{:03}", i),
                    &format!("Election rally number {}", i),
                    Region::India,
                    Category::Politics,
                    i as i64,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_snapshot_fails_by_default() {
        let builder = builder(Arc::new(TopicProvider), BuildConfig::default());
        let result = builder.build(Vec::new(), 1).await;
        assert!(matches!(result, Err(AppError::Build(_))));
    }

    #[tokio::test]
    async fn test_empty_snapshot_allowed() {
        let config = BuildConfig {
            allow_empty: true,
            ..Default::default()
        };
        let output = builder(Arc::new(TopicProvider), config)
            .build(Vec::new(), 1)
            .await
            .unwrap();
        assert!(output.version.is_empty());
        assert_eq!(output.version.status(), VersionStatus::Ready);
    }

    #[tokio::test]
    async fn test_build_produces_ready_version_in_id_order() {
        let mut articles = snapshot(3);
        articles.reverse();

        let output = builder(Arc::new(TopicProvider), BuildConfig::default())
            .build(articles, 4)
            .await
            .unwrap();

        assert_eq!(output.version.version_id(), 4);
        assert_eq!(output.version.status(), VersionStatus::Ready);
        assert_eq!(output.version.id_map(), &["id-000", "id-001", "id-002"]);
        assert_eq!(output.new_embeddings.len(), 3);
        assert_eq!(output.stats.embedded, 3);
        assert_eq!(
            output
                .version
                .bucket(Region::India, Category::Politics)
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn test_cached_embeddings_are_reused() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TopicProvider);
        let first = builder(Arc::clone(&provider), BuildConfig::default())
            .build(snapshot(2), 1)
            .await
            .unwrap();

        let mut cached = snapshot(2);
        for article in &mut cached {
            let (_, embedding) = first
                .new_embeddings
                .iter()
                .find(|(id, _)| *id == article.id)
                .unwrap();
            article.embedding = Some(embedding.clone());
            article.embedding_fingerprint = Some(provider.fingerprint());
        }

        let second = builder(provider, BuildConfig::default())
            .build(cached, 2)
            .await
            .unwrap();
        assert_eq!(second.stats.reused, 2);
        assert!(second.new_embeddings.is_empty());
    }

    #[tokio::test]
    async fn test_failures_above_threshold_abort() {
        // Every text containing "number 1" fails: 1 of 3 is over 5%
        let provider = Arc::new(FailingProvider::new("number 1"));
        let result = builder(provider, BuildConfig::default())
            .build(snapshot(3), 1)
            .await;
        assert!(matches!(result, Err(AppError::Build(_))));
    }

    #[tokio::test]
    async fn test_failures_within_threshold_are_excluded() {
        let config = BuildConfig {
            max_failure_ratio: 0.5,
            ..Default::default()
        };
        let provider = Arc::new(FailingProvider::new("number 1"));
        let output = builder(provider, config).build(snapshot(3), 1).await.unwrap();

        assert_eq!(output.stats.failed, 1);
        assert_eq!(output.version.id_map(), &["id-000", "id-002"]);
        assert!(output.version.article("id-001").is_none());
    }
}
