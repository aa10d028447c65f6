//! Query engine: semantic search and trending lookups against the active version.
//!
//! Filtering is over-fetch then filter. The engine asks the vector index for
//! `max_results x overfetch_multiplier` candidates, drops those that fail the
//! filters, and doubles the fetch while results are short and the fetch was
//! capped by the candidate limit. Unfiltered queries pay nothing extra; very
//! selective filters may scan the whole version. Pre-filtering would need a
//! per-filter index and is not done.

use crate::catalog::IndexCatalog;
use crate::config::QueryConfig;
use crate::embeddings::EmbeddingProvider;
use crate::types::{Article, Category, Region, ScoredArticle};
use crate::vector::VectorIndex;
use crate::trending::TrendingBucket;
use crate::version::IndexVersion;
use chrono::{DateTime, Utc};
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One trending bucket with its articles resolved, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingGroup {
    pub region: Region,
    pub category: Category,
    pub articles: Vec<Article>,
}

/// Caller-supplied search filters, validated per query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_after: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_before: Option<DateTime<Utc>>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_published_after(mut self, after: DateTime<Utc>) -> Self {
        self.published_after = Some(after);
        self
    }

    pub fn with_published_before(mut self, before: DateTime<Utc>) -> Self {
        self.published_before = Some(before);
        self
    }

    fn resolve(&self) -> AppResult<ResolvedFilters> {
        let region = self.region.as_deref().map(str::parse::<Region>).transpose()?;
        let category = self
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?;

        if let (Some(after), Some(before)) = (self.published_after, self.published_before) {
            if after > before {
                return Err(AppError::InvalidFilter(format!(
                    "published_after {} is later than published_before {}",
                    after.to_rfc3339(),
                    before.to_rfc3339()
                )));
            }
        }

        Ok(ResolvedFilters {
            region,
            category,
            after: self.published_after,
            before: self.published_before,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedFilters {
    region: Option<Region>,
    category: Option<Category>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
}

impl ResolvedFilters {
    fn is_empty(&self) -> bool {
        self.region.is_none()
            && self.category.is_none()
            && self.after.is_none()
            && self.before.is_none()
    }

    fn matches(&self, article: &Article) -> bool {
        self.region.map_or(true, |r| article.region == r)
            && self.category.map_or(true, |c| article.category == c)
            && self.after.map_or(true, |t| article.published_at >= t)
            && self.before.map_or(true, |t| article.published_at <= t)
    }
}

pub struct QueryEngine {
    catalog: Arc<IndexCatalog>,
    provider: Arc<dyn EmbeddingProvider>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(
        catalog: Arc<IndexCatalog>,
        provider: Arc<dyn EmbeddingProvider>,
        config: QueryConfig,
    ) -> Self {
        Self {
            catalog,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Number of results a request for `max_results` actually gets.
    pub fn effective_limit(&self, max_results: Option<usize>) -> usize {
        max_results
            .unwrap_or(self.config.default_max_results)
            .min(self.config.max_results_cap)
    }

    /// Rank articles of the active version by similarity to `query`.
    ///
    /// The version is pinned for the whole call; a promotion that lands
    /// mid-query does not affect this result.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        filters: &SearchFilters,
    ) -> AppResult<Vec<ScoredArticle>> {
        let filters = filters.resolve()?;
        let version = self.catalog.current()?;
        self.check_fingerprint(&version)?;

        let limit = self.effective_limit(max_results);
        if limit == 0 || version.is_empty() || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.provider.embed(query).await?;
        self.search_version(&version, &query_vector, limit, &filters)
    }

    fn check_fingerprint(&self, version: &IndexVersion) -> AppResult<()> {
        let fingerprint = self.provider.fingerprint();
        if version.fingerprint() != fingerprint {
            return Err(AppError::EmbeddingMismatch(format!(
                "version {} was built with {}, queries embed with {}",
                version.version_id(),
                version.fingerprint(),
                fingerprint
            )));
        }
        Ok(())
    }

    fn search_version(
        &self,
        version: &IndexVersion,
        query_vector: &[f32],
        limit: usize,
        filters: &ResolvedFilters,
    ) -> AppResult<Vec<ScoredArticle>> {
        let total = version.article_count();
        let min_score = self.config.min_score;
        let multiplier = if filters.is_empty() {
            1
        } else {
            self.config.overfetch_multiplier
        };
        let mut fetch = limit.saturating_mul(multiplier).min(total);

        loop {
            let hits = version.index().search(query_vector, fetch)?;

            // Hits are sorted, so once one falls below min_score the rest do too
            let below_min = hits
                .last()
                .map_or(false, |(_, score)| min_score.map_or(false, |min| *score < min));

            let results: Vec<ScoredArticle> = hits
                .into_iter()
                .filter(|(_, score)| min_score.map_or(true, |min| *score >= min))
                .filter_map(|(position, score)| version.article_at(position).map(|a| (a, score)))
                .filter(|(article, _)| filters.matches(article))
                .take(limit)
                .map(|(article, score)| ScoredArticle {
                    article: article.clone(),
                    score,
                })
                .collect();

            if results.len() >= limit || fetch >= total || below_min {
                tracing::debug!(
                    "Search on version {} returned {} results (fetched {} of {})",
                    version.version_id(),
                    results.len(),
                    fetch,
                    total
                );
                return Ok(results);
            }

            fetch = fetch.saturating_mul(2).min(total);
        }
    }

    /// Trending articles for a region/category given as strings.
    pub fn trending(&self, region: &str, category: &str) -> AppResult<Vec<Article>> {
        let region: Region = region.parse()?;
        let category: Category = category.parse()?;
        self.trending_for(region, category)
    }

    /// Trending articles for a bucket, best first.
    ///
    /// A missing bucket is `NotFound`; an existing empty bucket gives an
    /// empty list.
    pub fn trending_for(&self, region: Region, category: Category) -> AppResult<Vec<Article>> {
        let version = self.catalog.current()?;
        let bucket = version.bucket(region, category).ok_or_else(|| {
            AppError::NotFound(format!("no trending bucket for {}/{}", region, category))
        })?;

        Ok(resolve(&version, bucket))
    }

    /// Every trending bucket of one region, in category order.
    ///
    /// A region without buckets is `NotFound`; empty buckets are kept.
    pub fn trending_region(&self, region: &str) -> AppResult<Vec<TrendingGroup>> {
        let region: Region = region.parse()?;
        let version = self.catalog.current()?;

        let groups: Vec<TrendingGroup> = version
            .buckets()
            .filter(|b| b.region == region)
            .map(|b| group(&version, b))
            .collect();

        if groups.is_empty() {
            return Err(AppError::NotFound(format!(
                "no trending buckets for {}",
                region
            )));
        }
        Ok(groups)
    }

    /// Every trending bucket of the active version, region by region.
    pub fn trending_all(&self) -> AppResult<Vec<TrendingGroup>> {
        let version = self.catalog.current()?;
        Ok(version.buckets().map(|b| group(&version, b)).collect())
    }
}

fn resolve(version: &IndexVersion, bucket: &TrendingBucket) -> Vec<Article> {
    bucket
        .article_ids()
        .filter_map(|id| version.article(id).cloned())
        .collect()
}

fn group(version: &IndexVersion, bucket: &TrendingBucket) -> TrendingGroup {
    TrendingGroup {
        region: bucket.region,
        category: bucket.category,
        articles: resolve(version, bucket),
    }
}
