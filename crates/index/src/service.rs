//! Request-layer surface: search, trending, ask, status.
//!
//! Every call is bounded by `query.timeout_ms`. Cancelling a call (by
//! timeout or by dropping its future) is safe because the query path never
//! mutates shared state.

use crate::catalog::IndexCatalog;
use crate::query::{QueryEngine, SearchFilters, TrendingGroup};
use crate::report::{Report, ReportSynthesizer, TrendingDigest};
use crate::store::ArticleStore;
use crate::types::{Article, Category, Region, ScoredArticle};
use crate::version::{VersionStatus, VersionSummary};
use newsdesk_core::{AppError, AppResult};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Search results plus a report over them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub query: String,
    pub articles: Vec<ScoredArticle>,
    pub report: Report,
    /// Why `report` is the plain fallback summary instead of a synthesized one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

impl QueryAnswer {
    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketSize {
    pub region: Region,
    pub category: Category,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<VersionSummary>,
    pub retained: Vec<VersionSummary>,
    pub buckets: Vec<BucketSize>,
    pub stored_articles: usize,
    pub llm_available: bool,
}

pub struct NewsService {
    catalog: Arc<IndexCatalog>,
    store: Arc<ArticleStore>,
    engine: QueryEngine,
    synthesizer: ReportSynthesizer,
    timeout: Duration,
}

impl NewsService {
    pub fn new(
        catalog: Arc<IndexCatalog>,
        store: Arc<ArticleStore>,
        engine: QueryEngine,
        synthesizer: ReportSynthesizer,
    ) -> Self {
        let timeout = Duration::from_millis(engine.config().timeout_ms);
        Self {
            catalog,
            store,
            engine,
            synthesizer,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, what: &str, budget: Duration, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout(budget, fut).await.map_err(|_| {
            AppError::Timeout(format!("{} exceeded {} ms", what, budget.as_millis()))
        })?
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        filters: &SearchFilters,
    ) -> AppResult<Vec<ScoredArticle>> {
        self.bounded(
            "search",
            self.timeout,
            self.engine.search(query, max_results, filters),
        )
        .await
    }

    pub fn trending(&self, region: &str, category: &str) -> AppResult<Vec<Article>> {
        self.engine.trending(region, category)
    }

    pub fn trending_region(&self, region: &str) -> AppResult<Vec<TrendingGroup>> {
        self.engine.trending_region(region)
    }

    pub fn trending_all(&self) -> AppResult<Vec<TrendingGroup>> {
        self.engine.trending_all()
    }

    /// Trending articles with an LLM digest of the top stories.
    pub async fn trending_digest(
        &self,
        region: &str,
        category: &str,
    ) -> AppResult<TrendingDigest> {
        let region: Region = region.parse()?;
        let category: Category = category.parse()?;
        let articles = self.engine.trending_for(region, category)?;

        self.bounded(
            "trending digest",
            self.timeout,
            self.synthesizer.summarize_trending(region, category, &articles),
        )
        .await
    }

    /// Search, then synthesize a cited report over the results.
    ///
    /// Search errors are returned as-is. A failed or timed-out synthesis
    /// degrades to a fallback report built from the ranked articles.
    pub async fn ask(
        &self,
        query: &str,
        max_results: Option<usize>,
        filters: &SearchFilters,
    ) -> AppResult<QueryAnswer> {
        let started = Instant::now();
        let articles = self.search(query, max_results, filters).await?;

        let remaining = self.timeout.saturating_sub(started.elapsed());
        let synthesis = self
            .bounded(
                "synthesis",
                remaining,
                self.synthesizer.synthesize(query, &articles),
            )
            .await;

        let (report, degraded_reason) = match synthesis {
            Ok(report) => (report, None),
            Err(e) => {
                tracing::warn!("Returning fallback summary instead of a report: {}", e);
                (Report::fallback(query, &articles), Some(e.to_string()))
            }
        };

        Ok(QueryAnswer {
            query: query.to_string(),
            articles,
            report,
            degraded_reason,
        })
    }

    pub fn status(&self) -> AppResult<ServiceStatus> {
        let retained = self.catalog.history()?;
        let active = retained
            .first()
            .filter(|s| s.status == VersionStatus::Active)
            .cloned();

        let buckets = match self.catalog.current() {
            Ok(version) => version
                .buckets()
                .map(|b| BucketSize {
                    region: b.region,
                    category: b.category,
                    size: b.len(),
                })
                .collect(),
            Err(AppError::EmptyIndex) => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(ServiceStatus {
            active,
            retained: retained.into_iter().skip(1).collect(),
            buckets,
            stored_articles: self.store.count()?,
            llm_available: self.synthesizer.is_available(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::config::{BuildConfig, CatalogConfig, EmbeddingConfig, QueryConfig};
    use crate::embeddings::EmbeddingProvider;
    use crate::tests::support::{article, ScriptedLlm, TopicProvider};
    use async_trait::async_trait;
    use newsdesk_llm::{LlmClient, LlmRequest, LlmResponse};
    use tempfile::TempDir;

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        fn provider_name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(AppError::Llm("unreachable".to_string()))
        }
    }

    async fn service(llm: Option<Arc<dyn LlmClient>>, workspace: &TempDir) -> NewsService {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TopicProvider);
        let catalog = Arc::new(IndexCatalog::new(CatalogConfig::default()));
        let store = Arc::new(ArticleStore::open_in_memory().unwrap());
        let articles = vec![
            article("t1", "AI regulation bill passes", Region::Global, Category::Technology, 1),
            article("s1", "Cricket test series win", Region::India, Category::Sports, 2),
        ];
        store.upsert_batch(&articles).unwrap();

        let builder = IndexBuilder::new(
            Arc::clone(&provider),
            BuildConfig::default(),
            EmbeddingConfig::default(),
        );
        let output = builder.build(store.snapshot().unwrap(), 1).await.unwrap();
        catalog.promote(Arc::new(output.version)).unwrap();

        let engine = QueryEngine::new(Arc::clone(&catalog), provider, QueryConfig::default());
        let synthesizer = ReportSynthesizer::new(llm, "m", workspace.path());
        NewsService::new(catalog, store, engine, synthesizer)
    }

    #[tokio::test]
    async fn test_ask_with_report() {
        let temp = TempDir::new().unwrap();
        let llm: Arc<dyn LlmClient> =
            Arc::new(ScriptedLlm::replying("AI bill passed.\nSources: 1"));
        let answer = service(Some(llm), &temp)
            .await
            .ask("AI regulation", Some(1), &SearchFilters::new())
            .await
            .unwrap();

        assert!(!answer.is_degraded());
        let report = answer.report;
        assert_eq!(report.citations[0].article_id, "t1");
        assert_eq!(answer.articles[0].article.id, "t1");
    }

    #[tokio::test]
    async fn test_ask_degrades_without_llm() {
        let temp = TempDir::new().unwrap();
        let answer = service(None, &temp)
            .await
            .ask("cricket", Some(1), &SearchFilters::new())
            .await
            .unwrap();

        assert!(answer.is_degraded());
        assert_eq!(
            answer.report.answer,
            "Found 1 articles related to 'cricket'. Top result: 'Cricket test series win' from Wire."
        );
        assert_eq!(answer.report.citations[0].article_id, "s1");
        assert_eq!(answer.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_ask_degrades_on_slow_llm() {
        let temp = TempDir::new().unwrap();
        let llm: Arc<dyn LlmClient> = Arc::new(SlowLlm);
        let service = service(Some(llm), &temp)
            .await
            .with_timeout(Duration::from_millis(200));

        let answer = service
            .ask("cricket", Some(1), &SearchFilters::new())
            .await
            .unwrap();
        assert!(answer.degraded_reason.unwrap().contains("Timed out"));
        assert_eq!(answer.articles.len(), 1);
        assert!(answer.report.answer.starts_with("Found 1 articles"));
    }

    #[tokio::test]
    async fn test_ask_propagates_bad_input() {
        let temp = TempDir::new().unwrap();
        let result = service(None, &temp)
            .await
            .ask("x", None, &SearchFilters::new().with_category("weather"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidFilter(_))));
    }

    #[tokio::test]
    async fn test_trending_groups() {
        let temp = TempDir::new().unwrap();
        let service = service(None, &temp).await;

        let india = service.trending_region("India").unwrap();
        let sports = india
            .iter()
            .find(|g| g.category == Category::Sports)
            .unwrap();
        assert_eq!(sports.articles[0].id, "s1");
        assert!(india.iter().all(|g| g.region == Region::India));

        let all = service.trending_all().unwrap();
        assert_eq!(all.len(), 12);
        let ids: Vec<&str> = all
            .iter()
            .flat_map(|g| g.articles.iter().map(|a| a.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["s1", "t1"]);
    }

    #[tokio::test]
    async fn test_status_reports_active_version() {
        let temp = TempDir::new().unwrap();
        let status = service(None, &temp).await.status().unwrap();

        assert_eq!(status.active.unwrap().version_id, 1);
        assert!(status.retained.is_empty());
        assert_eq!(status.stored_articles, 2);
        assert_eq!(status.buckets.len(), 12);
        assert!(!status.llm_available);
    }
}
