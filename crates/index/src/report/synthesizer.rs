//! LLM-backed report and trending digest synthesis.

use super::citations::{parse_citations, strip_sources_line};
use super::types::{Citation, Report, TrendingDigest};
use crate::types::{Article, Category, Region, ScoredArticle};
use newsdesk_core::{AppError, AppResult};
use newsdesk_llm::{LlmClient, LlmRequest};
use newsdesk_prompt::{
    build_prompt, load_prompt, BuiltPrompt, REPORT_PROMPT_ID, TRENDING_PROMPT_ID,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Article body characters included per article in the report prompt.
const MAX_CONTEXT_BODY_CHARS: usize = 600;

/// Stories a trending digest is written from.
const DIGEST_STORIES: usize = 3;

#[derive(Serialize)]
struct ReportContext<'a> {
    query: &'a str,
    articles: Vec<ReportArticle<'a>>,
}

#[derive(Serialize)]
struct ReportArticle<'a> {
    number: usize,
    title: &'a str,
    source: &'a str,
    published: String,
    body: String,
}

#[derive(Serialize)]
struct TrendingContext<'a> {
    region: &'a str,
    category: &'a str,
    stories: Vec<TrendingStory<'a>>,
}

#[derive(Serialize)]
struct TrendingStory<'a> {
    title: &'a str,
    source: &'a str,
}

pub struct ReportSynthesizer {
    client: Option<Arc<dyn LlmClient>>,
    model: String,
    workspace: PathBuf,
}

impl ReportSynthesizer {
    /// `client` is `None` when no LLM is configured; synthesis then fails
    /// with `Synthesis` and callers fall back to plain results.
    pub fn new(
        client: Option<Arc<dyn LlmClient>>,
        model: impl Into<String>,
        workspace: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            workspace: workspace.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// Write a cited answer to `query` from `articles`.
    ///
    /// Every citation refers to an entry of `articles`. If the model cites
    /// nothing usable, all inputs are cited.
    pub async fn synthesize(&self, query: &str, articles: &[ScoredArticle]) -> AppResult<Report> {
        if articles.is_empty() {
            return Ok(Report::no_information(query));
        }

        let context = ReportContext {
            query: query.trim(),
            articles: articles
                .iter()
                .enumerate()
                .map(|(i, scored)| ReportArticle {
                    number: i + 1,
                    title: &scored.article.title,
                    source: &scored.article.source,
                    published: scored.article.published_at.format("%Y-%m-%d").to_string(),
                    body: scored
                        .article
                        .body
                        .chars()
                        .take(MAX_CONTEXT_BODY_CHARS)
                        .collect(),
                })
                .collect(),
        };

        let prompt = self.render(REPORT_PROMPT_ID, &context)?;
        let content = self.complete(prompt).await?;

        let mut numbers = parse_citations(&content, articles.len());
        if numbers.is_empty() {
            tracing::debug!("Model cited nothing; citing all {} inputs", articles.len());
            numbers = (1..=articles.len()).collect();
        }

        let citations = numbers
            .into_iter()
            .map(|n| Citation::new(n, &articles[n - 1].article))
            .collect();

        Ok(Report {
            answer: strip_sources_line(&content),
            citations,
        })
    }

    /// Two or three sentence digest of the top stories of a bucket.
    pub async fn summarize_trending(
        &self,
        region: Region,
        category: Category,
        articles: &[Article],
    ) -> AppResult<TrendingDigest> {
        let top: Vec<&Article> = articles.iter().take(DIGEST_STORIES).collect();
        let article_ids = top.iter().map(|a| a.id.clone()).collect();

        if top.is_empty() {
            return Ok(TrendingDigest {
                region,
                category,
                summary: format!(
                    "No trending {} stories in {} right now.",
                    category.as_str().to_lowercase(),
                    region
                ),
                article_ids,
            });
        }

        let context = TrendingContext {
            region: region.as_str(),
            category: category.as_str(),
            stories: top
                .iter()
                .map(|a| TrendingStory {
                    title: &a.title,
                    source: &a.source,
                })
                .collect(),
        };

        let prompt = self.render(TRENDING_PROMPT_ID, &context)?;
        let summary = self.complete(prompt).await?;

        Ok(TrendingDigest {
            region,
            category,
            summary: summary.trim().to_string(),
            article_ids,
        })
    }

    fn render<C: Serialize>(&self, prompt_id: &str, context: &C) -> AppResult<BuiltPrompt> {
        let definition = load_prompt(&self.workspace, prompt_id)?;
        build_prompt(&definition, context)
    }

    async fn complete(&self, prompt: BuiltPrompt) -> AppResult<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::Synthesis("no LLM provider configured".to_string()))?;

        let mut request = LlmRequest::new(prompt.user, &self.model);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = prompt.metadata.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = prompt.metadata.temperature {
            request = request.with_temperature(temperature);
        }

        tracing::debug!(
            "Requesting {} from {} (model {})",
            prompt.metadata.source_prompt_id,
            client.provider_name(),
            self.model
        );

        let response = client
            .complete(&request)
            .await
            .map_err(|e| AppError::Synthesis(format!("LLM request failed: {}", e)))?;

        if response.is_blank() {
            return Err(AppError::Synthesis("LLM returned an empty response".to_string()));
        }

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{article, ScriptedLlm};
    use tempfile::TempDir;

    fn ranked() -> Vec<ScoredArticle> {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| ScoredArticle {
                article: article(
                    id,
                    &format!("Monsoon update {}", id),
                    Region::India,
                    Category::Other,
                    i as i64,
                ),
                score: 0.9 - i as f32 * 0.1,
            })
            .collect()
    }

    fn synthesizer(llm: Arc<ScriptedLlm>, workspace: &TempDir) -> ReportSynthesizer {
        let client: Arc<dyn LlmClient> = llm;
        ReportSynthesizer::new(Some(client), "test-model", workspace.path())
    }

    #[tokio::test]
    async fn test_report_cites_only_inputs() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(ScriptedLlm::replying(
            "Rains arrive early [2].\nSee also [5].\nSources: 2, 3, 8",
        ));
        let report = synthesizer(Arc::clone(&llm), &temp)
            .synthesize("monsoon", &ranked())
            .await
            .unwrap();

        let ids: Vec<&str> = report.citations.iter().map(|c| c.article_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(!report.answer.contains("Sources:"));

        let request = &llm.requests.lock().unwrap()[0];
        assert!(request.prompt.contains("Source 1 (Wire, 2024-07-01): Monsoon update a"));
        assert_eq!(request.model, "test-model");
        assert_eq!(request.max_tokens, Some(1024));
    }

    #[tokio::test]
    async fn test_uncited_reply_cites_everything() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(ScriptedLlm::replying("Monsoon coverage is broad."));
        let report = synthesizer(llm, &temp)
            .synthesize("monsoon", &ranked())
            .await
            .unwrap();
        assert_eq!(report.citations.len(), 3);
        assert_eq!(report.citations[0].number, 1);
    }

    #[tokio::test]
    async fn test_empty_input_skips_llm() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let report = synthesizer(Arc::clone(&llm), &temp)
            .synthesize("volcano", &[])
            .await
            .unwrap();
        assert!(report.citations.is_empty());
        assert!(report.answer.contains("volcano"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_become_synthesis_errors() {
        let temp = TempDir::new().unwrap();

        let blank = Arc::new(ScriptedLlm::replying("   "));
        let result = synthesizer(blank, &temp).synthesize("q", &ranked()).await;
        assert!(matches!(result, Err(AppError::Synthesis(_))));

        let down = Arc::new(ScriptedLlm::new(vec![Err(AppError::Llm("refused".into()))]));
        let result = synthesizer(down, &temp).synthesize("q", &ranked()).await;
        assert!(matches!(result, Err(AppError::Synthesis(_))));

        let none = ReportSynthesizer::new(None, "m", temp.path());
        assert!(!none.is_available());
        let result = none.synthesize("q", &ranked()).await;
        assert!(matches!(result, Err(AppError::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_trending_digest_uses_top_three() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(ScriptedLlm::replying("  Monsoon dominates.  "));
        let articles: Vec<Article> = (0..5)
            .map(|i| {
                article(
                    &format!("m{}", i),
                    &format!("Story {}", i),
                    Region::India,
                    Category::Health,
                    i,
                )
            })
            .collect();

        let digest = synthesizer(Arc::clone(&llm), &temp)
            .summarize_trending(Region::India, Category::Health, &articles)
            .await
            .unwrap();

        assert_eq!(digest.summary, "Monsoon dominates.");
        assert_eq!(digest.article_ids, vec!["m0", "m1", "m2"]);
        let prompt = llm.requests.lock().unwrap()[0].prompt.clone();
        assert!(prompt.contains("Health news in India"));
        assert!(!prompt.contains("Story 3"));
    }

    #[tokio::test]
    async fn test_empty_bucket_digest() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let digest = synthesizer(Arc::clone(&llm), &temp)
            .summarize_trending(Region::Global, Category::Crime, &[])
            .await
            .unwrap();
        assert!(digest.summary.contains("crime"));
        assert_eq!(llm.calls(), 0);
    }
}
