//! End-to-end: collector batch -> store -> build -> promote -> query.

use super::support::{ScriptedLlm, TopicProvider};
use crate::builder::IndexBuilder;
use crate::catalog::IndexCatalog;
use crate::config::IndexConfig;
use crate::embeddings::EmbeddingProvider;
use crate::ingest::{ingest, JsonDirSource};
use crate::query::{QueryEngine, SearchFilters};
use crate::report::ReportSynthesizer;
use crate::scheduler::BuildScheduler;
use crate::service::NewsService;
use crate::store::ArticleStore;
use crate::types::{Category, Region};
use newsdesk_llm::LlmClient;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const BATCH: &str = r#"[
  {"title": "EU finalises AI regulation framework", "source": "Reuters",
   "url": "https://news.example/ai-1", "publishedAt": "2024-07-01T09:00:00Z",
   "region": "Global", "category": "Technology"},
  {"title": "Global summit weighs AI regulation limits", "source": "AP",
   "url": "https://news.example/ai-2", "publishedAt": "2024-07-01T07:00:00Z",
   "region": "Global", "category": "Technology"},
  {"title": "Chatbot makers accept AI rules", "source": "BBC",
   "url": "https://news.example/ai-3", "publishedAt": "2024-07-01T05:00:00Z",
   "region": "Global", "category": "Technology"},
  {"title": "India win cricket test at Lord's", "source": "PTI",
   "url": "https://news.example/cr-1", "publishedAt": "2024-07-01T10:00:00Z",
   "region": "India", "category": "Sports"},
  {"title": "Kohli century seals cricket series", "source": "NDTV",
   "url": "https://news.example/cr-2", "publishedAt": "2024-07-01T08:00:00Z",
   "region": "India", "category": "Sports"}
]"#;

struct Desk {
    workspace: TempDir,
    store: Arc<ArticleStore>,
    service: NewsService,
    scheduler: BuildScheduler,
}

fn desk(llm: Option<Arc<dyn LlmClient>>) -> Desk {
    let workspace = TempDir::new().unwrap();
    let inbox = workspace.path().join("inbox");
    fs::create_dir_all(&inbox).unwrap();
    fs::write(inbox.join("2024-07-01.json"), BATCH).unwrap();

    let mut config = IndexConfig::default();
    config.schedule.inbox = Some(inbox);

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(TopicProvider);
    let store = Arc::new(ArticleStore::open_in_memory().unwrap());
    let catalog = Arc::new(IndexCatalog::new(config.catalog.clone()));

    let builder = IndexBuilder::new(
        Arc::clone(&provider),
        config.build.clone(),
        config.embedding.clone(),
    );
    let scheduler = BuildScheduler::new(
        workspace.path(),
        Arc::clone(&store),
        Arc::clone(&catalog),
        builder,
        config.clone(),
    );

    let engine = QueryEngine::new(Arc::clone(&catalog), provider, config.query.clone());
    let synthesizer = ReportSynthesizer::new(llm, "test-model", workspace.path());
    let service = NewsService::new(catalog, Arc::clone(&store), engine, synthesizer);

    Desk {
        workspace,
        store,
        service,
        scheduler,
    }
}

#[tokio::test]
async fn test_ai_and_cricket_scenario() {
    let desk = desk(None);

    let report = desk.scheduler.run_once().await.unwrap();
    assert_eq!(report.ingest.unwrap().accepted, 5);
    assert!(report.promoted);
    assert_eq!(desk.store.count().unwrap(), 5);

    let trending = desk.service.trending("India", "Sports").unwrap();
    let titles: Vec<&str> = trending.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["India win cricket test at Lord's", "Kohli century seals cricket series"]
    );

    let results = desk
        .service
        .search("AI policy news", Some(2), &SearchFilters::new())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.article.category == Category::Technology && r.article.region == Region::Global));
    assert!(results[0].score >= results[1].score);

    // The technology article left out must not outrank the ones returned
    let ranked = desk
        .service
        .search("AI policy news", Some(5), &SearchFilters::new())
        .await
        .unwrap();
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    let returned: Vec<&str> = results.iter().map(|r| r.article.id.as_str()).collect();
    let excluded: Vec<_> = ranked
        .iter()
        .filter(|r| r.article.category == Category::Technology)
        .filter(|r| !returned.contains(&r.article.id.as_str()))
        .collect();
    assert_eq!(excluded.len(), 1);
    assert!(excluded[0].score <= results[1].score);
    assert!(ranked
        .iter()
        .filter(|r| r.article.category == Category::Sports)
        .all(|r| r.score < results[1].score));
}

#[tokio::test]
async fn test_ask_cites_only_returned_articles() {
    // The model cites every number it can think of; only 1 and 2 exist
    let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::replying(
        "Regulators move on AI [1][2][3].\nSources: 1, 2, 3, 4, 5",
    ));
    let desk = desk(Some(llm));
    desk.scheduler.run_once().await.unwrap();

    let answer = desk
        .service
        .ask("AI regulation", Some(2), &SearchFilters::new())
        .await
        .unwrap();

    let returned: Vec<&str> = answer.articles.iter().map(|r| r.article.id.as_str()).collect();
    let report = answer.report;
    assert_eq!(report.citations.len(), 2);
    assert!(report
        .citations
        .iter()
        .all(|c| returned.contains(&c.article_id.as_str())));
}

#[tokio::test]
async fn test_rebuild_overwrites_reingested_articles() {
    let desk = desk(None);
    desk.scheduler.run_once().await.unwrap();

    // Same articles delivered again: ids collide and overwrite
    let source = JsonDirSource::new(desk.workspace.path().join("inbox").join("processed"));
    let stats = ingest(&desk.store, &source, &IndexConfig::default().build)
        .await
        .unwrap();
    assert_eq!(stats.accepted, 5);
    assert_eq!(desk.store.count().unwrap(), 5);

    let report = desk.scheduler.run_once().await.unwrap();
    assert_eq!(report.build.articles, 5);
    assert_eq!(report.build.reused, 5);
}
