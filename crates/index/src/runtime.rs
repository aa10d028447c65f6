//! Wiring of the store, catalog, builder, scheduler, and service for one workspace.

use crate::builder::IndexBuilder;
use crate::catalog::IndexCatalog;
use crate::config::{get_store_path, IndexConfig};
use crate::embeddings::create_provider;
use crate::query::QueryEngine;
use crate::report::ReportSynthesizer;
use crate::scheduler::BuildScheduler;
use crate::service::NewsService;
use crate::store::ArticleStore;
use newsdesk_core::AppResult;
use newsdesk_llm::LlmClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct NewsRuntime {
    pub workspace: PathBuf,
    pub config: IndexConfig,
    pub store: Arc<ArticleStore>,
    pub catalog: Arc<IndexCatalog>,
    pub service: Arc<NewsService>,
    pub scheduler: Arc<BuildScheduler>,
}

impl NewsRuntime {
    /// Open a workspace and restore its newest persisted version.
    ///
    /// `llm` is the report capability; `None` runs search-only.
    pub fn open(
        workspace: &Path,
        llm: Option<Arc<dyn LlmClient>>,
        model: &str,
    ) -> AppResult<Self> {
        let config = IndexConfig::load(workspace)?;
        Self::open_with_config(workspace, config, llm, model)
    }

    /// Like [`NewsRuntime::open`] with an already loaded (and possibly
    /// overridden) config.
    pub fn open_with_config(
        workspace: &Path,
        config: IndexConfig,
        llm: Option<Arc<dyn LlmClient>>,
        model: &str,
    ) -> AppResult<Self> {
        config.validate()?;
        let store = Arc::new(ArticleStore::open(&get_store_path(workspace))?);
        let provider = create_provider(&config.embedding)?;
        let catalog = Arc::new(IndexCatalog::new(config.catalog.clone()));

        let builder = IndexBuilder::new(
            Arc::clone(&provider),
            config.build.clone(),
            config.embedding.clone(),
        );
        let scheduler = Arc::new(BuildScheduler::new(
            workspace,
            Arc::clone(&store),
            Arc::clone(&catalog),
            builder,
            config.clone(),
        ));

        if let Some(version_id) = scheduler.restore()? {
            tracing::info!("Serving restored index version {}", version_id);
        }

        let engine = QueryEngine::new(Arc::clone(&catalog), provider, config.query.clone());
        let synthesizer = ReportSynthesizer::new(llm, model, workspace);
        let service = Arc::new(NewsService::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            engine,
            synthesizer,
        ));

        tracing::debug!(
            "Opened workspace {:?} ({} stored articles)",
            workspace,
            store.count()?
        );

        Ok(Self {
            workspace: workspace.to_path_buf(),
            config,
            store,
            catalog,
            service,
            scheduler,
        })
    }
}
