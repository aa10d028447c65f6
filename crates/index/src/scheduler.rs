//! Periodic background rebuilds.
//!
//! The build path talks to the query path only through the catalog's
//! promotion protocol. One build runs at a time.

use crate::artifacts;
use crate::builder::{BuildStats, IndexBuilder};
use crate::catalog::{IndexCatalog, PromotionOutcome};
use crate::config::{get_inbox_dir, IndexConfig};
use crate::ingest::{ingest, IngestStats, JsonDirSource};
use crate::store::ArticleStore;
use newsdesk_core::AppResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// What one build cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,
    pub build: BuildStats,
    pub promoted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_back_to: Option<u64>,
}

pub struct BuildScheduler {
    workspace: PathBuf,
    store: Arc<ArticleStore>,
    catalog: Arc<IndexCatalog>,
    builder: IndexBuilder,
    config: IndexConfig,
    persist: bool,
    build_lock: Mutex<()>,
}

impl BuildScheduler {
    pub fn new(
        workspace: impl Into<PathBuf>,
        store: Arc<ArticleStore>,
        catalog: Arc<IndexCatalog>,
        builder: IndexBuilder,
        config: IndexConfig,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            store,
            catalog,
            builder,
            config,
            persist: true,
            build_lock: Mutex::new(()),
        }
    }

    /// Keep versions in memory only.
    pub fn without_persistence(mut self) -> Self {
        self.persist = false;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn inbox(&self) -> PathBuf {
        self.config
            .schedule
            .inbox
            .clone()
            .unwrap_or_else(|| get_inbox_dir(&self.workspace))
    }

    /// Promote the newest persisted version, if any, so serving resumes
    /// after a restart. Returns the restored version id.
    ///
    /// Up to `catalog.retention` older artifacts are promoted first, so
    /// they come back as the retired history and `rollback` works after a
    /// restart. Versions embedded with a different provider are left on
    /// disk and not served; the next build replaces them.
    pub fn restore(&self) -> AppResult<Option<u64>> {
        if self.catalog.has_active() {
            return Ok(None);
        }

        for version_id in artifacts::list_versions(&self.workspace)? {
            self.catalog.observe_version_id(version_id);
        }

        let limit = self.config.catalog.retention.saturating_add(1);
        let fingerprint = self.builder.provider().fingerprint();

        let mut restorable = Vec::new();
        for version in artifacts::load_recent(&self.workspace, limit)? {
            if version.fingerprint() != fingerprint {
                tracing::warn!(
                    "Not restoring version {}: built with {}, current provider is {}",
                    version.version_id(),
                    version.fingerprint(),
                    fingerprint
                );
                break;
            }
            restorable.push(version);
        }

        let Some(newest) = restorable.first().map(|v| v.version_id()) else {
            return Ok(None);
        };

        for version in restorable.into_iter().rev() {
            self.catalog.promote(Arc::new(version))?;
        }
        Ok(Some(newest))
    }

    /// One full cycle: ingest the inbox, build, cache, persist, promote, prune.
    ///
    /// A failed build leaves the active version untouched.
    pub async fn run_once(&self) -> AppResult<BuildReport> {
        let _guard = self.build_lock.lock().await;

        let source = JsonDirSource::new(self.inbox()).with_archive(true);
        let ingest_stats = match ingest(&self.store, &source, &self.config.build).await {
            Ok(stats) if stats.files > 0 => Some(stats),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Inbox ingest failed, building from stored articles: {}", e);
                None
            }
        };

        let snapshot = self.store.snapshot()?;
        let version_id = self.catalog.next_version_id();
        let output = self.builder.build(snapshot, version_id).await?;

        let fingerprint = output.version.fingerprint().to_string();
        if let Err(e) = self
            .store
            .cache_embeddings(&output.new_embeddings, &fingerprint)
        {
            tracing::warn!("Failed to cache embeddings: {}", e);
        }

        if self.persist {
            artifacts::persist(&self.workspace, &output.version)?;
        }

        let outcome = self.catalog.promote_checked(Arc::new(output.version))?;

        if self.persist {
            let keep = self.catalog.retained_ids()?;
            if let Err(e) = artifacts::prune(&self.workspace, &keep) {
                tracing::warn!("Failed to prune version artifacts: {}", e);
            }
        }

        let (promoted, rolled_back_to) = match outcome {
            PromotionOutcome::Promoted { .. } => (true, None),
            PromotionOutcome::RolledBack { restored, .. } => (false, Some(restored)),
        };

        Ok(BuildReport {
            ingest: ingest_stats,
            build: output.stats,
            promoted,
            rolled_back_to,
        })
    }

    /// Run `run_once` every `schedule.interval_secs` until `shutdown` flips
    /// to true. The first cycle starts immediately.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let interval = Duration::from_secs(self.config.schedule.interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(report) => tracing::info!(
                                "Build cycle finished: version {} ({} articles, promoted: {})",
                                report.build.version_id,
                                report.build.articles,
                                report.promoted
                            ),
                            Err(e) => tracing::error!("Build cycle failed: {}", e),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!("Build scheduler stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
