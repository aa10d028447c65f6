//! Index catalog: the process-wide pointer to the active index version.
//!
//! Readers clone an `Arc` under a short read lock and then search without
//! holding any lock, so a promotion never waits on a query and a retired
//! version stays alive until its last in-flight query drops it.

use crate::config::CatalogConfig;
use crate::version::{IndexVersion, VersionStatus, VersionSummary};
use newsdesk_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct CatalogState {
    active: Option<Arc<IndexVersion>>,
    /// Most recently retired first
    retired: VecDeque<Arc<IndexVersion>>,
}

/// Result of a promotion followed by its health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    Promoted { version_id: u64 },
    RolledBack { version_id: u64, restored: u64 },
}

#[derive(Debug)]
pub struct IndexCatalog {
    state: RwLock<CatalogState>,
    next_id: AtomicU64,
    config: CatalogConfig,
}

impl IndexCatalog {
    /// An empty catalog; `current()` fails until the first promotion.
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Allocate a fresh, monotonically increasing version id.
    pub fn next_version_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make sure future ids are greater than `version_id` (after a restore).
    pub fn observe_version_id(&self, version_id: u64) {
        self.next_id
            .fetch_max(version_id.saturating_add(1), Ordering::SeqCst);
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|e| AppError::Catalog(format!("Catalog lock poisoned: {}", e)))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|e| AppError::Catalog(format!("Catalog lock poisoned: {}", e)))
    }

    /// The active version, or `EmptyIndex` before the first promotion.
    pub fn current(&self) -> AppResult<Arc<IndexVersion>> {
        self.read()?.active.clone().ok_or(AppError::EmptyIndex)
    }

    pub fn has_active(&self) -> bool {
        self.read().map(|s| s.active.is_some()).unwrap_or(false)
    }

    /// Swap a Ready version in as Active.
    ///
    /// Returns the version it replaced, which is now Retired and retained
    /// for rollback.
    pub fn promote(&self, version: Arc<IndexVersion>) -> AppResult<Option<Arc<IndexVersion>>> {
        if version.status() != VersionStatus::Ready {
            return Err(AppError::Catalog(format!(
                "cannot promote version {}: status is {}",
                version.version_id(),
                version.status()
            )));
        }

        let mut state = self.write()?;
        version.transition(VersionStatus::Ready, VersionStatus::Active)?;

        // Every status change happens before the swap, so a failure leaves
        // the catalog exactly as it was
        if let Some(old) = &state.active {
            if let Err(e) = old.transition(VersionStatus::Active, VersionStatus::Retired) {
                version.transition(VersionStatus::Active, VersionStatus::Ready)?;
                return Err(e);
            }
        }

        self.observe_version_id(version.version_id());
        let previous = state.active.replace(Arc::clone(&version));
        if let Some(old) = &previous {
            state.retired.push_front(Arc::clone(old));
            while state.retired.len() > self.config.retention {
                if let Some(dropped) = state.retired.pop_back() {
                    tracing::debug!("Released retired version {}", dropped.version_id());
                }
            }
        }

        tracing::info!(
            "Promoted index version {} ({} articles){}",
            version.version_id(),
            version.article_count(),
            previous
                .as_ref()
                .map(|p| format!(", retired {}", p.version_id()))
                .unwrap_or_default()
        );

        Ok(previous)
    }

    /// Reinstate the most recently retired version.
    ///
    /// The faulty active version is retired and not kept for a later rollback.
    pub fn rollback(&self) -> AppResult<Arc<IndexVersion>> {
        let mut state = self.write()?;

        let restored = state.retired.pop_front().ok_or_else(|| {
            AppError::Catalog("no retained version to roll back to".to_string())
        })?;

        if let Err(e) = restored.transition(VersionStatus::Retired, VersionStatus::Active) {
            state.retired.push_front(restored);
            return Err(e);
        }

        if let Some(faulty) = &state.active {
            if let Err(e) = faulty.transition(VersionStatus::Active, VersionStatus::Retired) {
                restored.transition(VersionStatus::Active, VersionStatus::Retired)?;
                state.retired.push_front(restored);
                return Err(e);
            }
        }

        if let Some(faulty) = state.active.replace(Arc::clone(&restored)) {
            tracing::warn!(
                "Rolled back from version {} to {}",
                faulty.version_id(),
                restored.version_id()
            );
        }

        Ok(restored)
    }

    /// Sanity check a candidate against the version it would replace.
    ///
    /// Fails when the candidate's populated trending buckets fall below
    /// `health_min_ratio` of the previous version's.
    pub fn health_check(&self, candidate: &IndexVersion, previous: Option<&IndexVersion>) -> bool {
        let Some(previous) = previous else {
            return true;
        };

        let before = previous.populated_buckets();
        if before == 0 {
            return true;
        }

        let after = candidate.populated_buckets();
        let healthy = after as f64 >= before as f64 * self.config.health_min_ratio;
        if !healthy {
            tracing::warn!(
                "Version {} fails health check: {} populated buckets vs {} in version {}",
                candidate.version_id(),
                after,
                before,
                previous.version_id()
            );
        }
        healthy
    }

    /// Promote, then roll back immediately if the new version looks faulty.
    pub fn promote_checked(&self, version: Arc<IndexVersion>) -> AppResult<PromotionOutcome> {
        let version_id = version.version_id();
        let previous = self.promote(Arc::clone(&version))?;

        if self.health_check(&version, previous.as_deref()) {
            return Ok(PromotionOutcome::Promoted { version_id });
        }

        let restored = self.rollback()?;
        Ok(PromotionOutcome::RolledBack {
            version_id,
            restored: restored.version_id(),
        })
    }

    /// Ids of the active and retained versions, active first.
    pub fn retained_ids(&self) -> AppResult<Vec<u64>> {
        let state = self.read()?;
        Ok(state
            .active
            .iter()
            .chain(state.retired.iter())
            .map(|v| v.version_id())
            .collect())
    }

    /// Summaries of the active and retained versions, active first.
    pub fn history(&self) -> AppResult<Vec<VersionSummary>> {
        let state = self.read()?;
        Ok(state
            .active
            .iter()
            .chain(state.retired.iter())
            .map(|v| v.summary())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trending::{TrendingBucket, TrendingEntry};
    use crate::types::{Category, Region};
    use crate::vector::FlatIndex;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn ready(version_id: u64, populated: usize) -> Arc<IndexVersion> {
        let mut buckets = BTreeMap::new();
        for category in Category::TRACKED.iter().take(populated) {
            let mut bucket = TrendingBucket::new(Region::India, *category);
            bucket.entries.push(TrendingEntry {
                article_id: "ghost".to_string(),
                score: 1.0,
            });
            buckets.insert((Region::India, *category), bucket);
        }
        let version = IndexVersion::new(
            version_id,
            Utc::now(),
            "stub/m/2",
            FlatIndex::new(2),
            Vec::new(),
            buckets,
        )
        .unwrap();
        version.mark_ready().unwrap();
        Arc::new(version)
    }

    fn catalog(retention: usize) -> IndexCatalog {
        IndexCatalog::new(CatalogConfig {
            retention,
            ..Default::default()
        })
    }

    #[test]
    fn test_current_before_first_promotion() {
        let catalog = catalog(3);
        assert!(matches!(catalog.current(), Err(AppError::EmptyIndex)));
        assert!(!catalog.has_active());
    }

    #[test]
    fn test_promote_retires_previous() {
        let catalog = catalog(3);
        let v1 = ready(1, 1);
        let v2 = ready(2, 1);

        assert!(catalog.promote(Arc::clone(&v1)).unwrap().is_none());
        let previous = catalog.promote(Arc::clone(&v2)).unwrap().unwrap();

        assert_eq!(previous.version_id(), 1);
        assert_eq!(v1.status(), VersionStatus::Retired);
        assert_eq!(v2.status(), VersionStatus::Active);
        assert_eq!(catalog.current().unwrap().version_id(), 2);
    }

    #[test]
    fn test_only_ready_versions_promote() {
        let catalog = catalog(3);
        let v1 = ready(1, 1);
        catalog.promote(Arc::clone(&v1)).unwrap();

        // Already active
        assert!(matches!(catalog.promote(v1), Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_retention_bounds_history() {
        let catalog = catalog(2);
        for id in 1..=5 {
            catalog.promote(ready(id, 1)).unwrap();
        }
        assert_eq!(catalog.retained_ids().unwrap(), vec![5, 4, 3]);
    }

    #[test]
    fn test_rollback_restores_previous() {
        let catalog = catalog(3);
        let v1 = ready(1, 1);
        let v2 = ready(2, 1);
        catalog.promote(Arc::clone(&v1)).unwrap();
        catalog.promote(Arc::clone(&v2)).unwrap();

        let restored = catalog.rollback().unwrap();
        assert_eq!(restored.version_id(), 1);
        assert_eq!(v1.status(), VersionStatus::Active);
        assert_eq!(v2.status(), VersionStatus::Retired);
        assert_eq!(catalog.retained_ids().unwrap(), vec![1]);

        assert!(matches!(catalog.rollback(), Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_reader_keeps_retired_version_alive() {
        let catalog = catalog(0);
        catalog.promote(ready(1, 1)).unwrap();
        let held = catalog.current().unwrap();

        catalog.promote(ready(2, 1)).unwrap();
        assert_eq!(held.version_id(), 1);
        assert_eq!(held.status(), VersionStatus::Retired);
        assert!(held.bucket(Region::India, Category::Politics).is_some());
    }

    #[test]
    fn test_promote_checked_rolls_back_unhealthy_version() {
        let catalog = catalog(3);
        catalog.promote(ready(1, 6)).unwrap();

        let outcome = catalog.promote_checked(ready(2, 1)).unwrap();
        assert_eq!(
            outcome,
            PromotionOutcome::RolledBack {
                version_id: 2,
                restored: 1
            }
        );
        assert_eq!(catalog.current().unwrap().version_id(), 1);

        let outcome = catalog.promote_checked(ready(3, 4)).unwrap();
        assert_eq!(outcome, PromotionOutcome::Promoted { version_id: 3 });
    }

    #[test]
    fn test_version_ids_stay_monotonic() {
        let catalog = catalog(3);
        assert_eq!(catalog.next_version_id(), 1);
        catalog.observe_version_id(41);
        assert_eq!(catalog.next_version_id(), 42);
        catalog.observe_version_id(3);
        assert_eq!(catalog.next_version_id(), 43);
    }

    #[test]
    fn test_failed_retire_leaves_catalog_unchanged() {
        let catalog = catalog(3);
        let first = ready(1, 6);
        catalog.promote(Arc::clone(&first)).unwrap();

        // Knock the active version out of Active so retiring it fails
        first
            .transition(VersionStatus::Active, VersionStatus::Retired)
            .unwrap();

        let second = ready(2, 6);
        let result = catalog.promote(Arc::clone(&second));
        assert!(matches!(result, Err(AppError::Catalog(_))));
        assert_eq!(catalog.current().unwrap().version_id(), 1);
        assert_eq!(second.status(), VersionStatus::Ready);
        assert_eq!(catalog.retained_ids().unwrap(), vec![1]);
    }

    #[test]
    fn test_failed_rollback_keeps_retained_version() {
        let catalog = catalog(3);
        catalog.promote(ready(1, 6)).unwrap();
        let second = ready(2, 6);
        catalog.promote(Arc::clone(&second)).unwrap();

        second
            .transition(VersionStatus::Active, VersionStatus::Retired)
            .unwrap();

        assert!(matches!(catalog.rollback(), Err(AppError::Catalog(_))));
        assert_eq!(catalog.current().unwrap().version_id(), 2);
        assert_eq!(catalog.retained_ids().unwrap(), vec![2, 1]);
        let history = catalog.history().unwrap();
        assert_eq!(history[1].status, VersionStatus::Retired);
    }
}
