//! Index versions: one immutable, fully built snapshot of the searchable index.

use crate::trending::{BucketKey, TrendingBucket};
use crate::types::{Article, Category, Region};
use crate::vector::{FlatIndex, VectorIndex};
use chrono::{DateTime, Utc};
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of an index version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionStatus {
    Building,
    Ready,
    Active,
    Retired,
}

impl VersionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => VersionStatus::Building,
            1 => VersionStatus::Ready,
            2 => VersionStatus::Active,
            _ => VersionStatus::Retired,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            VersionStatus::Building => 0,
            VersionStatus::Ready => 1,
            VersionStatus::Active => 2,
            VersionStatus::Retired => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Building => "building",
            VersionStatus::Ready => "ready",
            VersionStatus::Active => "active",
            VersionStatus::Retired => "retired",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A built index snapshot.
///
/// Every field except `status` is fixed at construction; there is no `&mut`
/// access once the version is shared, so a Ready version cannot change.
#[derive(Debug)]
pub struct IndexVersion {
    version_id: u64,
    built_at: DateTime<Utc>,
    fingerprint: String,
    index: FlatIndex,
    /// Position in `index` -> article id
    id_map: Vec<String>,
    articles: HashMap<String, Article>,
    buckets: BTreeMap<BucketKey, TrendingBucket>,
    status: AtomicU8,
}

impl IndexVersion {
    /// Assemble a version in the Building state.
    ///
    /// `articles` must be in the same order their vectors were added to
    /// `index`; that order becomes the `id_map`.
    pub fn new(
        version_id: u64,
        built_at: DateTime<Utc>,
        fingerprint: impl Into<String>,
        index: FlatIndex,
        articles: Vec<Article>,
        buckets: BTreeMap<BucketKey, TrendingBucket>,
    ) -> AppResult<Self> {
        if articles.len() != index.len() {
            return Err(AppError::Build(format!(
                "version {} has {} articles but {} vectors",
                version_id,
                articles.len(),
                index.len()
            )));
        }

        let id_map: Vec<String> = articles.iter().map(|a| a.id.clone()).collect();
        let articles: HashMap<String, Article> = articles
            .into_iter()
            .map(|a| (a.id.clone(), a.without_embedding()))
            .collect();

        if articles.len() != id_map.len() {
            return Err(AppError::Build(format!(
                "version {} contains duplicate article ids",
                version_id
            )));
        }

        Ok(Self {
            version_id,
            built_at,
            fingerprint: fingerprint.into(),
            index,
            id_map,
            articles,
            buckets,
            status: AtomicU8::new(VersionStatus::Building.as_u8()),
        })
    }

    pub fn version_id(&self) -> u64 {
        self.version_id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Embedding provider fingerprint the vectors were produced with.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn article_count(&self) -> usize {
        self.id_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn id_map(&self) -> &[String] {
        &self.id_map
    }

    pub fn article(&self, id: &str) -> Option<&Article> {
        self.articles.get(id)
    }

    /// Article stored at a vector position.
    pub fn article_at(&self, position: usize) -> Option<&Article> {
        self.id_map.get(position).and_then(|id| self.articles.get(id))
    }

    pub fn bucket(&self, region: Region, category: Category) -> Option<&TrendingBucket> {
        self.buckets.get(&(region, category))
    }

    pub fn buckets(&self) -> impl Iterator<Item = &TrendingBucket> {
        self.buckets.values()
    }

    /// Number of buckets holding at least one article.
    pub fn populated_buckets(&self) -> usize {
        self.buckets.values().filter(|b| !b.is_empty()).count()
    }

    pub fn status(&self) -> VersionStatus {
        VersionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`, failing if the current status is not `from`.
    pub(crate) fn transition(&self, from: VersionStatus, to: VersionStatus) -> AppResult<()> {
        self.status
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| {
                AppError::Catalog(format!(
                    "version {} is {}, expected {} (wanted {})",
                    self.version_id,
                    VersionStatus::from_u8(actual),
                    from,
                    to
                ))
            })
    }

    /// Building -> Ready. Called once every build step has succeeded.
    pub fn mark_ready(&self) -> AppResult<()> {
        self.transition(VersionStatus::Building, VersionStatus::Ready)
    }

    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            version_id: self.version_id,
            built_at: self.built_at,
            article_count: self.article_count(),
            fingerprint: self.fingerprint.clone(),
            status: self.status(),
            populated_buckets: self.populated_buckets(),
        }
    }

    /// Serializable form for persistence.
    pub fn to_artifact(&self) -> VersionArtifact {
        VersionArtifact {
            version_id: self.version_id,
            built_at: self.built_at,
            fingerprint: self.fingerprint.clone(),
            index: self.index.clone(),
            articles: self
                .id_map
                .iter()
                .filter_map(|id| self.articles.get(id).cloned())
                .collect(),
            buckets: self.buckets.values().cloned().collect(),
        }
    }

    /// Rebuild a Ready version from a persisted artifact.
    pub fn from_artifact(artifact: VersionArtifact) -> AppResult<Self> {
        for bucket in &artifact.buckets {
            if let Some(missing) = bucket
                .article_ids()
                .find(|id| !artifact.articles.iter().any(|a| a.id == *id))
            {
                return Err(AppError::Storage(format!(
                    "version {} bucket {}/{} references unknown article {}",
                    artifact.version_id, bucket.region, bucket.category, missing
                )));
            }
        }

        let buckets = artifact
            .buckets
            .into_iter()
            .map(|b| ((b.region, b.category), b))
            .collect();

        let version = Self::new(
            artifact.version_id,
            artifact.built_at,
            artifact.fingerprint,
            artifact.index,
            artifact.articles,
            buckets,
        )
        .map_err(|e| AppError::Storage(format!("Corrupt version artifact: {}", e)))?;

        version.mark_ready()?;
        Ok(version)
    }
}

/// On-disk shape of a version. Articles are stored in `id_map` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionArtifact {
    pub version_id: u64,
    pub built_at: DateTime<Utc>,
    pub fingerprint: String,
    pub index: FlatIndex,
    pub articles: Vec<Article>,
    pub buckets: Vec<TrendingBucket>,
}

/// Lightweight description of a version for status output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version_id: u64,
    pub built_at: DateTime<Utc>,
    pub article_count: usize,
    pub fingerprint: String,
    pub status: VersionStatus,
    pub populated_buckets: usize,
}
