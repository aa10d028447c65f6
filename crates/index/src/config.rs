//! Index configuration (`.newsdesk/index.yaml`) and state paths.

use newsdesk_core::config::STATE_DIR;
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest and largest embedding batch the builder will send.
pub const MIN_BATCH_SIZE: usize = 64;
pub const MAX_BATCH_SIZE: usize = 256;

/// Get the index config path for a workspace.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("index.yaml")
}

/// Get the article store path for a workspace.
pub fn get_store_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("articles.sqlite")
}

/// Directory holding one subdirectory per persisted index version.
pub fn get_versions_dir(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("versions")
}

/// Directory of a single persisted index version.
pub fn get_version_dir(workspace: &Path, version_id: u64) -> PathBuf {
    get_versions_dir(workspace).join(format!("{:08}", version_id))
}

/// Default drop directory the collector writes batches into.
pub fn get_inbox_dir(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("inbox")
}

/// Full index configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub embedding: EmbeddingConfig,
    pub build: BuildConfig,
    pub query: QueryConfig,
    pub catalog: CatalogConfig,
    pub schedule: ScheduleConfig,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom provider endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Articles per embedding request (clamped to 64..=256)
    pub batch_size: usize,

    /// Batches in flight at once
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            batch_size: 128,
            concurrency: 4,
        }
    }
}

impl EmbeddingConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Index build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Largest tolerated fraction of articles whose embedding failed
    pub max_failure_ratio: f64,

    /// Articles kept per trending bucket
    pub trending_limit: usize,

    /// Age at which an article's trending weight halves
    pub recency_half_life_hours: f64,

    /// Minimum title+body length accepted at ingest
    pub min_text_len: usize,

    /// Minimum title length accepted at ingest
    pub min_title_len: usize,

    /// Publish an empty version for an empty snapshot instead of failing
    pub allow_empty: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_failure_ratio: 0.05,
            trending_limit: 5,
            recency_half_life_hours: 24.0,
            min_text_len: 20,
            min_title_len: 10,
            allow_empty: false,
        }
    }
}

/// Query serving settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_max_results: usize,
    pub max_results_cap: usize,

    /// Candidates fetched per requested result before filtering
    pub overfetch_multiplier: usize,

    /// Drop results scoring below this similarity; `null` keeps every match
    pub min_score: Option<f32>,

    /// Deadline for a single request
    pub timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_results: 5,
            max_results_cap: 20,
            overfetch_multiplier: 4,
            min_score: Some(0.3),
            timeout_ms: 10_000,
        }
    }
}

/// Catalog retention and health-check settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Retired versions kept for rollback
    pub retention: usize,

    /// A new version whose populated trending buckets fall below this
    /// fraction of the active version's is rolled back
    pub health_min_ratio: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            retention: 3,
            health_min_ratio: 0.5,
        }
    }
}

/// Background rebuild settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,

    /// Directory scanned for collector batches before each build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox: Option<PathBuf>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            inbox: None,
        }
    }
}

impl IndexConfig {
    /// Load from the workspace, falling back to defaults when absent.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let config_path = get_config_path(workspace);

        if !config_path.exists() {
            tracing::debug!("No index config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write to the workspace's `.newsdesk/index.yaml`.
    pub fn save(&self, workspace: &Path) -> AppResult<()> {
        let config_path = get_config_path(workspace);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(&config_path, yaml).map_err(|e| {
            AppError::Config(format!(
                "Failed to write config to {:?}: {}",
                config_path, e
            ))
        })?;

        tracing::debug!("Saved index config to {:?}", config_path);
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.build.max_failure_ratio) {
            return Err(AppError::Config(format!(
                "build.max_failure_ratio must be within 0..=1, got {}",
                self.build.max_failure_ratio
            )));
        }

        let half_life = self.build.recency_half_life_hours;
        if !(half_life.is_finite() && half_life > 0.0) {
            return Err(AppError::Config(
                "build.recency_half_life_hours must be positive".to_string(),
            ));
        }

        if let Some(min_score) = self.query.min_score {
            if !min_score.is_finite() {
                return Err(AppError::Config(
                    "query.min_score must be a finite number".to_string(),
                ));
            }
        }

        if self.query.overfetch_multiplier == 0 || self.query.max_results_cap == 0 {
            return Err(AppError::Config(
                "query.overfetch_multiplier and query.max_results_cap must be positive"
                    .to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
