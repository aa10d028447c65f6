//! News index core.
//!
//! Ingests article batches into a local store, builds versioned vector
//! indexes over them in the background, and serves semantic search,
//! trending lookups, and cited reports against whichever version is
//! currently active.
//!
//! # Flow
//! ```text
//! ArticleSource -> ArticleStore -> IndexBuilder -> IndexCatalog -> QueryEngine
//!                                                                -> ReportSynthesizer
//! ```
//!
//! The build path and the query path share only the [`IndexCatalog`].

pub mod artifacts;
pub mod builder;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod query;
pub mod report;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod trending;
pub mod types;
pub mod vector;
pub mod version;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use builder::{BuildOutput, BuildStats, IndexBuilder};
pub use catalog::{IndexCatalog, PromotionOutcome};
pub use config::IndexConfig;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use ingest::{ingest, ArticleSource, BatchFileSource, IngestStats, JsonDirSource};
pub use query::{QueryEngine, SearchFilters, TrendingGroup};
pub use report::{Citation, Report, ReportSynthesizer, TrendingDigest};
pub use runtime::NewsRuntime;
pub use scheduler::{BuildReport, BuildScheduler};
pub use service::{NewsService, QueryAnswer, ServiceStatus};
pub use store::ArticleStore;
pub use types::{Article, Category, RawArticle, Region, ScoredArticle};
pub use version::{IndexVersion, VersionStatus, VersionSummary};
