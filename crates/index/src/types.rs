//! Domain types for the news index.

use chrono::{DateTime, Utc};
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Editorial region an article is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    India,
    Global,
    Other,
}

impl Region {
    /// Regions that always have trending buckets.
    pub const TRACKED: [Region; 2] = [Region::India, Region::Global];

    pub const ALL: [Region; 3] = [Region::India, Region::Global, Region::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::India => "India",
            Region::Global => "Global",
            Region::Other => "Other",
        }
    }

    /// Case-insensitive parse; `None` for unrecognized values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "india" | "in" => Some(Region::India),
            "global" | "world" => Some(Region::Global),
            "other" => Some(Region::Other),
            _ => None,
        }
    }
}

impl FromStr for Region {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        Region::parse(s).ok_or_else(|| AppError::InvalidFilter(format!("unknown region '{}'", s)))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Topical category of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Technology,
    Sports,
    Health,
    Crime,
    Entertainment,
    Other,
}

impl Category {
    /// Categories that always have trending buckets.
    pub const TRACKED: [Category; 6] = [
        Category::Politics,
        Category::Technology,
        Category::Sports,
        Category::Health,
        Category::Crime,
        Category::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Technology => "Technology",
            Category::Sports => "Sports",
            Category::Health => "Health",
            Category::Crime => "Crime",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive parse; `None` for unrecognized values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "politics" => Some(Category::Politics),
            "technology" | "tech" => Some(Category::Technology),
            "sports" | "sport" => Some(Category::Sports),
            "health" => Some(Category::Health),
            "crime" => Some(Category::Crime),
            "entertainment" => Some(Category::Entertainment),
            "other" | "general" => Some(Category::Other),
            _ => None,
        }
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        Category::parse(s)
            .ok_or_else(|| AppError::InvalidFilter(format!("unknown category '{}'", s)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// An article as delivered by the external collector, before normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,

    #[serde(default, alias = "description")]
    pub body: String,

    pub source: String,

    #[serde(default)]
    pub url: String,

    #[serde(alias = "publishedAt")]
    pub published_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// ISO country code reported by the upstream API, used for region detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A normalized, stored article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable hash of source, url, and publish time
    pub id: String,
    pub title: String,
    pub body: String,
    pub source: String,
    pub url: String,
    pub region: Region,
    pub category: Category,
    pub published_at: DateTime<Utc>,

    /// Cached embedding, computed once per provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Fingerprint of the provider that produced `embedding`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_fingerprint: Option<String>,
}

/// Maximum characters of article text sent to the embedding provider.
pub const MAX_EMBED_CHARS: usize = 1000;

impl Article {
    /// Derive the stable article id.
    pub fn compute_id(source: &str, url: &str, published_at: &DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");
        hasher.update(published_at.to_rfc3339().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Text used for embedding: title and body, capped at [`MAX_EMBED_CHARS`].
    pub fn embedding_text(&self) -> String {
        let text = format!("{} {}", self.title.trim(), self.body.trim());
        text.trim().chars().take(MAX_EMBED_CHARS).collect()
    }

    /// True when the cached embedding was produced by the given provider.
    pub fn has_embedding_for(&self, fingerprint: &str) -> bool {
        self.embedding.is_some() && self.embedding_fingerprint.as_deref() == Some(fingerprint)
    }

    /// Copy without the embedding payload.
    pub fn without_embedding(&self) -> Self {
        Self {
            embedding: None,
            embedding_fingerprint: None,
            ..self.clone()
        }
    }
}

/// An article paired with its similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub score: f32,
}
