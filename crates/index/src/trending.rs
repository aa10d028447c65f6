//! Trending buckets: per (region, category) ranked article lists.
//!
//! Score = recency weight x (1 + coverage). Recency halves every
//! `recency_half_life_hours`, measured from the newest article in the
//! snapshot rather than the wall clock, so identical snapshots always give
//! identical buckets. Coverage counts other articles in the same bucket
//! whose titles share at least two terms, a stand-in for engagement.

use crate::classify::tokens;
use crate::config::BuildConfig;
use crate::types::{Article, Category, Region};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

const MIN_SHARED_TERMS: usize = 2;

/// One ranked entry of a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub article_id: String,
    pub score: f64,
}

/// Ranked article ids for one (region, category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingBucket {
    pub region: Region,
    pub category: Category,
    pub entries: Vec<TrendingEntry>,
}

impl TrendingBucket {
    pub fn new(region: Region, category: Category) -> Self {
        Self {
            region,
            category,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn article_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.article_id.as_str())
    }
}

pub type BucketKey = (Region, Category);

fn title_terms(title: &str) -> HashSet<String> {
    tokens(title)
        .into_iter()
        .filter(|t| t.chars().count() > 2)
        .collect()
}

/// Compute every bucket for a snapshot.
///
/// Tracked regions x tracked categories always get a bucket (possibly
/// empty); any other combination appears only when it has articles.
pub fn compute_buckets(
    articles: &[Article],
    config: &BuildConfig,
) -> BTreeMap<BucketKey, TrendingBucket> {
    let mut grouped: BTreeMap<BucketKey, Vec<&Article>> = BTreeMap::new();
    for region in Region::TRACKED {
        for category in Category::TRACKED {
            grouped.insert((region, category), Vec::new());
        }
    }
    for article in articles {
        grouped
            .entry((article.region, article.category))
            .or_default()
            .push(article);
    }

    let newest = articles.iter().map(|a| a.published_at).max();
    let half_life = config.recency_half_life_hours;

    grouped
        .into_iter()
        .map(|((region, category), members)| {
            let terms: Vec<HashSet<String>> =
                members.iter().map(|a| title_terms(&a.title)).collect();

            let mut ranked: Vec<(&Article, f64)> = members
                .iter()
                .enumerate()
                .map(|(i, article)| {
                    let age_hours = newest
                        .map(|n| (n - article.published_at).num_seconds().max(0) as f64 / 3600.0)
                        .unwrap_or(0.0);
                    let recency = 0.5_f64.powf(age_hours / half_life);

                    let coverage = terms
                        .iter()
                        .enumerate()
                        .filter(|(j, other)| {
                            *j != i && terms[i].intersection(other).count() >= MIN_SHARED_TERMS
                        })
                        .count();

                    (*article, recency * (1.0 + coverage as f64))
                })
                .collect();

            ranked.sort_by(|(a, sa), (b, sb)| {
                sb.partial_cmp(sa)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.published_at.cmp(&a.published_at))
                    .then_with(|| a.id.cmp(&b.id))
            });
            ranked.truncate(config.trending_limit);

            let bucket = TrendingBucket {
                region,
                category,
                entries: ranked
                    .into_iter()
                    .map(|(article, score)| TrendingEntry {
                        article_id: article.id.clone(),
                        score,
                    })
                    .collect(),
            };
            ((region, category), bucket)
        })
        .collect()
}
